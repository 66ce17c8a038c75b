//! Tick pacing.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Mixed into the stream seed so jitter draws do not mirror generator draws.
const PACING_SEED_SALT: u64 = 0x5eed_9ace_0000_0002;

/// Computes the interval between consecutive ticks of one stream.
pub struct Pacer {
    base: Duration,
    jitter: f64,
    rng: StdRng,
}

impl Pacer {
    /// `rate` is in records per second and must be positive; `jitter` is a
    /// non-negative fraction of the base interval.
    pub fn new(rate: f64, jitter: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ PACING_SEED_SALT),
            None => StdRng::from_os_rng(),
        };
        Self {
            base: saturating_secs(1.0 / rate),
            jitter: jitter.max(0.0),
            rng,
        }
    }

    /// Interval without jitter.
    pub fn base_interval(&self) -> Duration {
        self.base
    }

    /// Draw the target interval for the next tick.
    pub fn next_interval(&mut self) -> Duration {
        jittered_interval(&mut self.rng, self.base, self.jitter)
    }

    /// Time left to sleep once a tick took `elapsed` of `interval`.
    pub fn remaining(interval: Duration, elapsed: Duration) -> Duration {
        interval.saturating_sub(elapsed)
    }
}

/// Scale `base` by a uniform factor in `[1 - jitter, 1 + jitter]`, floored
/// at zero.
pub fn jittered_interval<R: Rng>(rng: &mut R, base: Duration, jitter: f64) -> Duration {
    if jitter <= 0.0 {
        return base;
    }
    // Drawn as an offset in [-1, 1] so the range width never overflows
    let factor = (1.0 + jitter * rng.random_range(-1.0..=1.0)).max(0.0);
    saturating_secs(base.as_secs_f64() * factor)
}

/// Seconds to a `Duration`, clamped to `[0, Duration::MAX]`.
fn saturating_secs(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
