//! Numeric value generators.

use rand::Rng;
use sim_core::Value;

/// Largest precision honored when rounding; f64 carries ~15 significant digits.
const MAX_PRECISION: u32 = 15;

/// Round to `precision` decimal places.
pub fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    (value * factor).round() / factor
}

/// Generate a random integer in the given range (inclusive).
///
/// Callers guarantee `min <= max`.
pub fn generate_random_int<R: Rng>(rng: &mut R, min: i64, max: i64) -> Value {
    Value::Int(rng.random_range(min..=max))
}

/// Generate a random float in the given range (inclusive), rounded.
///
/// Callers guarantee `min <= max` and both finite.
pub fn generate_random_float<R: Rng>(rng: &mut R, min: f64, max: f64, precision: u32) -> Value {
    Value::Float(round_to(rng.random_range(min..=max), precision))
}

/// Generate a normally distributed float, rounded.
///
/// Uses the Box-Muller transform over two uniform draws.
pub fn generate_gaussian<R: Rng>(rng: &mut R, mean: f64, stddev: f64, precision: u32) -> Value {
    Value::Float(round_to(mean + stddev * standard_normal(rng), precision))
}

fn standard_normal<R: Rng>(rng: &mut R) -> f64 {
    // u1 in (0, 1] so ln(u1) is finite
    let u1: f64 = 1.0 - rng.random::<f64>();
    let u2: f64 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Generate a boolean that is true with the given probability.
pub fn generate_bool<R: Rng>(rng: &mut R, probability: f64) -> Value {
    Value::Bool(rng.random_bool(probability))
}
