//! Event injection.
//!
//! Before generating a record, the scheduler asks the [`EventInjector`]
//! whether any configured trigger fires for the current tick. Triggers are
//! evaluated in definition order and the first one that fires wins; its
//! override record replaces the generated one outright.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sim_core::{EventTrigger, Record, TriggerCondition};
use tracing::debug;

/// Mixed into the stream seed so trigger draws do not mirror generator draws.
const EVENT_SEED_SALT: u64 = 0x5eed_e7e7_0000_0001;

/// Evaluates a stream's event triggers tick by tick.
pub struct EventInjector {
    stream: String,
    triggers: Vec<EventTrigger>,
    rng: StdRng,
}

impl EventInjector {
    /// Create an injector for `stream`.
    ///
    /// Malformed triggers are kept in place but never fire; they were
    /// reported when the configuration was loaded.
    pub fn new(stream: &str, triggers: Vec<EventTrigger>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ EVENT_SEED_SALT),
            None => StdRng::from_os_rng(),
        };
        let active = triggers.iter().filter(|t| !t.is_malformed()).count();
        debug!(
            "Stream '{stream}': {active} active event trigger(s), {} disabled",
            triggers.len() - active
        );
        Self {
            stream: stream.to_string(),
            triggers,
            rng,
        }
    }

    /// Number of configured triggers, malformed ones included.
    pub fn len(&self) -> usize {
        self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triggers.is_empty()
    }

    /// Return a fresh copy of the first firing trigger's record, if any.
    pub fn check(&mut self, tick: u64) -> Option<Record> {
        for trigger in &self.triggers {
            if trigger.is_malformed() {
                continue;
            }
            let fired = trigger
                .conditions
                .iter()
                .any(|condition| condition_holds(condition, tick, &mut self.rng));
            if fired {
                debug!(
                    "Stream '{}': event '{}' fired at tick {tick}",
                    self.stream,
                    trigger.label()
                );
                return Some(trigger.record.clone());
            }
        }
        None
    }
}

fn condition_holds<R: Rng>(condition: &TriggerCondition, tick: u64, rng: &mut R) -> bool {
    match condition {
        TriggerCondition::AtCount(at) => tick == *at,
        TriggerCondition::EveryCount { every, offset } => *every > 0 && tick % every == *offset,
        TriggerCondition::Probability(p) => (0.0..=1.0).contains(p) && rng.random_bool(*p),
    }
}
