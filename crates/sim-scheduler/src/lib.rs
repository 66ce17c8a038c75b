//! Stream scheduling for stream-sim.
//!
//! Every stream runs its own loop as a tokio task. Per tick the loop:
//!
//! 1. asks the [`EventInjector`] whether a trigger fires (first match wins),
//! 2. otherwise asks the [`RecordGenerator`](sim_generator::RecordGenerator)
//!    for a record,
//! 3. stores the record in the stream's [`StateStore`](sim_core::StateStore),
//! 4. formats and sends it to every output in definition order,
//! 5. sleeps out the rest of the (optionally jittered) interval.
//!
//! Sink failures are logged and counted; a panic inside a tick is caught at
//! the tick boundary and followed by one base-interval pause. A shared
//! [`CancellationToken`](tokio_util::sync::CancellationToken) stops every
//! loop, which then closes its outputs and returns a [`StreamReport`].

pub mod events;
pub mod pacing;
pub mod simulation;
pub mod stream;

#[cfg(test)]
mod testing;

pub use events::EventInjector;
pub use pacing::{jittered_interval, Pacer};
pub use simulation::Simulation;
pub use stream::{RecordSource, StreamReport, StreamScheduler, TickOutcome};
