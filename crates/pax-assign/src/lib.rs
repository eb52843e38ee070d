//! `pax-assign` — the stochastic traffic assignment core of the `pax`
//! engine.
//!
//! Given an immutable [`Timetable`](pax_timetable::Timetable) and a
//! [`Demand`](pax_timetable::Demand), the engine distributes passengers over
//! itineraries and reports, per scheduled connection, how many passengers
//! ride it.  Per destination it computes perceived-arrival-time profiles by
//! a single backward sweep of the connections, assigns demand groups in a
//! forward sweep using a probabilistic decision model, and prunes cyclic
//! revisits in a post-pass.  Destinations are processed in parallel.
//!
//! | Module       | Contents                                                |
//! |--------------|---------------------------------------------------------|
//! | [`settings`] | `Settings` and its enums                                |
//! | [`profile`]  | `ProfileEntry`, `StopLabel`, `ProfileCursor`            |
//! | [`pats`]     | Backward sweep: `PatComputation`, `ConnectionLabel`     |
//! | [`decision`] | `DecisionModel` variants                                |
//! | [`choice`]   | `ChoiceSet` and the rooftop model                       |
//! | [`sampling`] | Exact integer group-size sampling                       |
//! | [`tracking`] | `GroupTracking`: where every group currently is         |
//! | [`worker`]   | Forward sweep: `AssignmentWorker`                       |
//! | [`cycles`]   | `CycleRemoval` post-pass                                |
//! | [`data`]     | `AssignmentData` group store                            |
//! | [`driver`]   | `GroupAssignment`: partition, schedule, merge           |
//!
//! # Determinism
//!
//! With a fixed random seed, a destination produces identical output as long
//! as it is processed by the same worker index.  Thread counts change the
//! destination-to-worker mapping (and therefore the sampled outcomes), never
//! the expectations.

pub mod choice;
pub mod cycles;
pub mod data;
pub mod decision;
pub mod driver;
pub mod error;
pub mod pats;
pub mod profile;
pub mod sampling;
pub mod settings;
pub mod tracking;
pub mod worker;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use choice::ChoiceSet;
pub use cycles::CycleRemoval;
pub use data::{AssignmentData, GroupData};
pub use decision::DecisionModel;
pub use driver::{AssignmentObserver, GroupAssignment, NoopObserver};
pub use error::{AssignError, AssignResult};
pub use pats::{ConnectionLabel, PatComputation};
pub use profile::{delay_probability, Profile, ProfileCursor, ProfileEntry, StopLabel};
pub use settings::{CycleMode, DecisionModelKind, DepartureTimeChoice, Settings};
pub use tracking::{ArrivalQueue, GroupArrivalLabel, GroupTracking};
pub use worker::AssignmentWorker;
