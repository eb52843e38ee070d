//! `pax-timetable` — timetable and demand value objects for the `pax`
//! transit assignment engine.
//!
//! The central type is [`Timetable`]: stops, trips, a departure-time-sorted
//! connection array, and the walking [`TransferGraph`] with a pre-built
//! reverse view.  Construction validates every invariant the assignment core
//! assumes, so a `Timetable` handed to the engine is immutable and known-good.
//!
//! | Module        | Contents                                              |
//! |---------------|-------------------------------------------------------|
//! | [`graph`]     | `TransferGraph` (CSR), `TransferGraphBuilder`         |
//! | [`timetable`] | `Stop`, `Connection`, `Timetable`, combinability      |
//! | [`demand`]    | `DemandEntry`, `Demand`, discretisation               |
//! | [`loader`]    | CSV loaders for timetable and demand files            |
//! | [`error`]     | `TimetableError`, `TimetableResult`                   |

pub mod demand;
pub mod error;
pub mod graph;
pub mod loader;
pub mod timetable;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use demand::{Demand, DemandEntry};
pub use error::{TimetableError, TimetableResult};
pub use graph::{TransferGraph, TransferGraphBuilder};
pub use loader::{load_demand, load_demand_reader, load_timetable, load_timetable_readers};
pub use timetable::{sanitize_connections, Connection, Stop, Timetable};
