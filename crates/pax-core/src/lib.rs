//! `pax-core` — foundational types for the `pax` transit assignment engine.
//!
//! This crate is a dependency of every other `pax-*` crate.  It intentionally
//! has no `pax-*` dependencies and minimal external ones (only `rand`, plus
//! optional `serde`).
//!
//! # What lives here
//!
//! | Module   | Contents                                                  |
//! |----------|-----------------------------------------------------------|
//! | [`ids`]  | `StopId`, `TripId`, `ConnectionId`, `VertexId`, `GroupId` |
//! | [`time`] | `Time`, `NEVER`, `PerceivedTime`, `UNREACHABLE`           |
//! | [`rng`]  | `WorkerRng` (per-worker deterministic RNG)                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types. |

pub mod ids;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use ids::{ConnectionId, GroupId, StopId, TripId, VertexId};
pub use rng::WorkerRng;
pub use time::{pat_to_int, PerceivedTime, Time, NEVER, UNREACHABLE};
