//! `pax-output` — CSV reporting collaborators for `pax` assignment results.
//!
//! The assignment core exposes a raw [`AssignmentData`](pax_assign::AssignmentData)
//! value; this crate turns it into the three standard report files:
//!
//! | Report              | Columns                                                       |
//! |---------------------|---------------------------------------------------------------|
//! | connection loads    | `dep_stop,arr_stop,dep_time,arr_time,trip_id,connection_id,load` |
//! | groups              | `group_id,demand_id,group_size`                               |
//! | assignment          | `connection_id,group_id`                                      |
//!
//! All writers target any `io::Write`, so callers can stream to files,
//! buffers, or sockets alike.

pub mod csv_report;
pub mod error;


pub use csv_report::{write_assignment, write_connection_loads, write_groups};
pub use error::{OutputError, OutputResult};
