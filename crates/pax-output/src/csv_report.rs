//! CSV report writers.

use std::io::Write;

use pax_assign::AssignmentData;
use pax_timetable::Timetable;

use crate::OutputResult;

/// Write one row per connection with its de-scaled passenger load.
///
/// `loads` is indexed by connection id, as produced by
/// [`GroupAssignment::passenger_counts_per_connection`](pax_assign::GroupAssignment::passenger_counts_per_connection).
pub fn write_connection_loads<W: Write>(
    writer: W,
    timetable: &Timetable,
    loads: &[f64],
) -> OutputResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record([
        "dep_stop",
        "arr_stop",
        "dep_time",
        "arr_time",
        "trip_id",
        "connection_id",
        "load",
    ])?;
    for (id, connection) in timetable.connections().iter().enumerate() {
        out.write_record(&[
            connection.dep_stop.0.to_string(),
            connection.arr_stop.0.to_string(),
            connection.dep_time.to_string(),
            connection.arr_time.to_string(),
            connection.trip.0.to_string(),
            id.to_string(),
            loads[id].to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Write one row per group: id, originating demand row, and size.
pub fn write_groups<W: Write>(writer: W, data: &AssignmentData) -> OutputResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["group_id", "demand_id", "group_size"])?;
    for group in &data.groups {
        out.write_record(&[
            group.id.0.to_string(),
            group.demand_index.to_string(),
            group.size.to_string(),
        ])?;
    }
    out.flush()?;
    Ok(())
}

/// Write the connection↔group incidence, one `(connection, group)` pair per
/// row in connection order.
pub fn write_assignment<W: Write>(writer: W, data: &AssignmentData) -> OutputResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(["connection_id", "group_id"])?;
    for (connection, groups) in data.groups_per_connection.iter().enumerate() {
        for group in groups {
            out.write_record(&[connection.to_string(), group.0.to_string()])?;
        }
    }
    out.flush()?;
    Ok(())
}
