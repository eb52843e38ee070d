//! CSV timetable and demand loaders.
//!
//! # File formats
//!
//! One header row each, extra columns ignored.
//!
//! ```csv
//! stops.csv:       stop_id,change_time
//! connections.csv: dep_stop,arr_stop,dep_time,arr_time,trip_id
//! transfers.csv:   dep_stop,arr_stop,duration
//! demand.csv:      origin,destination,min_dep_time,max_dep_time,passengers
//! ```
//!
//! Times are integer seconds.  `transfers.csv` may reference vertex ids at or
//! above the stop count; those become non-stop vertices (zones).  A transfer
//! row with `dep_stop == arr_stop` raises that stop's minimum transfer time
//! instead of adding a self-loop.
//!
//! # Row dropping
//!
//! Noisy feeds are repaired, not rejected, the same way the upstream network
//! tooling does it: connections touching undefined stops are dropped,
//! same-trip rows that overlap or break the chain are pruned, demand rows
//! with zero passengers, inverted windows, equal endpoints, or out-of-graph
//! vertices are skipped.  Structural errors (missing columns, unreadable
//! files) are reported as [`TimetableError`].

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use pax_core::{StopId, Time, TripId, VertexId};

use crate::{
    sanitize_connections, Connection, Demand, DemandEntry, Stop, Timetable, TimetableResult,
    TransferGraphBuilder,
};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct StopRecord {
    stop_id: u32,
    change_time: Time,
}

#[derive(Deserialize)]
struct ConnectionRecord {
    dep_stop: u32,
    arr_stop: u32,
    dep_time: Time,
    arr_time: Time,
    trip_id: u32,
}

#[derive(Deserialize)]
struct TransferRecord {
    dep_stop: u32,
    arr_stop: u32,
    duration: Time,
}

#[derive(Deserialize)]
struct DemandRecord {
    origin: u32,
    destination: u32,
    min_dep_time: Time,
    max_dep_time: Time,
    passengers: u64,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a [`Timetable`] from the three CSV files under `dir`.
///
/// Expects `stops.csv`, `connections.csv`, and `transfers.csv`.  When
/// `make_bidirectional` is set every transfer row adds edges in both
/// directions (the common case for footpath files that list each pair once).
pub fn load_timetable(dir: &Path, make_bidirectional: bool) -> TimetableResult<Timetable> {
    let stops = std::fs::File::open(dir.join("stops.csv"))?;
    let connections = std::fs::File::open(dir.join("connections.csv"))?;
    let transfers = std::fs::File::open(dir.join("transfers.csv"))?;
    load_timetable_readers(stops, connections, transfers, make_bidirectional)
}

/// Like [`load_timetable`] but over any `Read` sources (tests pass
/// `io::Cursor`s).
pub fn load_timetable_readers<R1: Read, R2: Read, R3: Read>(
    stops: R1,
    connections: R2,
    transfers: R3,
    make_bidirectional: bool,
) -> TimetableResult<Timetable> {
    // ── Stops ─────────────────────────────────────────────────────────────
    //
    // Sparse ids are tolerated: gaps become placeholder stops that no
    // surviving connection or transfer references.  `defined` tracks which
    // ids actually appeared so referencing rows can be dropped.
    let mut stop_list: Vec<Stop> = Vec::new();
    let mut defined: Vec<bool> = Vec::new();
    for row in csv::Reader::from_reader(stops).deserialize::<StopRecord>() {
        let row = row?;
        let index = row.stop_id as usize;
        if index >= stop_list.len() {
            stop_list.resize(index + 1, Stop::new(0));
            defined.resize(index + 1, false);
        }
        stop_list[index] = Stop::new(row.change_time.max(0));
        defined[index] = true;
    }

    // ── Connections ───────────────────────────────────────────────────────
    let mut connection_list: Vec<Connection> = Vec::new();
    let mut trip_count = 0usize;
    for row in csv::Reader::from_reader(connections).deserialize::<ConnectionRecord>() {
        let row = row?;
        let dep = row.dep_stop as usize;
        let arr = row.arr_stop as usize;
        if dep >= defined.len() || !defined[dep] || arr >= defined.len() || !defined[arr] {
            continue;
        }
        if row.dep_time > row.arr_time {
            continue;
        }
        trip_count = trip_count.max(row.trip_id as usize + 1);
        connection_list.push(Connection::new(
            StopId(row.dep_stop),
            StopId(row.arr_stop),
            row.dep_time,
            row.arr_time,
            TripId(row.trip_id),
        ));
    }
    sanitize_connections(&mut connection_list, trip_count);

    // ── Transfers ─────────────────────────────────────────────────────────
    //
    // Buffered first so the vertex count (stops plus any zone ids the file
    // introduces) is known before the CSR builder is sized.
    let mut transfer_rows: Vec<TransferRecord> = Vec::new();
    let mut num_vertices = stop_list.len();
    for row in csv::Reader::from_reader(transfers).deserialize::<TransferRecord>() {
        let row = row?;
        let from = row.dep_stop as usize;
        let to = row.arr_stop as usize;
        if (from < defined.len() && !defined[from]) || (to < defined.len() && !defined[to]) {
            continue;
        }
        if row.duration < 0 {
            continue;
        }
        num_vertices = num_vertices.max(from + 1).max(to + 1);
        transfer_rows.push(row);
    }

    let mut builder = TransferGraphBuilder::new(num_vertices);
    for row in &transfer_rows {
        let from = VertexId(row.dep_stop);
        let to = VertexId(row.arr_stop);
        if from == to && (from.index()) < stop_list.len() {
            let stop = &mut stop_list[from.index()];
            stop.min_transfer_time = stop.min_transfer_time.max(row.duration);
        } else if make_bidirectional {
            builder.add_footpath(from, to, row.duration);
        } else {
            builder.add_edge(from, to, row.duration);
        }
    }

    Timetable::new(stop_list, trip_count, connection_list, builder)
}

/// Load a [`Demand`] from `demand.csv` in `dir`, dropping unusable rows.
pub fn load_demand(dir: &Path, timetable: &Timetable) -> TimetableResult<Demand> {
    let file = std::fs::File::open(dir.join("demand.csv"))?;
    load_demand_reader(file, timetable)
}

/// Like [`load_demand`] but over any `Read` source.
///
/// `demand_index` is assigned in surviving-row order.
pub fn load_demand_reader<R: Read>(reader: R, timetable: &Timetable) -> TimetableResult<Demand> {
    let graph = timetable.transfer_graph();
    let mut entries: Vec<DemandEntry> = Vec::new();
    for row in csv::Reader::from_reader(reader).deserialize::<DemandRecord>() {
        let row = row?;
        if row.passengers == 0 {
            continue;
        }
        if row.max_dep_time < row.min_dep_time {
            continue;
        }
        if row.origin == row.destination {
            continue;
        }
        let origin = VertexId(row.origin);
        let destination = VertexId(row.destination);
        if !graph.is_vertex(origin) || !graph.is_vertex(destination) {
            continue;
        }
        entries.push(DemandEntry {
            demand_index: entries.len(),
            origin,
            destination,
            earliest_departure: row.min_dep_time,
            latest_departure: row.max_dep_time,
            passengers: row.passengers,
        });
    }
    Ok(Demand::new(entries))
}
