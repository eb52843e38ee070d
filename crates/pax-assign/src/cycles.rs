//! Cycle removal: prune repeated stop or station visits from realised
//! itineraries.
//!
//! The stochastic forward scan can route a group through the same place
//! twice (board, ride away, come back, re-board).  This post-pass rewrites
//! each group's connection list so that every stop (or station) is visited
//! at most once, then builds the inverted `groups_per_connection` index from
//! the surviving lists.

use pax_core::{ConnectionId, GroupId, StopId, Time, TripId};
use pax_timetable::{Connection, Timetable};

use crate::{AssignmentData, CycleMode};

// ── PathLabel ─────────────────────────────────────────────────────────────────

/// Rolling position while replaying one itinerary.
struct PathLabel {
    time: Time,
    trip: TripId,
    stop: StopId,
    station: StopId,
}

impl PathLabel {
    fn start(connection: &Connection, station_by_stop: &[StopId]) -> Self {
        Self {
            time: connection.dep_time,
            trip: connection.trip,
            stop: connection.dep_stop,
            station: station_by_stop[connection.dep_stop.index()],
        }
    }

    fn update(&mut self, connection: &Connection, arrival_station: StopId) {
        self.time = connection.arr_time;
        self.trip = connection.trip;
        self.stop = connection.arr_stop;
        self.station = arrival_station;
    }
}

// ── CycleRemoval ──────────────────────────────────────────────────────────────

/// Per-worker cycle-removal pass with reusable scratch arrays.
pub struct CycleRemoval<'a> {
    timetable: &'a Timetable,
    mode: CycleMode,
    /// Station of each stop: the minimum stop index over the stop and its
    /// walking neighbors.  Only populated for station mode.
    station_by_stop: Vec<StopId>,
    /// Per stop/station: index of the first (stop mode) or last (station
    /// mode) use in the itinerary currently being processed.  Never reset
    /// between groups — each group writes every index it later reads.
    cycle_index: Vec<usize>,
    removed_cycles: u64,
    removed_cycle_connections: u64,
}

impl<'a> CycleRemoval<'a> {
    pub fn new(timetable: &'a Timetable, mode: CycleMode) -> Self {
        let mut station_by_stop = Vec::new();
        if mode == CycleMode::RemoveStationCycles {
            station_by_stop = (0..timetable.num_stops())
                .map(|index| {
                    let stop = StopId(index as u32);
                    let mut station = stop;
                    for (neighbor, _) in timetable.transfer_graph().edges_from(stop.into()) {
                        if let Some(neighbor) = timetable.as_stop(neighbor) {
                            station = station.min(neighbor);
                        }
                    }
                    station
                })
                .collect();
        }
        Self {
            timetable,
            mode,
            station_by_stop,
            cycle_index: vec![usize::MAX; timetable.num_stops()],
            removed_cycles: 0,
            removed_cycle_connections: 0,
        }
    }

    pub fn removed_cycles(&self) -> u64 {
        self.removed_cycles
    }

    pub fn removed_cycle_connections(&self) -> u64 {
        self.removed_cycle_connections
    }

    /// Rewrite every group's itinerary per the configured mode and rebuild
    /// `groups_per_connection`.  Running the pass again on its own output is
    /// a no-op (beyond re-inverting the index).
    pub fn run(&mut self, data: &mut AssignmentData) {
        self.removed_cycles = 0;
        self.removed_cycle_connections = 0;
        for groups in &mut data.groups_per_connection {
            groups.clear();
        }
        match self.mode {
            CycleMode::KeepCycles => data.add_groups_to_connections(),
            CycleMode::RemoveStopCycles => self.remove_stop_cycles(data),
            CycleMode::RemoveStationCycles => self.remove_station_cycles(data),
        }
    }

    // ── Stop mode ─────────────────────────────────────────────────────────

    fn remove_stop_cycles(&mut self, data: &mut AssignmentData) {
        for group_index in 0..data.connections_per_group.len() {
            let group = GroupId(group_index as u32);
            let connections = &data.connections_per_group[group_index];
            if connections.is_empty() {
                continue;
            }
            let size = connections.len();

            // cycle_index[s] = index of the first connection used after the
            // journey first visits s (scanning backward makes the earliest
            // occurrence win).
            for i in (0..size).rev() {
                let connection = self.timetable.connection(connections[i]);
                self.cycle_index[connection.dep_stop.index()] = i;
                self.cycle_index[connection.arr_stop.index()] = i + 1;
            }

            // Replay from the back: hop from the journey's end to the first
            // arrival there, then to the first departure from that leg's
            // origin, collecting legs in reverse.  Any loop that returns
            // through an already-visited stop is jumped over.
            let mut used: Vec<_> = Vec::new();
            let mut i = size - 1;
            loop {
                let arr_stop = self.timetable.connection(connections[i]).arr_stop;
                i = self.cycle_index[arr_stop.index()].wrapping_sub(1);
                if i >= size {
                    break;
                }
                data.groups_per_connection[connections[i].index()].push(group);
                used.push(connections[i]);
                let dep_stop = self.timetable.connection(connections[i]).dep_stop;
                i = self.cycle_index[dep_stop.index()].wrapping_sub(1);
                if i >= size {
                    break;
                }
            }
            used.reverse();

            self.finish_group(data, group_index, used);
        }
    }

    // ── Station mode ──────────────────────────────────────────────────────

    fn remove_station_cycles(&mut self, data: &mut AssignmentData) {
        let timetable = self.timetable;
        let mut path: Vec<StopId> = Vec::new();
        for group_index in 0..data.connections_per_group.len() {
            debug_assert!(path.is_empty());
            let connections = &data.connections_per_group[group_index];
            if connections.is_empty() {
                continue;
            }
            let group = GroupId(group_index as u32);

            // The journey as a station sequence; cycle_index[station] ends up
            // holding the last position at which the station is left.
            let first = timetable.connection(connections[0]);
            let mut label = PathLabel::start(first, &self.station_by_stop);
            path.push(label.station);
            for (i, &id) in connections.iter().enumerate() {
                self.cycle_index[path[path.len() - 1].index()] = i;
                path.push(self.station_by_stop[timetable.connection(id).arr_stop.index()]);
            }

            let mut i = 0usize;
            // A leading cycle returns to the start station; advance the
            // journey start past it if the skip is combinable.
            if self.cycle_index[label.station.index()] > i {
                i = self.skip_cycle(connections, &path, &label, i, false);
            }

            let mut used: Vec<_> = Vec::new();
            while i < connections.len() {
                let id = connections[i];
                let connection = *timetable.connection(id);
                // Reaching the destination station on foot beats boarding
                // another trip.
                if label.station == path[path.len() - 1] && label.trip != connection.trip {
                    break;
                }
                data.groups_per_connection[id.index()].push(group);
                used.push(id);
                i += 1;
                if i >= connections.len() {
                    break;
                }
                label.update(&connection, path[i]);
                if self.cycle_index[label.station.index()] > i {
                    i = self.skip_cycle(connections, &path, &label, i, true);
                }
            }

            self.finish_group(data, group_index, used);
            path.clear();
        }
    }

    /// The station at position `i` is revisited later.  Find the latest
    /// revisit the journey can jump to — the skip must land on the same
    /// station, switch trips, and be reachable in time — and return its
    /// position (or `i` when no jump works).
    fn skip_cycle(
        &self,
        connections: &[ConnectionId],
        path: &[StopId],
        label: &PathLabel,
        i: usize,
        apply_min_transfer_time: bool,
    ) -> usize {
        let mut j = self.cycle_index[label.station.index()];
        while j > i {
            if path[j] == path[i] {
                let next = self.timetable.connection(connections[j]);
                if next.trip != label.trip
                    && self.timetable.is_combinable_from_stop(
                        label.stop,
                        label.time,
                        next,
                        apply_min_transfer_time,
                    )
                {
                    break;
                }
            }
            j -= 1;
        }
        j
    }

    // ── Shared tail ───────────────────────────────────────────────────────

    fn finish_group(
        &mut self,
        data: &mut AssignmentData,
        group_index: usize,
        used: Vec<ConnectionId>,
    ) {
        let original_len = data.connections_per_group[group_index].len();
        if used.is_empty() {
            data.direct_walking_groups.push(GroupId(group_index as u32));
        }
        if original_len != used.len() {
            self.removed_cycle_connections += (original_len - used.len()) as u64;
            self.removed_cycles += 1;
        }
        data.connections_per_group[group_index] = used;
    }
}
