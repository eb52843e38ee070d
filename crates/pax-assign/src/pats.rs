//! Backward profile computation: one sweep over the connections per
//! destination.
//!
//! Scanning connections by *descending* departure time guarantees that when
//! a connection is processed, every way of continuing the journey after it —
//! staying on the trip, transferring, walking to the destination — has
//! already been evaluated.  The sweep produces, for every connection, the
//! PAT triple the forward assignment chooses between, and per stop the
//! waiting profile the initial walking enumerates.

use pax_core::{ConnectionId, PerceivedTime, StopId, Time, VertexId, NEVER, UNREACHABLE};
use pax_timetable::{Connection, Timetable};

use crate::profile::{Profile, ProfileEntry, StopLabel};
use crate::Settings;

// ── ConnectionLabel ───────────────────────────────────────────────────────────

/// The three continuation PATs of one connection at its departure stop.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionLabel {
    /// Best PAT of staying on this trip past this connection.
    pub trip_pat: PerceivedTime,
    /// Best PAT of alighting at the arrival stop and transferring.
    pub transfer_pat: PerceivedTime,
    /// Best PAT of not boarding: the departure stop's next admitted option.
    pub skip_pat: PerceivedTime,
}

impl Default for ConnectionLabel {
    fn default() -> Self {
        Self {
            trip_pat: UNREACHABLE,
            transfer_pat: UNREACHABLE,
            skip_pat: UNREACHABLE,
        }
    }
}

// ── PatComputation ────────────────────────────────────────────────────────────

/// Reusable backward-sweep state.  One instance per worker; `run` resets and
/// recomputes for each destination.
pub struct PatComputation<'a> {
    timetable: &'a Timetable,
    connection_labels: Vec<ConnectionLabel>,
    trip_pat: Vec<PerceivedTime>,
    stop_labels: Vec<StopLabel>,
    /// Weighted walking distance from each stop straight to the current
    /// target; `NEVER` where no direct walk exists.
    transfer_distance_to_target: Vec<Time>,
    target: Option<VertexId>,
}

impl<'a> PatComputation<'a> {
    pub fn new(timetable: &'a Timetable) -> Self {
        Self {
            timetable,
            connection_labels: vec![ConnectionLabel::default(); timetable.num_connections()],
            trip_pat: vec![UNREACHABLE; timetable.num_trips()],
            stop_labels: vec![StopLabel::default(); timetable.num_stops()],
            transfer_distance_to_target: vec![NEVER; timetable.num_stops()],
            target: None,
        }
    }

    /// Compute labels and profiles toward `target`.
    pub fn run(&mut self, target: VertexId, settings: &Settings) {
        let timetable = self.timetable;
        self.clear();
        self.initialize(target, settings.walking_costs);

        for index in (0..timetable.num_connections()).rev() {
            let id = ConnectionId(index as u32);
            let connection = timetable.connection(id);
            let skip_entry = *self.stop_labels[connection.dep_stop.index()].skip_entry();
            debug_assert!(
                skip_entry.departure_time >= connection.dep_time,
                "connections scanned out of order"
            );

            let label = ConnectionLabel {
                trip_pat: self.trip_pat[connection.trip.index()],
                transfer_pat: self.stop_labels[connection.arr_stop.index()].evaluate_with_delay(
                    connection.arr_time,
                    settings.max_delay,
                    settings.waiting_costs,
                ) + settings.transfer_costs as f64,
                skip_pat: skip_entry.evaluate(connection.dep_time, settings.waiting_costs),
            };
            self.connection_labels[index] = label;

            let pat = label
                .trip_pat
                .min(self.target_pat(connection))
                .min(label.transfer_pat);
            self.trip_pat[connection.trip.index()] = pat;
            if pat >= label.skip_pat {
                continue;
            }
            debug_assert!(pat < UNREACHABLE, "admitting an unreachable option");

            self.stop_labels[connection.dep_stop.index()].add_waiting(ProfileEntry::waiting(
                connection.dep_time,
                id,
                pat,
                settings.waiting_costs,
            ));
            let buffer_time = timetable.min_transfer_time(connection.dep_stop);
            self.stop_labels[connection.dep_stop.index()].add_transfer(ProfileEntry::transfer(
                connection.dep_time,
                id,
                pat,
                0,
                buffer_time,
                settings.walking_costs,
                settings.waiting_costs,
            ));
            for (from, travel_time) in timetable
                .reverse_graph()
                .edges_from(connection.dep_stop.into())
            {
                let Some(from_stop) = timetable.as_stop(from) else {
                    continue;
                };
                self.stop_labels[from_stop.index()].add_transfer(ProfileEntry::transfer(
                    connection.dep_time,
                    id,
                    pat,
                    travel_time,
                    if settings.use_transfer_buffer_times {
                        buffer_time
                    } else {
                        0
                    },
                    settings.walking_costs,
                    settings.waiting_costs,
                ));
            }
        }
    }

    #[inline]
    pub fn connection_label(&self, id: ConnectionId) -> &ConnectionLabel {
        &self.connection_labels[id.index()]
    }

    /// PAT of alighting from `connection` and walking straight to the target.
    pub fn target_pat(&self, connection: &Connection) -> PerceivedTime {
        let distance = self.transfer_distance_to_target[connection.arr_stop.index()];
        if distance < NEVER {
            (connection.arr_time + distance) as PerceivedTime
        } else {
            UNREACHABLE
        }
    }

    /// The waiting profile of `stop` from the most recent `run`.
    pub fn waiting_profile(&self, stop: StopId) -> &Profile {
        self.stop_labels[stop.index()].waiting_profile()
    }

    // ── Per-destination reset ─────────────────────────────────────────────

    fn clear(&mut self) {
        self.trip_pat.fill(UNREACHABLE);
        for label in &mut self.stop_labels {
            label.reset();
        }
        // Only the previous target's neighborhood was touched; undo exactly
        // that instead of refilling the whole distance array.
        if let Some(previous) = self.target.take() {
            if self.timetable.transfer_graph().is_vertex(previous) {
                for (stop, _) in self.timetable.reverse_graph().edges_from(previous) {
                    if let Some(stop) = self.timetable.as_stop(stop) {
                        self.transfer_distance_to_target[stop.index()] = NEVER;
                    }
                }
                if let Some(stop) = self.timetable.as_stop(previous) {
                    self.transfer_distance_to_target[stop.index()] = NEVER;
                }
            }
        }
    }

    fn initialize(&mut self, target: VertexId, walking_costs: f64) {
        self.target = Some(target);
        for (stop, travel_time) in self.timetable.reverse_graph().edges_from(target) {
            let Some(stop) = self.timetable.as_stop(stop) else {
                continue;
            };
            self.transfer_distance_to_target[stop.index()] =
                ((walking_costs + 1.0) * travel_time as f64) as Time;
        }
        if let Some(stop) = self.timetable.as_stop(target) {
            self.transfer_distance_to_target[stop.index()] = 0;
        }
    }
}
