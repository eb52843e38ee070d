//! Forward stochastic assignment for one destination at a time.
//!
//! After the backward sweep has produced profiles and connection labels, the
//! worker walks the connections *forward* by departure time.  At every
//! connection each affected group faces at most one binary choice (board or
//! skip, continue or alight, finish or transfer), decided by the decision
//! model over the precomputed PATs and realised by exact integer sampling.
//! Groups split whenever a choice divides them.

use pax_core::{
    pat_to_int, ConnectionId, GroupId, StopId, Time, VertexId, WorkerRng, UNREACHABLE,
};
use pax_timetable::{DemandEntry, Timetable};

use crate::data::{ArrivedGroups, GroupDest};
use crate::profile::ProfileCursor;
use crate::sampling::{group_sizes, group_sizes_pair};
use crate::tracking::GroupArrivalLabel;
use crate::{
    AssignmentData, ChoiceSet, CycleRemoval, DecisionModel, DepartureTimeChoice, GroupTracking,
    PatComputation, Settings,
};

/// Per-thread assignment state.  One worker processes whole destinations in
/// sequence and accumulates all results in its private `AssignmentData`.
pub struct AssignmentWorker<'a> {
    timetable: &'a Timetable,
    settings: &'a Settings,
    decision: &'a DecisionModel,

    pats: PatComputation<'a>,
    cursors: Vec<ProfileCursor>,
    tracking: GroupTracking,
    data: AssignmentData,
    cycles: CycleRemoval<'a>,
    rng: WorkerRng,
}

impl<'a> AssignmentWorker<'a> {
    pub fn new(
        timetable: &'a Timetable,
        settings: &'a Settings,
        decision: &'a DecisionModel,
        rng: WorkerRng,
    ) -> Self {
        Self {
            timetable,
            settings,
            decision,
            pats: PatComputation::new(timetable),
            cursors: vec![ProfileCursor::default(); timetable.num_stops()],
            tracking: GroupTracking::new(timetable.num_stops(), timetable.num_trips()),
            data: AssignmentData::new(timetable.num_connections()),
            cycles: CycleRemoval::new(timetable, settings.cycle_mode),
            rng,
        }
    }

    /// Assign all of `demand` (entries sorted by earliest departure, all
    /// sharing `destination`) and append the outcome to this worker's data.
    pub fn run(&mut self, destination: VertexId, demand: &[DemandEntry]) {
        debug_assert!(!demand.is_empty(), "empty demand for destination");
        debug_assert!(
            self.timetable.is_stop(destination)
                || self.timetable.reverse_graph().out_degree(destination) > 0,
            "destination {destination} is isolated"
        );

        self.pats.run(destination, self.settings);

        self.tracking.validate();
        self.reset_cursors();
        self.walk_to_initial_stops(destination, demand);
        self.reset_cursors();
        self.tracking.sort_originating();

        for index in 0..self.timetable.num_connections() {
            self.process_connection(ConnectionId(index as u32));
        }
    }

    /// Run the cycle-removal post-pass over everything assigned so far.
    pub fn run_cycle_removal(&mut self) {
        self.cycles.run(&mut self.data);
    }

    /// Tear the worker down into its results:
    /// `(data, removed_cycles, removed_cycle_connections)`.
    pub fn into_results(self) -> (AssignmentData, u64, u64) {
        (
            self.data,
            self.cycles.removed_cycles(),
            self.cycles.removed_cycle_connections(),
        )
    }

    fn reset_cursors(&mut self) {
        for stop in 0..self.timetable.num_stops() {
            self.cursors[stop].reset(self.pats.waiting_profile(StopId(stop as u32)));
        }
    }

    // ── Initial walking ───────────────────────────────────────────────────

    fn walk_to_initial_stops(&mut self, destination: VertexId, demand: &[DemandEntry]) {
        for entry in demand {
            debug_assert!(entry.origin != entry.destination);
            debug_assert!(
                self.settings.allow_departure_stops || !self.timetable.is_stop(entry.origin)
            );

            let mut choice_set = self.collect_initial_walking_choices(entry);
            let original = self
                .data
                .create_group(entry, self.settings.passenger_multiplier);

            if choice_set.is_empty() {
                self.data.unassigned_groups.push(original);
            } else if choice_set.len() == 1 {
                self.enqueue_originating(
                    destination,
                    original,
                    choice_set.options[0],
                    choice_set.departure_times[0],
                );
            } else {
                let distribution =
                    if self.settings.departure_time_choice == DepartureTimeChoice::Rooftop {
                        choice_set.rooftop_distribution(entry, self.settings.adaptation_cost as i64)
                    } else {
                        self.decision.distribution(&choice_set.pats)
                    };
                let sizes = group_sizes(
                    &distribution,
                    entry.passengers * self.settings.passenger_multiplier,
                    &mut self.rng,
                );
                let mut original_moved = false;
                for (option, &size) in sizes.iter().enumerate() {
                    if size == 0 {
                        continue;
                    }
                    let group = if original_moved {
                        self.data.split_group(original, size as f64)
                    } else {
                        original_moved = true;
                        original
                    };
                    self.enqueue_originating(
                        destination,
                        group,
                        choice_set.options[option],
                        choice_set.departure_times[option],
                    );
                }
                debug_assert!(original_moved, "no initial option received passengers");
            }
        }
    }

    /// Register a group's initial choice.  A group whose chosen option *is*
    /// the destination has arrived the moment it gets there — record it as
    /// direct-walking instead of queueing it at a stop.
    fn enqueue_originating(
        &mut self,
        destination: VertexId,
        group: GroupId,
        option: StopId,
        departure_time: Time,
    ) {
        if VertexId::from(option) == destination {
            self.data.direct_walking_groups.push(group);
        } else {
            self.tracking.originating_at_stop[option.index()].push(GroupArrivalLabel {
                groups: vec![group],
                arrival_time: departure_time,
            });
        }
    }

    fn collect_initial_walking_choices(&mut self, entry: &DemandEntry) -> ChoiceSet {
        let timetable = self.timetable;
        let mut choice_set = ChoiceSet::new();
        let mut found_initial_stop = false;
        for (vertex, travel_time) in timetable.transfer_graph().edges_from(entry.origin) {
            let Some(stop) = timetable.as_stop(vertex) else {
                continue;
            };
            self.evaluate_initial_stop(entry, stop, travel_time, &mut choice_set);
            found_initial_stop = true;
        }
        if let Some(stop) = timetable.as_stop(entry.origin) {
            self.evaluate_initial_stop(entry, stop, 0, &mut choice_set);
            found_initial_stop = true;
        }
        debug_assert!(
            found_initial_stop,
            "origin {} is not connected to any stop",
            entry.origin
        );
        choice_set
    }

    /// Enumerate the boarding options at one candidate stop within the
    /// (possibly adaptation-extended) departure window.
    fn evaluate_initial_stop(
        &mut self,
        entry: &DemandEntry,
        stop: StopId,
        transfer_time: Time,
        choice_set: &mut ChoiceSet,
    ) {
        // Walking straight to the destination is an option of its own, not a
        // boarding option: one choice, charged the weighted walk.
        if VertexId::from(stop) == entry.destination {
            let departure_time = entry.earliest_departure + transfer_time;
            let pat = (transfer_time as f64 * (1.0 + self.settings.walking_costs)) as i64
                + self.adaptation_cost(entry, entry.earliest_departure);
            choice_set.add_choice(stop, departure_time, pat);
            return;
        }

        let adaptation = self.max_adaptation_time();
        let adapting = matches!(
            self.settings.departure_time_choice,
            DepartureTimeChoice::WithAdaption | DepartureTimeChoice::BoxCox
        );
        let mut departure_time = entry.earliest_departure - adaptation + transfer_time;
        let latest_departure = entry.latest_departure + adaptation + transfer_time;
        while departure_time <= latest_departure {
            let profile = self.pats.waiting_profile(stop);
            let found = self.cursors[stop.index()].find(profile, departure_time);
            departure_time = found.departure_time;
            if adapting && departure_time > latest_departure {
                return;
            }
            let value = found.evaluate(departure_time, self.settings.waiting_costs);
            if value >= UNREACHABLE {
                return;
            }
            let pat = (pat_to_int(value) - departure_time) as f64
                + transfer_time as f64 * (1.0 + self.settings.walking_costs);
            let pat = pat as i64 + self.adaptation_cost(entry, departure_time - transfer_time);
            choice_set.add_choice(stop, departure_time, pat);
            departure_time += 1;
        }
    }

    fn max_adaptation_time(&self) -> Time {
        match self.settings.departure_time_choice {
            DepartureTimeChoice::WithAdaption | DepartureTimeChoice::BoxCox => {
                self.settings.max_adaptation_time
            }
            _ => 0,
        }
    }

    /// Perceived cost of departing `departure_time` relative to the demand
    /// window: zero inside it, model-dependent outside.
    fn adaptation_cost(&self, entry: &DemandEntry, departure_time: Time) -> i64 {
        let adaptation_time = 0
            .max(entry.earliest_departure - departure_time)
            .max(departure_time - entry.latest_departure);
        match self.settings.departure_time_choice {
            DepartureTimeChoice::WithAdaption => {
                ((adaptation_time - self.settings.adaptation_offset).max(0) as f64
                    * self.settings.adaptation_cost) as i64
            }
            DepartureTimeChoice::BoxCox => {
                // Box-Cox transform of the adaptation time in (truncated)
                // minutes.
                let minutes = (adaptation_time / 60) as f64;
                (60.0 * self.settings.adaptation_beta
                    * (minutes.powf(self.settings.adaptation_lambda) - 1.0)
                    / self.settings.adaptation_lambda) as i64
            }
            _ => 0,
        }
    }

    // ── Forward connection scan ───────────────────────────────────────────

    fn process_connection(&mut self, id: ConnectionId) {
        let connection = *self.timetable.connection(id);
        self.tracking.process_originating(&connection);
        self.tracking.process_walking(&connection);

        let label = *self.pats.connection_label(id);
        let target_pat = self.pats.target_pat(&connection);
        let hop_off_pat = target_pat.min(label.transfer_pat);
        let hop_on_pat = hop_off_pat.min(label.trip_pat);

        // Board or skip.
        let (waiting, in_trip) = (
            &mut self.tracking.waiting_at_stop[connection.dep_stop.index()],
            &mut self.tracking.in_trip[connection.trip.index()],
        );
        move_groups(
            &mut self.data,
            self.decision,
            &mut self.rng,
            waiting,
            in_trip,
            label.skip_pat,
            hop_on_pat,
        );

        // Everyone aboard rides this connection.
        for &group in &self.tracking.in_trip[connection.trip.index()] {
            self.data.connections_per_group[group.index()].push(id);
        }

        // Continue or alight.
        let mut hopping_off: Vec<GroupId> = Vec::new();
        move_groups(
            &mut self.data,
            self.decision,
            &mut self.rng,
            &mut self.tracking.in_trip[connection.trip.index()],
            &mut hopping_off,
            label.trip_pat,
            hop_off_pat,
        );
        if hopping_off.is_empty() {
            return;
        }

        // Finish or transfer.
        move_groups(
            &mut self.data,
            self.decision,
            &mut self.rng,
            &mut hopping_off,
            &mut ArrivedGroups,
            label.transfer_pat,
            target_pat,
        );
        if hopping_off.is_empty() {
            return;
        }
        self.walk_to_next_stop(connection.arr_stop, hopping_off, connection.arr_time);
    }

    // ── Intermediate walking ──────────────────────────────────────────────

    fn walk_to_next_stop(&mut self, from: StopId, group_list: Vec<GroupId>, time: Time) {
        if self.timetable.transfer_graph().out_degree(from.into()) == 0 {
            // Nowhere to walk: wait in place through the minimum transfer.
            self.tracking.walking_to_stop[from.index()]
                .push(time + self.timetable.min_transfer_time(from), group_list);
            return;
        }

        let choice_set = self.collect_intermediate_walking_choices(from, time);
        debug_assert!(
            !choice_set.is_empty(),
            "{} groups stranded at stop {from}",
            group_list.len()
        );
        if choice_set.len() == 1 {
            self.tracking.walking_to_stop[choice_set.options[0].index()]
                .push(choice_set.departure_times[0], group_list);
            return;
        }

        let distribution = self.decision.distribution(&choice_set.pats);
        let mut cohorts: Vec<Vec<GroupId>> = vec![Vec::new(); choice_set.len()];
        for &group in &group_list {
            let sizes = group_sizes(
                &distribution,
                self.data.group_size(group) as u64,
                &mut self.rng,
            );
            let mut original_moved = false;
            for (option, &size) in sizes.iter().enumerate() {
                if size == 0 {
                    continue;
                }
                let moved = if original_moved {
                    self.data.split_group(group, size as f64)
                } else {
                    original_moved = true;
                    group
                };
                cohorts[option].push(moved);
            }
            debug_assert!(original_moved, "group did not move to any next stop");
        }
        for (option, cohort) in cohorts.into_iter().enumerate() {
            if cohort.is_empty() {
                continue;
            }
            self.tracking.walking_to_stop[choice_set.options[option].index()]
                .push(choice_set.departure_times[option], cohort);
        }
    }

    fn collect_intermediate_walking_choices(&mut self, from: StopId, time: Time) -> ChoiceSet {
        let timetable = self.timetable;
        let mut choice_set = ChoiceSet::new();
        for (vertex, travel_time) in timetable.transfer_graph().edges_from(from.into()) {
            let Some(stop) = timetable.as_stop(vertex) else {
                continue;
            };
            let buffer_time = if self.settings.use_transfer_buffer_times {
                timetable.min_transfer_time(stop)
            } else {
                0
            };
            self.evaluate_intermediate_stop(stop, time, travel_time, buffer_time, &mut choice_set);
        }
        // Staying put is always a candidate, behind the stop's own buffer.
        self.evaluate_intermediate_stop(
            from,
            time,
            0,
            timetable.min_transfer_time(from),
            &mut choice_set,
        );
        choice_set
    }

    fn evaluate_intermediate_stop(
        &mut self,
        stop: StopId,
        time: Time,
        transfer_time: Time,
        buffer_time: Time,
        choice_set: &mut ChoiceSet,
    ) {
        let departure_time = time + transfer_time + buffer_time;
        let profile = self.pats.waiting_profile(stop);
        let found = self.cursors[stop.index()].find(profile, departure_time);
        let value = found.evaluate(departure_time - buffer_time, self.settings.waiting_costs);
        if value >= UNREACHABLE {
            return;
        }
        let pat =
            (pat_to_int(value) as f64 + transfer_time as f64 * self.settings.walking_costs) as i64;
        choice_set.add_choice(stop, departure_time, pat);
    }
}

// ── Two-option group movement ─────────────────────────────────────────────────

/// Split every group in `from` between staying (`from_pat`) and moving to
/// `to` (`to_pat`), per the decision model's binary distribution.
///
/// A free function over the worker's disjoint pieces so callers can borrow
/// two tracking containers at once.
fn move_groups(
    data: &mut AssignmentData,
    decision: &DecisionModel,
    rng: &mut WorkerRng,
    from: &mut Vec<GroupId>,
    to: &mut impl GroupDest,
    from_pat: f64,
    to_pat: f64,
) {
    if from.is_empty() {
        return;
    }
    let values = decision.distribution_pair(from_pat, to_pat);
    let mut i = 0;
    while i < from.len() {
        let sizes = group_sizes_pair(values, data.group_size(from[i]) as u64, rng);
        if sizes[0] == 0 {
            to.push_group(from[i]);
            from.swap_remove(i);
        } else {
            if sizes[1] != 0 {
                let moved = data.split_group(from[i], sizes[1] as f64);
                to.push_group(moved);
            }
            i += 1;
        }
    }
}
