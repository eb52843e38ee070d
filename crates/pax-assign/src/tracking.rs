//! Where every group currently is, per destination.
//!
//! During the forward scan a group is in exactly one of four places:
//! originating at a stop (waiting for its chosen departure), walking toward
//! a stop, waiting at a stop (ready to board), or riding a trip.  The
//! containers hold only [`GroupId`]s; group state lives in the worker's
//! `AssignmentData`.

use std::collections::BTreeMap;

use pax_core::{GroupId, Time};
use pax_timetable::Connection;

// ── GroupArrivalLabel ─────────────────────────────────────────────────────────

/// A cohort of groups becoming ready to board at the same time.
#[derive(Clone, Debug)]
pub struct GroupArrivalLabel {
    pub groups: Vec<GroupId>,
    pub arrival_time: Time,
}

// ── ArrivalQueue ──────────────────────────────────────────────────────────────

/// Sparse min-queue of walking arrivals at one stop.
///
/// Keyed by arrival time; a `BTreeMap` keeps drain order deterministic for
/// equal keys (insertion order within a key, ascending across keys).
#[derive(Clone, Debug, Default)]
pub struct ArrivalQueue {
    inner: BTreeMap<Time, Vec<GroupId>>,
    total: usize,
}

impl ArrivalQueue {
    /// Enqueue a cohort arriving at `time`.
    pub fn push(&mut self, time: Time, groups: Vec<GroupId>) {
        debug_assert!(!groups.is_empty(), "empty walking cohort");
        self.total += groups.len();
        self.inner.entry(time).or_default().extend(groups);
    }

    /// Move every group with `arrival_time <= time` into `out`, in arrival
    /// order.
    pub fn drain_until(&mut self, time: Time, out: &mut Vec<GroupId>) {
        while let Some((&first, _)) = self.inner.first_key_value() {
            if first > time {
                break;
            }
            let groups = self.inner.remove(&first).unwrap_or_default();
            self.total -= groups.len();
            out.extend(groups);
        }
    }

    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

// ── GroupTracking ─────────────────────────────────────────────────────────────

/// Per-worker bookkeeping of group positions for one destination.
pub struct GroupTracking {
    /// Initial-walk arrivals per stop, sorted by arrival time *descending*
    /// after initial walking so the scan can pop ready cohorts off the tail.
    pub originating_at_stop: Vec<Vec<GroupArrivalLabel>>,
    /// Mid-journey walking arrivals per stop.
    pub walking_to_stop: Vec<ArrivalQueue>,
    /// Groups ready to board at a stop, FIFO.
    pub waiting_at_stop: Vec<Vec<GroupId>>,
    /// Groups currently riding a trip.
    pub in_trip: Vec<Vec<GroupId>>,
}

impl GroupTracking {
    pub fn new(num_stops: usize, num_trips: usize) -> Self {
        Self {
            originating_at_stop: vec![Vec::new(); num_stops],
            walking_to_stop: vec![ArrivalQueue::default(); num_stops],
            waiting_at_stop: vec![Vec::new(); num_stops],
            in_trip: vec![Vec::new(); num_trips],
        }
    }

    /// Every container must be empty between destinations; a leftover group
    /// would leak into the next destination's scan.
    pub fn validate(&self) {
        debug_assert!(self.in_trip.iter().all(Vec::is_empty), "groups left in a trip");
        debug_assert!(
            self.originating_at_stop.iter().all(Vec::is_empty),
            "groups left originating at a stop"
        );
        debug_assert!(
            self.walking_to_stop.iter().all(ArrivalQueue::is_empty),
            "groups left walking to a stop"
        );
        debug_assert!(
            self.waiting_at_stop.iter().all(Vec::is_empty),
            "groups left waiting at a stop"
        );
    }

    /// Sort every originating list by arrival time descending (tail = next
    /// to become ready).  Called once after initial walking.
    pub fn sort_originating(&mut self) {
        for labels in &mut self.originating_at_stop {
            labels.sort_by_key(|label| std::cmp::Reverse(label.arrival_time));
        }
    }

    /// Flush originating cohorts that are ready before `connection` departs
    /// into the waiting list of its departure stop.
    pub fn process_originating(&mut self, connection: &Connection) {
        let originating = &mut self.originating_at_stop[connection.dep_stop.index()];
        let waiting = &mut self.waiting_at_stop[connection.dep_stop.index()];
        loop {
            match originating.last() {
                Some(label) if label.arrival_time <= connection.dep_time => {
                    debug_assert!(!label.groups.is_empty(), "empty originating cohort");
                    if let Some(label) = originating.pop() {
                        waiting.extend(label.groups);
                    }
                }
                _ => break,
            }
        }
    }

    /// Flush walking cohorts that arrive before `connection` departs into
    /// the waiting list of its departure stop.
    pub fn process_walking(&mut self, connection: &Connection) {
        let walking = &mut self.walking_to_stop[connection.dep_stop.index()];
        let waiting = &mut self.waiting_at_stop[connection.dep_stop.index()];
        walking.drain_until(connection.dep_time, waiting);
    }
}
