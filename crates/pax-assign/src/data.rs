//! Group store and connection↔group incidence.
//!
//! `AssignmentData` is an append-only log: groups are created and split but
//! never removed, and every container references them by [`GroupId`] only.
//! Each worker owns a private instance; the driver folds worker instances
//! into a global one by renumbering with a monotone offset.

use pax_core::{ConnectionId, GroupId};
use pax_timetable::DemandEntry;

// ── GroupData ─────────────────────────────────────────────────────────────────

/// One passenger cohort sharing an itinerary prefix.
#[derive(Clone, Copy, Debug)]
pub struct GroupData {
    pub id: GroupId,
    /// Index of the demand entry this group descends from.  Survives splits
    /// and merges.
    pub demand_index: usize,
    /// Passengers in the group (scaled by the passenger multiplier).
    /// Integral in practice, fractional in downstream per-passenger reports.
    pub size: f64,
}

// ── Group sinks ───────────────────────────────────────────────────────────────

/// Anything groups can be moved into.
///
/// Containers never own group state, they only collect ids; this trait lets
/// the two-option move routine target lists and sinks alike.
pub trait GroupDest {
    fn push_group(&mut self, group: GroupId);
}

impl GroupDest for Vec<GroupId> {
    #[inline]
    fn push_group(&mut self, group: GroupId) {
        self.push(group);
    }
}

/// Terminal sink for groups that reached their destination.  Arrived groups
/// need no further bookkeeping; their itinerary is already recorded.
#[derive(Default)]
pub struct ArrivedGroups;

impl GroupDest for ArrivedGroups {
    #[inline]
    fn push_group(&mut self, _group: GroupId) {}
}

// ── AssignmentData ────────────────────────────────────────────────────────────

/// The raw result of an assignment: groups, their itineraries, and the
/// inverted per-connection index.
#[derive(Clone, Debug)]
pub struct AssignmentData {
    pub groups: Vec<GroupData>,
    /// Itinerary of each group, parallel to `groups`.
    pub connections_per_group: Vec<Vec<ConnectionId>>,
    /// Inverse of `connections_per_group`, parallel to the timetable's
    /// connection array.  Populated by cycle removal.
    pub groups_per_connection: Vec<Vec<GroupId>>,
    /// Groups with no initial boarding option at all.
    pub unassigned_groups: Vec<GroupId>,
    /// Groups that walk from origin to destination without boarding.
    pub direct_walking_groups: Vec<GroupId>,
}

impl AssignmentData {
    pub fn new(num_connections: usize) -> Self {
        Self {
            groups: Vec::new(),
            connections_per_group: Vec::new(),
            groups_per_connection: vec![Vec::new(); num_connections],
            unassigned_groups: Vec::new(),
            direct_walking_groups: Vec::new(),
        }
    }

    /// Append a fresh group holding a demand entry's full (multiplied)
    /// passenger mass.
    pub fn create_group(&mut self, entry: &DemandEntry, passenger_multiplier: u64) -> GroupId {
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(GroupData {
            id,
            demand_index: entry.demand_index,
            size: (entry.passengers * passenger_multiplier) as f64,
        });
        self.connections_per_group.push(Vec::new());
        id
    }

    /// Split `passengers` off `parent` into a new group that inherits the
    /// demand index and the itinerary prefix.
    ///
    /// Requires `0 < passengers < size(parent)`; the callers' sampling
    /// guarantees it.
    pub fn split_group(&mut self, parent: GroupId, passengers: f64) -> GroupId {
        debug_assert!(passengers > 0.0, "cannot split off an empty group");
        debug_assert!(
            self.groups[parent.index()].size > passengers,
            "cannot split off {passengers} of {}",
            self.groups[parent.index()].size
        );
        let id = GroupId(self.groups.len() as u32);
        self.groups.push(GroupData {
            id,
            demand_index: self.groups[parent.index()].demand_index,
            size: passengers,
        });
        self.connections_per_group
            .push(self.connections_per_group[parent.index()].clone());
        self.groups[parent.index()].size -= passengers;
        id
    }

    #[inline]
    pub fn group_size(&self, group: GroupId) -> f64 {
        self.groups[group.index()].size
    }

    /// Invert `connections_per_group` into `groups_per_connection` verbatim.
    pub fn add_groups_to_connections(&mut self) {
        for (group, connections) in self.connections_per_group.iter().enumerate() {
            for &connection in connections {
                self.groups_per_connection[connection.index()].push(GroupId(group as u32));
            }
        }
    }

    /// Total passenger mass riding `connection` (multiplier included).
    pub fn connection_load(&self, connection: ConnectionId) -> f64 {
        self.groups_per_connection[connection.index()]
            .iter()
            .map(|&g| self.groups[g.index()].size)
            .sum()
    }

    /// Fold a worker-local store into this one.
    ///
    /// Incoming groups are renumbered by the current group count; every id
    /// list is translated by the same offset.
    pub fn merge(&mut self, other: AssignmentData) {
        let offset = self.groups.len() as u32;
        for group in other.groups {
            debug_assert_eq!(group.id.0 + offset, self.groups.len() as u32);
            self.groups.push(GroupData {
                id: GroupId(group.id.0 + offset),
                ..group
            });
        }
        self.connections_per_group.extend(other.connections_per_group);
        for (connection, groups) in other.groups_per_connection.into_iter().enumerate() {
            self.groups_per_connection[connection]
                .extend(groups.into_iter().map(|g| GroupId(g.0 + offset)));
        }
        self.unassigned_groups
            .extend(other.unassigned_groups.into_iter().map(|g| GroupId(g.0 + offset)));
        self.direct_walking_groups
            .extend(other.direct_walking_groups.into_iter().map(|g| GroupId(g.0 + offset)));
    }
}
