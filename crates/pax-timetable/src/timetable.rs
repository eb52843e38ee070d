//! The immutable timetable value object.
//!
//! A [`Timetable`] bundles the stop array, the departure-time-sorted
//! connection array, the trip count, and the walking [`TransferGraph`] with
//! its pre-built reverse view.  Construction validates every invariant the
//! assignment engine later assumes; a valid `Timetable` is immutable and can
//! be shared read-only across worker threads.

use pax_core::{ConnectionId, StopId, Time, TripId, VertexId};

use crate::{TimetableError, TimetableResult, TransferGraph, TransferGraphBuilder};

// ── Entities ──────────────────────────────────────────────────────────────────

/// A transit stop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stop {
    /// Minimum time needed to change vehicles at this stop, in seconds.
    pub min_transfer_time: Time,
}

impl Stop {
    pub fn new(min_transfer_time: Time) -> Self {
        Self { min_transfer_time }
    }
}

/// One timetabled vehicle movement between two stops.
///
/// Connections of the same trip form the vehicle's itinerary; within a trip
/// they are chained (each departs where the previous one arrived) and
/// non-overlapping in time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    pub dep_stop: StopId,
    pub arr_stop: StopId,
    pub dep_time: Time,
    pub arr_time: Time,
    pub trip: TripId,
}

impl Connection {
    pub fn new(dep_stop: StopId, arr_stop: StopId, dep_time: Time, arr_time: Time, trip: TripId) -> Self {
        Self {
            dep_stop,
            arr_stop,
            dep_time,
            arr_time,
            trip,
        }
    }
}

// ── Timetable ─────────────────────────────────────────────────────────────────

/// Immutable, validated transit network.
#[derive(Clone, Debug)]
pub struct Timetable {
    stops: Vec<Stop>,
    trip_count: usize,
    connections: Vec<Connection>,
    transfer_graph: TransferGraph,
    reverse_graph: TransferGraph,
}

impl Timetable {
    /// Validate and assemble a timetable.
    ///
    /// `graph` must cover at least `stops.len()` vertices (the first
    /// `|stops|` vertex ids are the stops).  `connections` must already be
    /// sorted by departure time ascending; ties keep input order and define
    /// the scan order.
    ///
    /// # Errors
    ///
    /// Any violated precondition is fatal: out-of-range stop or trip ids,
    /// `dep_time > arr_time`, negative minimum transfer times, unsorted
    /// connections, or same-trip connections that are unchained or overlap.
    pub fn new(
        stops: Vec<Stop>,
        trip_count: usize,
        connections: Vec<Connection>,
        graph: TransferGraphBuilder,
    ) -> TimetableResult<Self> {
        let transfer_graph = graph.build();
        if transfer_graph.num_vertices() < stops.len() {
            return Err(TimetableError::GraphTooSmall {
                vertices: transfer_graph.num_vertices(),
                stops: stops.len(),
            });
        }
        for (i, stop) in stops.iter().enumerate() {
            if stop.min_transfer_time < 0 {
                return Err(TimetableError::NegativeTransferTime {
                    stop: StopId(i as u32),
                });
            }
        }

        let mut last_per_trip: Vec<Option<ConnectionId>> = vec![None; trip_count];
        for (i, c) in connections.iter().enumerate() {
            let id = ConnectionId(i as u32);
            if c.dep_stop.index() >= stops.len() || c.arr_stop.index() >= stops.len() {
                return Err(TimetableError::UnknownStop { connection: id });
            }
            if c.trip.index() >= trip_count {
                return Err(TimetableError::UnknownTrip {
                    connection: id,
                    trip: c.trip,
                });
            }
            if c.dep_time > c.arr_time {
                return Err(TimetableError::TravelsBackwards { connection: id });
            }
            if i > 0 && connections[i - 1].dep_time > c.dep_time {
                return Err(TimetableError::UnsortedConnections { connection: id });
            }
            if let Some(prev_id) = last_per_trip[c.trip.index()] {
                let prev = &connections[prev_id.index()];
                if prev.arr_stop != c.dep_stop || prev.arr_time > c.dep_time {
                    return Err(TimetableError::BrokenTripChain {
                        connection: id,
                        previous: prev_id,
                    });
                }
            }
            last_per_trip[c.trip.index()] = Some(id);
        }

        let reverse_graph = transfer_graph.reversed();
        Ok(Self {
            stops,
            trip_count,
            connections,
            transfer_graph,
            reverse_graph,
        })
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    pub fn num_stops(&self) -> usize {
        self.stops.len()
    }

    pub fn num_trips(&self) -> usize {
        self.trip_count
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    // ── Vertex/stop bridging ──────────────────────────────────────────────

    /// Is this vertex one of the stop vertices?
    #[inline]
    pub fn is_stop(&self, v: VertexId) -> bool {
        v.index() < self.stops.len()
    }

    /// Reinterpret a vertex as a stop, if it is one.
    #[inline]
    pub fn as_stop(&self, v: VertexId) -> Option<StopId> {
        self.is_stop(v).then(|| StopId(v.0))
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    #[inline]
    pub fn connection(&self, id: ConnectionId) -> &Connection {
        &self.connections[id.index()]
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Minimum same-stop transfer time at `stop`, in seconds.
    #[inline]
    pub fn min_transfer_time(&self, stop: StopId) -> Time {
        self.stops[stop.index()].min_transfer_time
    }

    pub fn transfer_graph(&self) -> &TransferGraph {
        &self.transfer_graph
    }

    pub fn reverse_graph(&self) -> &TransferGraph {
        &self.reverse_graph
    }

    // ── Combinability ─────────────────────────────────────────────────────

    /// Can a passenger standing at `source` at `departure_time` reach vertex
    /// `target` by `arrival_time`, either in place or over one walking edge?
    pub fn is_reachable_by(
        &self,
        source: VertexId,
        departure_time: Time,
        target: VertexId,
        arrival_time: Time,
    ) -> bool {
        if source == target {
            return departure_time <= arrival_time;
        }
        match self.transfer_graph.find_edge(source, target) {
            None => false,
            Some(travel_time) => departure_time + travel_time <= arrival_time,
        }
    }

    /// Stop-to-connection combinability check.
    ///
    /// When `apply_min_transfer_time` is set, staying at the same stop
    /// additionally requires the stop's minimum transfer time to elapse.
    pub fn is_combinable_from_stop(
        &self,
        source: StopId,
        departure_time: Time,
        second: &Connection,
        apply_min_transfer_time: bool,
    ) -> bool {
        if apply_min_transfer_time && source == second.dep_stop {
            return departure_time + self.min_transfer_time(source) <= second.dep_time;
        }
        self.is_reachable_by(
            source.into(),
            departure_time,
            second.dep_stop.into(),
            second.dep_time,
        )
    }

    /// Feasibility of chaining two connections: same trip is always
    /// combinable; otherwise the passenger must make the (possibly walking,
    /// possibly same-stop-with-buffer) transfer in time.
    pub fn is_combinable(&self, first: &Connection, second: &Connection) -> bool {
        if first.arr_time > second.dep_time {
            return false;
        }
        if first.trip == second.trip {
            return true;
        }
        self.is_combinable_from_stop(first.arr_stop, first.arr_time, second, true)
    }
}

// ── Connection sanitizing ─────────────────────────────────────────────────────

/// Sort `connections` by departure time (stable) and drop the ones that break
/// their trip's chain: a connection must depart where its trip's previous
/// connection arrived, no earlier than that arrival.
///
/// Returns the number of dropped connections.  Loaders run this before
/// [`Timetable::new`] so that noisy feeds (duplicated or overlapping rows)
/// still produce a valid timetable; hand-built inputs can skip it and let
/// validation reject bad data instead.
pub fn sanitize_connections(connections: &mut Vec<Connection>, trip_count: usize) -> usize {
    connections.sort_by_key(|c| c.dep_time);
    let before = connections.len();
    let mut last_per_trip: Vec<Option<Connection>> = vec![None; trip_count];
    connections.retain(|c| {
        if c.trip.index() >= trip_count {
            return false;
        }
        if let Some(prev) = last_per_trip[c.trip.index()] {
            if prev.arr_stop != c.dep_stop || c.dep_time < prev.arr_time {
                return false;
            }
        }
        last_per_trip[c.trip.index()] = Some(*c);
        true
    });
    before - connections.len()
}
