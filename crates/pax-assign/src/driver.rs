//! Destination-parallel assignment driver.
//!
//! Demand is partitioned by destination vertex; destinations are the unit of
//! work.  Each worker thread owns its full assignment state and pulls
//! destinations off a shared atomic queue (largest demand first), so thread
//! counts only change *which* worker samples a destination, never the
//! per-destination expectations.  The single synchronisation point is the
//! per-worker fold of results into the global store.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use pax_core::{ConnectionId, VertexId, WorkerRng};
use pax_timetable::{Demand, DemandEntry, Timetable};

use crate::{
    AssignError, AssignResult, AssignmentData, AssignmentWorker, DecisionModel, Settings,
};

// ── Observer ──────────────────────────────────────────────────────────────────

/// Progress callbacks from the parallel run.  Invoked concurrently from
/// worker threads; implementations synchronise internally if they mutate.
pub trait AssignmentObserver: Sync {
    /// One destination's demand has been fully assigned.
    fn on_destination_done(&self, _destination: VertexId, _demand_entries: usize) {}

    /// A worker finished all its destinations and its cycle-removal pass.
    fn on_worker_done(&self, _worker_index: usize, _groups: usize) {}
}

/// An [`AssignmentObserver`] that does nothing.
pub struct NoopObserver;

impl AssignmentObserver for NoopObserver {}

// ── GroupAssignment ───────────────────────────────────────────────────────────

/// The assignment engine's entry point: configure once, run per demand batch,
/// then read the accumulated [`AssignmentData`].
pub struct GroupAssignment<'a> {
    timetable: &'a Timetable,
    settings: Settings,
    decision: DecisionModel,
    data: AssignmentData,
    removed_cycles: u64,
    removed_cycle_connections: u64,
}

impl<'a> GroupAssignment<'a> {
    pub fn new(timetable: &'a Timetable, settings: Settings) -> AssignResult<Self> {
        if settings.passenger_multiplier == 0 {
            return Err(AssignError::ZeroPassengerMultiplier);
        }
        let decision = DecisionModel::from_settings(&settings)?;
        let data = AssignmentData::new(timetable.num_connections());
        Ok(Self {
            timetable,
            settings,
            decision,
            data,
            removed_cycles: 0,
            removed_cycle_connections: 0,
        })
    }

    /// Assign `demand` over `num_threads` workers.
    pub fn run(&mut self, demand: &Demand, num_threads: usize) -> AssignResult<()> {
        self.run_with_observer(demand, num_threads, &NoopObserver)
    }

    /// Like [`run`](Self::run), with progress callbacks.
    pub fn run_with_observer(
        &mut self,
        demand: &Demand,
        num_threads: usize,
        observer: &impl AssignmentObserver,
    ) -> AssignResult<()> {
        self.clear();
        let destinations = split_by_destination(self.timetable, &self.settings, demand);
        if destinations.is_empty() {
            return Ok(());
        }

        let num_threads = num_threads.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build()?;

        let timetable = self.timetable;
        let settings = &self.settings;
        let decision = &self.decision;
        let destinations = &destinations;
        let next_destination = &AtomicUsize::new(0);
        let fold = Mutex::new((
            AssignmentData::new(timetable.num_connections()),
            0u64,
            0u64,
        ));
        let fold_ref = &fold;

        pool.scope(|scope| {
            for worker_index in 0..num_threads {
                scope.spawn(move |_| {
                    let rng = WorkerRng::new(settings.random_seed, worker_index);
                    let mut worker = AssignmentWorker::new(timetable, settings, decision, rng);
                    loop {
                        let index = next_destination.fetch_add(1, Ordering::Relaxed);
                        if index >= destinations.len() {
                            break;
                        }
                        let (destination, entries) = &destinations[index];
                        worker.run(*destination, entries);
                        observer.on_destination_done(*destination, entries.len());
                    }
                    worker.run_cycle_removal();
                    let (data, cycles, cycle_connections) = worker.into_results();
                    let groups = data.groups.len();
                    {
                        let mut fold = match fold_ref.lock() {
                            Ok(guard) => guard,
                            Err(poisoned) => poisoned.into_inner(),
                        };
                        fold.0.merge(data);
                        fold.1 += cycles;
                        fold.2 += cycle_connections;
                    }
                    observer.on_worker_done(worker_index, groups);
                });
            }
        });

        let (data, cycles, cycle_connections) = match fold.into_inner() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        self.data = data;
        self.removed_cycles = cycles;
        self.removed_cycle_connections = cycle_connections;
        Ok(())
    }

    // ── Results ───────────────────────────────────────────────────────────

    pub fn assignment_data(&self) -> &AssignmentData {
        &self.data
    }

    pub fn removed_cycles(&self) -> u64 {
        self.removed_cycles
    }

    pub fn removed_cycle_connections(&self) -> u64 {
        self.removed_cycle_connections
    }

    /// Passengers on `connection`, de-scaled by the passenger multiplier.
    pub fn connection_load(&self, connection: ConnectionId) -> f64 {
        self.data.connection_load(connection) / self.settings.passenger_multiplier as f64
    }

    /// De-scaled passenger counts for every connection.
    pub fn passenger_counts_per_connection(&self) -> Vec<f64> {
        (0..self.timetable.num_connections())
            .map(|index| self.connection_load(ConnectionId(index as u32)))
            .collect()
    }

    fn clear(&mut self) {
        self.data = AssignmentData::new(self.timetable.num_connections());
        self.removed_cycles = 0;
        self.removed_cycle_connections = 0;
    }
}

// ── Demand partitioning ───────────────────────────────────────────────────────

/// Partition demand by destination, applying the soft filters: entries with
/// equal endpoints, forbidden stop origins, isolated origins or destinations,
/// or no passengers are silently skipped.  Buckets come out largest-first
/// (cheap guided scheduling) with entries sorted by earliest departure.
fn split_by_destination(
    timetable: &Timetable,
    settings: &Settings,
    demand: &Demand,
) -> Vec<(VertexId, Vec<DemandEntry>)> {
    let graph = timetable.transfer_graph();
    let reverse = timetable.reverse_graph();
    let mut buckets: std::collections::BTreeMap<VertexId, Vec<DemandEntry>> =
        std::collections::BTreeMap::new();

    for entry in &demand.entries {
        if entry.passengers == 0 {
            continue;
        }
        if entry.origin == entry.destination {
            continue;
        }
        if !graph.is_vertex(entry.origin) || !graph.is_vertex(entry.destination) {
            continue;
        }
        if !settings.allow_departure_stops && timetable.is_stop(entry.origin) {
            continue;
        }
        if !timetable.is_stop(entry.origin) && graph.out_degree(entry.origin) == 0 {
            continue;
        }
        if !timetable.is_stop(entry.destination) && reverse.out_degree(entry.destination) == 0 {
            continue;
        }
        buckets.entry(entry.destination).or_default().push(*entry);
    }

    let mut destinations: Vec<(VertexId, Vec<DemandEntry>)> = buckets.into_iter().collect();
    for (_, entries) in &mut destinations {
        entries.sort_by_key(|entry| entry.earliest_departure);
    }
    destinations.sort_by_key(|(vertex, entries)| {
        let total: u64 = entries.iter().map(|entry| entry.passengers).sum();
        (std::cmp::Reverse(total), *vertex)
    });
    destinations
}
