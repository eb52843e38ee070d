//! Demand value objects and discretisation.

use pax_core::{Time, VertexId};

// ── DemandEntry ───────────────────────────────────────────────────────────────

/// One origin/destination flow with a departure-time window.
///
/// `demand_index` survives group splitting and merging, so downstream
/// reporting can always trace a group back to its demand row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DemandEntry {
    pub demand_index: usize,
    pub origin: VertexId,
    pub destination: VertexId,
    pub earliest_departure: Time,
    pub latest_departure: Time,
    pub passengers: u64,
}

// ── Demand ────────────────────────────────────────────────────────────────────

/// A batch of demand entries.
#[derive(Clone, Debug, Default)]
pub struct Demand {
    pub entries: Vec<DemandEntry>,
}

impl Demand {
    pub fn new(entries: Vec<DemandEntry>) -> Self {
        Self { entries }
    }

    /// Total passengers over all entries.
    pub fn num_passengers(&self) -> u64 {
        self.entries.iter().map(|e| e.passengers).sum()
    }

    /// Split each entry's departure window into `time_step`-second buckets,
    /// spreading its passengers round-robin over the buckets.
    ///
    /// With `keep_intervals`, each bucket keeps a `time_step`-wide window
    /// (clamped to the original latest departure); otherwise buckets collapse
    /// to a single departure instant.  `include_border` controls whether the
    /// window's upper border starts a bucket of its own.
    ///
    /// A negative `time_step` disables discretisation.  Passenger mass and
    /// `demand_index` values are preserved.
    pub fn discretize(&mut self, time_step: Time, keep_intervals: bool, include_border: bool) {
        if time_step < 0 {
            return;
        }
        let mut new_entries: Vec<DemandEntry> = Vec::with_capacity(self.entries.len());
        for old in &self.entries {
            let first_index = new_entries.len();
            let mut offset: Time = 0;
            for _ in 0..old.passengers {
                let slot = first_index + offset as usize;
                if slot >= new_entries.len() {
                    let earliest = old.earliest_departure + offset * time_step;
                    let latest = if keep_intervals {
                        (earliest + time_step).min(old.latest_departure)
                    } else {
                        earliest
                    };
                    new_entries.push(DemandEntry {
                        earliest_departure: earliest,
                        latest_departure: latest,
                        passengers: 1,
                        ..*old
                    });
                } else {
                    new_entries[slot].passengers += 1;
                }
                offset += 1;
                let next_start = old.earliest_departure + offset * time_step;
                let wrapped = if include_border {
                    next_start > old.latest_departure
                } else {
                    next_start >= old.latest_departure
                };
                if wrapped {
                    offset = 0;
                }
            }
        }
        self.entries = new_entries;
    }
}
