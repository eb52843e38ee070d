//! Choice sets: candidate boarding options with departure times and PATs.

use pax_core::{StopId, Time};
use pax_timetable::DemandEntry;

/// Parallel arrays of candidate options.
///
/// `pats` are integer perceived times as the decision models consume them.
#[derive(Clone, Debug, Default)]
pub struct ChoiceSet {
    pub options: Vec<StopId>,
    pub departure_times: Vec<Time>,
    pub pats: Vec<i64>,
}

impl ChoiceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_choice(&mut self, option: StopId, departure_time: Time, pat: i64) {
        self.options.push(option);
        self.departure_times.push(departure_time);
        self.pats.push(pat);
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.options.len(), self.pats.len());
        debug_assert_eq!(self.departure_times.len(), self.pats.len());
        self.pats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stable sort of all three arrays by departure time.
    pub fn sort_by_departure_time(&mut self) {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.departure_times[i]);
        self.options = order.iter().map(|&i| self.options[i]).collect();
        self.pats = order.iter().map(|&i| self.pats[i]).collect();
        self.departure_times = order.iter().map(|&i| self.departure_times[i]).collect();
    }

    // ── Rooftop model ─────────────────────────────────────────────────────

    /// Deterministic rooftop distribution over the departure-time axis, in
    /// the decision-model format (`k` weights plus their sum).
    ///
    /// Sorts the choice set by departure time first; the caller must index
    /// `options`/`departure_times` *after* this call.
    ///
    /// All divisions truncate toward zero; given identical inputs two
    /// implementations agree bit for bit.
    pub fn rooftop_distribution(&mut self, entry: &DemandEntry, adaptation_cost: i64) -> Vec<i64> {
        let mut result = self.rooftop_raw_distribution(entry, adaptation_cost);
        result.push(result.iter().sum());
        result
    }

    /// Indices of the candidates that survive rooftop dominance.
    ///
    /// A candidate is dominated when an earlier (forward pass) or later
    /// (backward pass) surviving candidate, charged `adaptation_cost` per
    /// second of departure shift, is still no worse.
    fn optimal_rooftop_choices(&mut self, adaptation_cost: i64) -> Vec<usize> {
        self.sort_by_departure_time();
        let n = self.len();
        let mut is_dominated = vec![false; n];

        let mut best_previous = 0;
        for i in 1..n {
            let shifted = self.pats[best_previous]
                + adaptation_cost * (self.departure_times[i] - self.departure_times[best_previous]);
            if shifted <= self.pats[i] {
                is_dominated[i] = true;
            } else {
                best_previous = i;
            }
        }

        let mut best_next = n - 1;
        while is_dominated[best_next] {
            best_next -= 1;
        }
        for i in (0..best_next).rev() {
            if is_dominated[i] {
                continue;
            }
            let shifted = self.pats[best_next]
                + adaptation_cost * (self.departure_times[best_next] - self.departure_times[i]);
            if shifted <= self.pats[i] {
                is_dominated[i] = true;
            } else {
                best_next = i;
            }
        }

        (0..n).filter(|&i| !is_dominated[i]).collect()
    }

    fn rooftop_raw_distribution(&mut self, entry: &DemandEntry, adaptation_cost: i64) -> Vec<i64> {
        let mut distribution = vec![0i64; self.len()];
        let relevant = self.optimal_rooftop_choices(adaptation_cost);

        let first = relevant[0];
        let last = relevant[relevant.len() - 1];
        distribution[first] += self.departure_times[first] - entry.earliest_departure;
        distribution[last] += entry.latest_departure - self.departure_times[last];

        for pair in relevant.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            let penalty =
                adaptation_cost * (self.departure_times[current] - self.departure_times[previous]);
            distribution[current] +=
                (self.pats[previous] + penalty - self.pats[current]) / (2 * adaptation_cost);
            distribution[previous] +=
                (self.pats[current] + penalty - self.pats[previous]) / (2 * adaptation_cost);
        }
        distribution
    }
}
