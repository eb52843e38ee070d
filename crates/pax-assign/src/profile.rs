//! Per-stop PAT profiles.
//!
//! # Representation
//!
//! A profile is a `Vec<ProfileEntry>` whose index-0 element is a sentinel at
//! departure time [`NEVER`] with an [`UNREACHABLE`] PAT.  Real entries follow
//! with *strictly decreasing* departure time and *strictly decreasing*
//! normalised PAT: an option admitted to the profile departs earlier than
//! everything after it in the vector and is strictly better.  The sentinel
//! makes boundary logic uniform — the entry for "there is nothing to board
//! after `t`" always exists.
//!
//! # Normalisation
//!
//! Entries store `p̂ = pat + d·waiting_costs` so that evaluating the option
//! at an earlier time `t` is a single fused multiply: `p̂ − t·waiting_costs`.
//! This folds the waiting-time penalty between `t` and the departure into
//! the stored value.

use pax_core::{ConnectionId, PerceivedTime, Time, NEVER, UNREACHABLE};

// ── ProfileEntry ──────────────────────────────────────────────────────────────

/// One boarding option in a stop profile.
#[derive(Clone, Copy, Debug)]
pub struct ProfileEntry {
    pub departure_time: Time,
    pub connection: ConnectionId,
    normalized_pat: PerceivedTime,
}

impl ProfileEntry {
    pub const SENTINEL: ProfileEntry = ProfileEntry {
        departure_time: NEVER,
        connection: ConnectionId::INVALID,
        normalized_pat: UNREACHABLE,
    };

    /// Entry for boarding `connection` at the stop itself at `departure_time`.
    pub fn waiting(
        departure_time: Time,
        connection: ConnectionId,
        pat: PerceivedTime,
        waiting_costs: f64,
    ) -> Self {
        Self {
            departure_time,
            connection,
            normalized_pat: pat + departure_time as f64 * waiting_costs,
        }
    }

    /// Entry for walking `transfer_time` seconds towards the boarding stop
    /// and buffering `waiting_time` seconds before a departure at
    /// `departure_time`.  The stored departure time is shifted back by walk
    /// and buffer; the walk is charged at `walking_costs`.
    pub fn transfer(
        departure_time: Time,
        connection: ConnectionId,
        pat: PerceivedTime,
        transfer_time: Time,
        waiting_time: Time,
        walking_costs: f64,
        waiting_costs: f64,
    ) -> Self {
        Self {
            departure_time: departure_time - transfer_time - waiting_time,
            connection,
            normalized_pat: pat
                + (departure_time - transfer_time) as f64 * waiting_costs
                + transfer_time as f64 * walking_costs,
        }
    }

    /// Does `self` strictly improve on `other`: departs no later *and* has a
    /// strictly smaller normalised PAT?  Profiles are ordered so every entry
    /// strictly improves on its predecessor.
    #[inline]
    pub fn strictly_improves(&self, other: &ProfileEntry) -> bool {
        self.departure_time <= other.departure_time && self.normalized_pat < other.normalized_pat
    }

    /// PAT domination alone, ignoring departure times.
    #[inline]
    pub fn pat_dominates(&self, other: &ProfileEntry) -> bool {
        self.normalized_pat <= other.normalized_pat
    }

    /// Perceived arrival time when waiting from `time` until the departure.
    #[inline]
    pub fn evaluate(&self, time: Time, waiting_costs: f64) -> PerceivedTime {
        debug_assert!(
            time <= self.departure_time,
            "evaluation time {time} lies after departure {}",
            self.departure_time
        );
        if self.normalized_pat >= UNREACHABLE {
            return UNREACHABLE;
        }
        self.normalized_pat - time as f64 * waiting_costs
    }
}

/// A sentinel-seeded entry vector.  Index 0 is always [`ProfileEntry::SENTINEL`].
pub type Profile = Vec<ProfileEntry>;

// ── Delay distribution ────────────────────────────────────────────────────────

/// Cumulative probability that a vehicle's delay is at most `x` seconds,
/// given a maximum delay of `max_delay` seconds.
///
/// Zero below the origin, one from `max_delay` on, and a hyperbolic ramp in
/// between that concentrates most of the mass on small delays:
///
/// ```text
/// P(x) = 31/30 − (11/30) · max_delay / (10x + max_delay)
/// ```
pub fn delay_probability(x: f64, max_delay: f64) -> f64 {
    if x < 0.0 {
        return 0.0;
    }
    if x >= max_delay {
        return 1.0;
    }
    (31.0 / 30.0) - (11.0 / 30.0) * (max_delay / (10.0 * x + max_delay))
}

// ── StopLabel ─────────────────────────────────────────────────────────────────

/// The two profiles of one stop: boarding options at the stop itself
/// (`waiting`) and boarding options reachable by a transfer walk
/// (`transfer`).
#[derive(Clone, Debug)]
pub struct StopLabel {
    waiting_profile: Profile,
    transfer_profile: Profile,
}

impl Default for StopLabel {
    fn default() -> Self {
        Self {
            waiting_profile: vec![ProfileEntry::SENTINEL],
            transfer_profile: vec![ProfileEntry::SENTINEL],
        }
    }
}

impl StopLabel {
    /// Drop all real entries, keeping the sentinels.
    pub fn reset(&mut self) {
        self.waiting_profile.truncate(1);
        self.transfer_profile.truncate(1);
    }

    pub fn waiting_profile(&self) -> &Profile {
        &self.waiting_profile
    }

    /// Append a waiting entry.
    ///
    /// Callers insert in backward time order, so the entry must strictly
    /// improve on the current back.  An entry with the back's departure time
    /// replaces it.
    pub fn add_waiting(&mut self, entry: ProfileEntry) {
        let back_index = self.waiting_profile.len() - 1;
        let back = &mut self.waiting_profile[back_index];
        debug_assert!(
            entry.strictly_improves(back),
            "waiting entry does not improve on the profile back"
        );
        if entry.departure_time == back.departure_time {
            *back = entry;
        } else {
            self.waiting_profile.push(entry);
        }
    }

    /// Insert a transfer entry whose shifted departure time may land anywhere
    /// in the tail of the profile.
    ///
    /// Scans tail→head to the insertion point, counting how many scanned
    /// entries the new entry dominates (`shift`).  A dominated new entry is
    /// dropped; otherwise the dominated region is collapsed in place.
    /// Amortised O(1) under the backward-scan insertion workload.
    pub fn add_transfer(&mut self, entry: ProfileEntry) {
        let profile = &mut self.transfer_profile;
        if profile.len() <= 1 {
            profile.push(entry);
        } else {
            let mut insertion = profile.len() - 1;
            let mut shift: isize = -1;
            while profile[insertion].departure_time < entry.departure_time {
                debug_assert!(insertion > 0, "insertion scan reached the sentinel");
                if entry.pat_dominates(&profile[insertion]) {
                    shift += 1;
                }
                insertion -= 1;
            }
            if profile[insertion].pat_dominates(&entry) {
                return;
            }
            if profile[insertion].departure_time == entry.departure_time {
                debug_assert!(insertion > 0, "insertion scan reached the sentinel");
                shift += 1;
                insertion -= 1;
            }
            if shift == 0 {
                profile[insertion + 1] = entry;
            } else if shift == -1 {
                profile.insert(insertion + 1, entry);
            } else {
                // Collapse the `shift` dominated entries after the insertion
                // point and pull the surviving tail down.
                let shift = shift as usize;
                profile[insertion + 1] = entry;
                let mut i = insertion + 2;
                while i + shift < profile.len() {
                    profile[i] = profile[i + shift];
                    i += 1;
                }
                let new_len = profile.len() - shift;
                profile.truncate(new_len);
            }
        }
        debug_assert!(self.transfer_profile_is_monotone());
    }

    /// Expected PAT of transferring away from this stop at `time`, weighted
    /// by the delay distribution.
    ///
    /// Walks the transfer profile forward in time from the first entry at or
    /// after `time`, attributing each entry the probability mass of the delay
    /// interval it covers, until the cumulative reaches one.  If the profile
    /// runs out first, the partial expectation is renormalised; with
    /// (numerically) no mass at all the stop is unreachable.
    pub fn evaluate_with_delay(
        &self,
        time: Time,
        max_delay: Time,
        waiting_costs: f64,
    ) -> PerceivedTime {
        let mut pat: PerceivedTime = 0.0;
        let mut probability = 0.0;
        for entry in self.transfer_profile.iter().skip(1).rev() {
            if entry.departure_time < time {
                continue;
            }
            let new_probability =
                delay_probability((entry.departure_time - time) as f64, max_delay as f64);
            debug_assert!((probability..=1.0).contains(&new_probability));
            pat += (new_probability - probability) * entry.evaluate(time, waiting_costs);
            probability = new_probability;
            if probability >= 1.0 {
                break;
            }
        }
        if probability < 1.0 {
            pat = if probability > 1e-7 {
                pat / probability
            } else {
                UNREACHABLE
            };
        }
        debug_assert!(!pat.is_nan());
        pat
    }

    /// The option a passenger falls back to by *not* boarding the current
    /// connection: the most recently admitted (earliest-departing) waiting
    /// entry, or the sentinel if none exists yet.
    pub fn skip_entry(&self) -> &ProfileEntry {
        &self.waiting_profile[self.waiting_profile.len() - 1]
    }

    fn transfer_profile_is_monotone(&self) -> bool {
        self.transfer_profile
            .windows(2)
            .all(|w| w[1].strictly_improves(&w[0]))
    }
}

// ── ProfileCursor ─────────────────────────────────────────────────────────────

/// Stateful reader over a waiting profile.
///
/// The forward assignment queries each stop's profile at monotonically
/// increasing times, so the cursor keeps its position between calls and
/// advances it stepwise instead of binary-searching.  The cursor is an
/// explicit value owned by the worker; the profile itself stays immutable
/// and shareable.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProfileCursor {
    pos: usize,
}

impl ProfileCursor {
    /// Point the cursor at the profile's earliest entry.
    pub fn reset(&mut self, profile: &[ProfileEntry]) {
        self.pos = profile.len() - 1;
    }

    /// The earliest-departing entry with `departure_time >= time`.
    ///
    /// The sentinel guarantees an answer for every query time.  Out-of-order
    /// (earlier) queries are still answered correctly, just not in O(1).
    pub fn find<'a>(&mut self, profile: &'a [ProfileEntry], time: Time) -> &'a ProfileEntry {
        while self.pos + 1 < profile.len() && profile[self.pos + 1].departure_time >= time {
            self.pos += 1;
        }
        while profile[self.pos].departure_time < time {
            debug_assert!(self.pos > 0, "no profile entry at or after {time}");
            self.pos -= 1;
        }
        &profile[self.pos]
    }
}
