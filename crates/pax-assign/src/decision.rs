//! Decision models: PAT vectors to integer choice weights.
//!
//! Every model returns **non-negative integer weights** so that sampling can
//! run in exact integer arithmetic (see [`crate::sampling`]).  The plain
//! `distribution` forms append the weight sum as a final element; the
//! `cumulative` forms return running sums for direct inverse-CDF draws.
//!
//! All models share one guard: when even the second-best option lies outside
//! the tolerance window, the choice is forced — only minima receive weight.

use pax_core::{pat_to_int, PerceivedTime};

use crate::{AssignError, AssignResult, DecisionModelKind, Settings};

/// A decision model instance, fixed for the duration of a run.
#[derive(Clone, Debug)]
pub enum DecisionModel {
    /// Argmin.  With a positive tolerance the first minimum takes all mass;
    /// with zero tolerance ties split evenly.
    Optimal { deterministic: bool },
    /// Weight falls off linearly with the PAT distance from the optimum.
    Linear { delay_tolerance: i64, delay_value: i64 },
    /// Multinomial logit over absolute PAT differences.
    Logit { delay_tolerance: i64, beta: f64 },
    /// Kirchhoff-style power law over the slack inside the window.
    Kirchhoff {
        delay_tolerance: i64,
        beta: f64,
        norm: f64,
    },
    /// Logit over differences relative to the optimum's magnitude.
    RelativeLogit { delay_tolerance: i64, beta: f64 },
}

impl DecisionModel {
    pub fn from_settings(settings: &Settings) -> AssignResult<Self> {
        Ok(match settings.decision_model {
            DecisionModelKind::Optimal => DecisionModel::Optimal {
                deterministic: settings.delay_tolerance > 0,
            },
            DecisionModelKind::Linear => {
                if settings.delay_value < settings.delay_tolerance {
                    return Err(AssignError::InvalidDelayValue {
                        delay_value: settings.delay_value,
                        delay_tolerance: settings.delay_tolerance,
                    });
                }
                DecisionModel::Linear {
                    delay_tolerance: settings.delay_tolerance,
                    delay_value: settings.delay_value,
                }
            }
            DecisionModelKind::Logit => DecisionModel::Logit {
                delay_tolerance: settings.delay_tolerance,
                beta: settings.beta,
            },
            DecisionModelKind::Kirchhoff => DecisionModel::Kirchhoff {
                delay_tolerance: settings.delay_tolerance,
                beta: settings.beta,
                norm: 10_000.0 / (settings.delay_tolerance as f64).powf(settings.beta),
            },
            DecisionModelKind::RelativeLogit => DecisionModel::RelativeLogit {
                delay_tolerance: settings.delay_tolerance,
                beta: settings.beta,
            },
        })
    }

    // ── n-ary forms ───────────────────────────────────────────────────────

    /// Weights for each of `values`, plus their sum as the final element.
    pub fn distribution(&self, values: &[i64]) -> Vec<i64> {
        let mut result = vec![0i64; values.len() + 1];
        if values.is_empty() {
            return result;
        }
        if let DecisionModel::Optimal { deterministic } = *self {
            let min = values.iter().copied().min().unwrap_or(i64::MAX);
            let mut minimum_found = false;
            for (i, &v) in values.iter().enumerate() {
                let hit = v == min && (!deterministic || !minimum_found);
                if hit {
                    minimum_found = true;
                    result[i] = 1;
                }
            }
        } else {
            let [min, second] = two_smallest(values);
            for (i, &v) in values.iter().enumerate() {
                result[i] = self.gain(v, min, second);
            }
        }
        result[values.len()] = result[..values.len()].iter().sum();
        debug_assert!(result[values.len()] > 0, "all options weighted zero");
        result
    }

    /// Running weight sums for each of `values` (inverse-CDF form).
    pub fn cumulative_distribution(&self, values: &[i64]) -> Vec<i64> {
        let mut result = vec![0i64; values.len()];
        if values.is_empty() {
            return result;
        }
        if let DecisionModel::Optimal { deterministic } = *self {
            let min = values.iter().copied().min().unwrap_or(i64::MAX);
            let mut current = 0;
            for (i, &v) in values.iter().enumerate() {
                if v == min && (!deterministic || current == 0) {
                    current += 1;
                }
                result[i] = current;
            }
        } else {
            let [min, second] = two_smallest(values);
            let mut current = 0;
            for (i, &v) in values.iter().enumerate() {
                current += self.gain(v, min, second);
                result[i] = current;
            }
        }
        debug_assert!(*result.last().unwrap_or(&0) > 0, "all options weighted zero");
        result
    }

    // ── two-option forms ──────────────────────────────────────────────────

    /// `[weight_a, weight_b, weight_a + weight_b]` for a binary choice.
    pub fn distribution_pair(&self, a: PerceivedTime, b: PerceivedTime) -> [i64; 3] {
        if let DecisionModel::Optimal { deterministic } = *self {
            return if deterministic || a != b {
                if a <= b {
                    [1, 0, 1]
                } else {
                    [0, 1, 1]
                }
            } else {
                [1, 1, 2]
            };
        }
        let (a, b) = (pat_to_int(a), pat_to_int(b));
        let tolerance = self.delay_tolerance();
        if b - a > tolerance {
            [1, 0, 1]
        } else if a - b > tolerance {
            [0, 1, 1]
        } else if let DecisionModel::Linear { delay_value, .. } = *self {
            [b - a + delay_value, a - b + delay_value, 2 * delay_value]
        } else {
            let min = a.min(b);
            let wa = self.scaled_weight(a, min);
            let wb = self.scaled_weight(b, min);
            debug_assert!(wa + wb > 0, "both options weighted zero ({a}, {b})");
            [wa, wb, wa + wb]
        }
    }

    /// `[weight_a, weight_a + weight_b]` for a binary choice.
    pub fn cumulative_pair(&self, a: PerceivedTime, b: PerceivedTime) -> [i64; 2] {
        let [wa, _, sum] = self.distribution_pair(a, b);
        [wa, sum]
    }

    // ── weight kernels ────────────────────────────────────────────────────

    fn delay_tolerance(&self) -> i64 {
        match *self {
            DecisionModel::Optimal { .. } => 0,
            DecisionModel::Linear { delay_tolerance, .. }
            | DecisionModel::Logit { delay_tolerance, .. }
            | DecisionModel::Kirchhoff { delay_tolerance, .. }
            | DecisionModel::RelativeLogit { delay_tolerance, .. } => delay_tolerance,
        }
    }

    /// Weight of `value` in an n-ary choice with the two smallest PATs
    /// `min` and `second`.
    fn gain(&self, value: i64, min: i64, second: i64) -> i64 {
        let tolerance = self.delay_tolerance();
        if second - min > tolerance {
            // The runner-up is already out of the window: forced choice.
            return i64::from(value == min);
        }
        if value - min > tolerance {
            return 0;
        }
        match *self {
            DecisionModel::Linear { delay_value, .. } => {
                // Measure against the best *other* option so equal minima
                // weigh the same.
                let reference = if value == min { second } else { min };
                reference - value + delay_value
            }
            _ => self.scaled_weight(value, min),
        }
    }

    fn scaled_weight(&self, value: i64, min: i64) -> i64 {
        match *self {
            DecisionModel::Logit { beta, .. } => (10.0 + beta * (min - value) as f64).exp() as i64,
            DecisionModel::RelativeLogit { beta, .. } => {
                let scale = min.max(1) as f64;
                (10.0 + beta * (min - value) as f64 / scale).exp() as i64
            }
            DecisionModel::Kirchhoff {
                delay_tolerance,
                beta,
                norm,
            } => (norm * ((min - value + delay_tolerance) as f64).powf(beta)) as i64,
            DecisionModel::Optimal { .. } | DecisionModel::Linear { .. } => {
                unreachable!("handled by dedicated branches")
            }
        }
    }
}

/// The two smallest elements of a non-empty slice, duplicates included.
/// A singleton reports `i64::MAX / 2` as its runner-up so window checks
/// treat it as a forced choice.
fn two_smallest(values: &[i64]) -> [i64; 2] {
    let mut min = i64::MAX / 2;
    let mut second = i64::MAX / 2;
    for &v in values {
        if v < min {
            second = min;
            min = v;
        } else if v < second {
            second = v;
        }
    }
    [min, second]
}
