//! Exact integer sampling of group sizes from weight distributions.
//!
//! Given integer weights `w[0..k]` with sum `W` and `n` passengers, the
//! sampled sizes `g[i]` satisfy `Σ g = n` exactly and `E[g_i] = n·w_i/W`.
//! The deterministic part is the floor `⌊n·w_i/W⌋`; the `r` leftover
//! passengers are placed by weighted reservoir sampling without replacement
//! over the division remainders (exponential A-Res keys), so buckets with a
//! zero remainder are never topped up.

use pax_core::WorkerRng;

/// Sample `passengers` into one bucket per weight.
///
/// `values` is a distribution in the decision-model format: `k` weights
/// followed by their sum (which must be positive).
pub fn group_sizes(values: &[i64], passengers: u64, rng: &mut WorkerRng) -> Vec<u64> {
    let k = values.len() - 1;
    let weight_sum = values[k] as i128;
    debug_assert!(weight_sum > 0, "weight sum must be positive");

    let mut sizes = vec![0u64; k];
    let mut keys: Vec<(f64, usize)> = Vec::with_capacity(k);
    let mut placed: u64 = 0;
    for i in 0..k {
        let product = values[i] as i128 * passengers as i128;
        sizes[i] = (product / weight_sum) as u64;
        placed += sizes[i];
        let remainder = (product % weight_sum) as u64;
        let key = if remainder == 0 {
            // Ineligible: an exact bucket must not receive a leftover.
            f64::INFINITY
        } else {
            -rng.unit_open().ln() / remainder as f64
        };
        keys.push((key, i));
    }

    let remaining = (passengers - placed) as usize;
    if remaining > 0 {
        keys.select_nth_unstable_by(remaining - 1, |a, b| a.0.total_cmp(&b.0));
        for &(_, i) in &keys[..remaining] {
            sizes[i] += 1;
        }
    }
    debug_assert_eq!(sizes.iter().sum::<u64>(), passengers);
    sizes
}

/// Binary special case: one weighted coin instead of a reservoir.
///
/// `values` is `[w_a, w_b, w_a + w_b]`.  The two remainders sum to zero or
/// to the full weight sum, so at most one passenger is left to place.
pub fn group_sizes_pair(values: [i64; 3], passengers: u64, rng: &mut WorkerRng) -> [u64; 2] {
    let weight_sum = values[2] as i128;
    debug_assert!(weight_sum > 0, "weight sum must be positive");

    let product_a = values[0] as i128 * passengers as i128;
    let product_b = values[1] as i128 * passengers as i128;
    let mut sizes = [(product_a / weight_sum) as u64, (product_b / weight_sum) as u64];
    let remainder_a = (product_a % weight_sum) as u64;
    let remainder_b = (product_b % weight_sum) as u64;
    debug_assert!(
        remainder_a + remainder_b == 0 || remainder_a + remainder_b == weight_sum as u64,
        "binary remainders must cancel or cover the weight sum"
    );
    if remainder_a != 0 {
        if rng.gen_range(0..remainder_a + remainder_b) < remainder_a {
            sizes[0] += 1;
        } else {
            sizes[1] += 1;
        }
    }
    debug_assert_eq!(sizes[0] + sizes[1], passengers);
    sizes
}
