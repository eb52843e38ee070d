//! Unit tests for pax-core.

use crate::{pat_to_int, ConnectionId, GroupId, StopId, VertexId, WorkerRng, NEVER, UNREACHABLE};

// ── Typed IDs ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod ids {
    use super::*;

    #[test]
    fn index_round_trip() {
        let stop = StopId(7);
        assert_eq!(stop.index(), 7);
        assert_eq!(StopId::try_from(7usize).unwrap(), stop);
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(GroupId::default(), GroupId::INVALID);
        assert_eq!(ConnectionId::default(), ConnectionId::INVALID);
    }

    #[test]
    fn ordering_follows_inner() {
        assert!(StopId(1) < StopId(2));
        assert!(StopId(2) < StopId::INVALID);
    }

    #[test]
    fn stop_to_vertex_keeps_index() {
        assert_eq!(VertexId::from(StopId(3)), VertexId(3));
    }

    #[test]
    fn display_names_the_type() {
        assert_eq!(StopId(4).to_string(), "StopId(4)");
    }
}

// ── Time sentinels ────────────────────────────────────────────────────────────

#[cfg(test)]
mod time {
    use super::*;

    #[test]
    fn never_tolerates_additions() {
        // Adding a transfer time to the sentinel must not overflow.
        let shifted = NEVER + 86_400;
        assert!(shifted > NEVER);
    }

    #[test]
    fn unreachable_dominates_min_folds() {
        assert_eq!(1234.0_f64.min(UNREACHABLE), 1234.0);
        assert!(UNREACHABLE > 1e18);
    }

    #[test]
    fn pat_to_int_truncates_and_saturates() {
        assert_eq!(pat_to_int(99.7), 99);
        assert_eq!(pat_to_int(UNREACHABLE), NEVER);
        assert_eq!(pat_to_int(NEVER as f64 * 2.0), NEVER);
    }
}

// ── WorkerRng ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod rng {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = WorkerRng::new(42, 3);
        let mut b = WorkerRng::new(42, 3);
        for _ in 0..100 {
            assert_eq!(a.gen_range(0..1_000_000u64), b.gen_range(0..1_000_000u64));
        }
    }

    #[test]
    fn different_workers_diverge() {
        let mut a = WorkerRng::new(42, 0);
        let mut b = WorkerRng::new(42, 1);
        let draws_a: Vec<u64> = (0..16).map(|_| a.gen_range(0..u64::MAX)).collect();
        let draws_b: Vec<u64> = (0..16).map(|_| b.gen_range(0..u64::MAX)).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn unit_open_never_zero() {
        let mut rng = WorkerRng::new(7, 0);
        for _ in 0..10_000 {
            let u = rng.unit_open();
            assert!(u > 0.0 && u <= 1.0);
            assert!(u.ln().is_finite());
        }
    }
}
