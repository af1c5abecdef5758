//! C2: Pair statistics — popcount-driven counterexample and support counts
//! for every ordered pair of metrics.
//!
//! `n_i1 = popcount(values_i & !unknown_i)`; `k_ij = popcount(values_i &
//! !values_j & !unknown_j)`. Pairs with no support (`n_i1 == 0`) are
//! skipped entirely. The outer loop over `i` is fanned out across a
//! `rayon` worker pool (spec §5: "internal parallelism may partition pair
//! statistics across ranges of i, joining into the flat accumulator") into
//! per-thread local buffers that are concatenated, so no shared mutable
//! state crosses thread boundaries during a batch.

use crate::binarizer::MetricBits;
use rayon::prelude::*;

/// Raw counters for one ordered pair before significance testing.
#[derive(Debug, Clone, PartialEq)]
pub struct PairStat {
    pub src: String,
    pub dst: String,
    pub n_src1: u64,
    pub k_counterex: u64,
    /// `popcount(values_dst & !unknown_dst)`, the destination's marginal
    /// support count — carried alongside so the decision engine can
    /// estimate lift (`P(dst=1|src=1) / P(dst=1)`) without re-scanning
    /// the bitsets.
    pub n_dst1: u64,
    /// Total event count `N` (bitset length), the denominator for the
    /// destination's marginal probability.
    pub total_n: u64,
}

/// Computes pair statistics for every ordered pair `(i, j)`, `i != j`,
/// skipping pairs with zero support. `O(d^2 * N/64)` work over flat words.
pub fn compute_all_pairs(metrics: &[MetricBits]) -> Vec<PairStat> {
    let not_unk: Vec<crate::binarizer::Bitset> = metrics.iter().map(|mb| mb.unknown.not()).collect();
    let n_known: Vec<u64> = metrics
        .iter()
        .zip(&not_unk)
        .map(|(mb, nu)| mb.values.popcount_and(nu))
        .collect();
    let total_n = metrics.first().map(|m| m.values.len() as u64).unwrap_or(0);

    let per_i: Vec<Vec<PairStat>> = (0..metrics.len())
        .into_par_iter()
        .map(|i| {
            let src = &metrics[i];
            let n_src1 = n_known[i];
            if n_src1 == 0 {
                return Vec::new();
            }
            let src_and_not_unk = src.values.and(&not_unk[i]);
            let mut local = Vec::with_capacity(metrics.len().saturating_sub(1));
            for (j, dst) in metrics.iter().enumerate() {
                if i == j {
                    continue;
                }
                let k = src_and_not_unk.popcount_and_not_not(&dst.values, &dst.unknown);
                local.push(PairStat {
                    src: src.name.clone(),
                    dst: dst.name.clone(),
                    n_src1,
                    k_counterex: k,
                    n_dst1: n_known[j],
                    total_n,
                });
            }
            local
        })
        .collect();

    per_i.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binarizer::binarize;
    use crate::types::Event;
    use std::collections::HashMap;

    #[test]
    fn chain_x_y_z_support_and_counterexamples() {
        // 150 (1,1,1), 100 (0,1,1), 50 (0,0,1), 100 (0,0,0)
        let mut events = Vec::new();
        for _ in 0..150 {
            events.push(Event::new().with("X", 1.0).with("Y", 1.0).with("Z", 1.0));
        }
        for _ in 0..100 {
            events.push(Event::new().with("X", 0.0).with("Y", 1.0).with("Z", 1.0));
        }
        for _ in 0..50 {
            events.push(Event::new().with("X", 0.0).with("Y", 0.0).with("Z", 1.0));
        }
        for _ in 0..100 {
            events.push(Event::new().with("X", 0.0).with("Y", 0.0).with("Z", 0.0));
        }
        let thresholds: HashMap<String, f64> =
            [("X", 0.5), ("Y", 0.5), ("Z", 0.5)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
        let bits = binarize(&events, &thresholds, 0.0).unwrap();
        let pairs = compute_all_pairs(&bits);

        let xy = pairs.iter().find(|p| p.src == "X" && p.dst == "Y").unwrap();
        assert_eq!(xy.n_src1, 150);
        assert_eq!(xy.k_counterex, 0);

        let yz = pairs.iter().find(|p| p.src == "Y" && p.dst == "Z").unwrap();
        assert_eq!(yz.n_src1, 250);
        assert_eq!(yz.k_counterex, 0);

        let xz = pairs.iter().find(|p| p.src == "X" && p.dst == "Z").unwrap();
        assert_eq!(xz.n_src1, 150);
        assert_eq!(xz.k_counterex, 0);
    }

    #[test]
    fn zero_support_pair_is_skipped() {
        let events = vec![Event::new()];
        let thresholds: HashMap<String, f64> = [("X", 0.5), ("Y", 0.5)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        let bits = binarize(&events, &thresholds, 0.0).unwrap();
        let pairs = compute_all_pairs(&bits);
        assert!(pairs.is_empty());
    }
}
