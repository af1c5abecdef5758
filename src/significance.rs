//! C3: Significance testing & FDR — Rule-of-Three for exact implications,
//! one-sided binomial p-value for inexact ones, Benjamini-Hochberg
//! q-values, and the acceptance predicate.

use crate::pairstats::PairStat;
use statrs::distribution::{ContinuousCDF, Normal};

/// A pair statistic annotated with its significance test result.
#[derive(Debug, Clone, PartialEq)]
pub struct TestedPair {
    pub src: String,
    pub dst: String,
    pub n_src1: u64,
    pub k_counterex: u64,
    /// Set iff `k_counterex == 0` (Rule-of-Three case).
    pub ci95_upper: Option<f64>,
    /// Set iff `k_counterex > 0`, before BH adjustment.
    pub p_value: Option<f64>,
    /// Set iff `p_value` is set, after BH adjustment.
    pub q_value: Option<f64>,
    /// `P(dst=1|src=1) / P(dst=1)`, estimated from the same bitsets
    /// (glossary: "Lift").
    pub lift: f64,
}

/// Estimates lift from the raw pair counters: `P(dst=1|src=1) =
/// 1 - k/n_src1`; `P(dst=1) = n_dst1/total_n`. Guards a zero marginal by
/// treating lift as unbounded-high (clamped) rather than dividing by zero.
fn estimate_lift(p: &PairStat) -> f64 {
    if p.n_src1 == 0 || p.total_n == 0 {
        return 0.0;
    }
    let conditional = 1.0 - (p.k_counterex as f64 / p.n_src1 as f64);
    let marginal = p.n_dst1 as f64 / p.total_n as f64;
    if marginal <= 0.0 {
        return f64::INFINITY;
    }
    conditional / marginal
}

/// Above this support count, fall back to a normal approximation with
/// continuity correction (spec §4.3).
const EXACT_SUM_THRESHOLD: u64 = 2000;

/// Tests every surviving pair (Rule-of-Three for `k=0`, binomial tail
/// otherwise under null `p0 = epsilon`) then applies Benjamini-Hochberg to
/// the p-value subset.
pub fn test_pairs(pairs: &[PairStat], epsilon: f64) -> Vec<TestedPair> {
    let mut tested: Vec<TestedPair> = pairs
        .iter()
        .map(|p| {
            let lift = estimate_lift(p);
            if p.k_counterex == 0 {
                TestedPair {
                    src: p.src.clone(),
                    dst: p.dst.clone(),
                    n_src1: p.n_src1,
                    k_counterex: p.k_counterex,
                    ci95_upper: Some(rule_of_three(p.n_src1)),
                    p_value: None,
                    q_value: None,
                    lift,
                }
            } else {
                let pv = one_sided_binomial_pvalue(p.n_src1, p.k_counterex, epsilon);
                TestedPair {
                    src: p.src.clone(),
                    dst: p.dst.clone(),
                    n_src1: p.n_src1,
                    k_counterex: p.k_counterex,
                    ci95_upper: None,
                    p_value: Some(pv),
                    q_value: None,
                    lift,
                }
            }
        })
        .collect();

    apply_bh(&mut tested);
    tested
}

/// Rule-of-Three: 95% upper bound on the probability of an unobserved
/// event in `n` Bernoulli trials. Guards `n = 0`.
pub fn rule_of_three(n: u64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    3.0 / n as f64
}

/// One-sided binomial tail p-value: `P(X <= k)` under `X ~ Binomial(n, p0)`,
/// i.e. the probability of observing at most `k` counterexamples if the
/// true counterexample rate were `p0`. Exact summation for `n <
/// EXACT_SUM_THRESHOLD`, normal approximation with continuity correction
/// above. Guards `n = 0`, clamps the result to `[0, 1]`.
pub fn one_sided_binomial_pvalue(n: u64, k: u64, p0: f64) -> f64 {
    if n == 0 {
        return 1.0;
    }
    let p = if n < EXACT_SUM_THRESHOLD {
        exact_binomial_cdf(n, k, p0)
    } else {
        normal_approx_binomial_cdf(n, k, p0)
    };
    p.clamp(0.0, 1.0)
}

/// `sum_{r=0}^{k} C(n,r) p0^r (1-p0)^(n-r)` via log-space binomial
/// coefficients (`ln_gamma`) to avoid factorial overflow, early-exiting
/// once the cumulative sum exceeds `1 - 1e-15`.
fn exact_binomial_cdf(n: u64, k: u64, p0: f64) -> f64 {
    let k = k.min(n);
    let ln_p0 = p0.ln();
    let ln_1mp0 = (1.0 - p0).ln();
    let mut cumulative = 0.0;
    for r in 0..=k {
        let ln_choose = ln_binomial_coeff(n, r);
        let ln_term = ln_choose + (r as f64) * ln_p0 + ((n - r) as f64) * ln_1mp0;
        cumulative += ln_term.exp();
        if cumulative > 1.0 - 1e-15 {
            break;
        }
    }
    cumulative
}

fn ln_binomial_coeff(n: u64, r: u64) -> f64 {
    statrs::function::gamma::ln_gamma(n as f64 + 1.0)
        - statrs::function::gamma::ln_gamma(r as f64 + 1.0)
        - statrs::function::gamma::ln_gamma((n - r) as f64 + 1.0)
}

/// Normal approximation to the binomial CDF with continuity correction:
/// `Phi((k + 0.5 - n*p0) / sqrt(n*p0*(1-p0)))`.
fn normal_approx_binomial_cdf(n: u64, k: u64, p0: f64) -> f64 {
    let n = n as f64;
    let mean = n * p0;
    let variance = n * p0 * (1.0 - p0);
    if variance <= 0.0 {
        return if (k as f64) >= mean { 1.0 } else { 0.0 };
    }
    let sd = variance.sqrt();
    let z = (k as f64 + 0.5 - mean) / sd;
    Normal::new(0.0, 1.0)
        .expect("standard normal parameters are always valid")
        .cdf(z)
}

/// Benjamini-Hochberg FDR correction in place over the `p_value` subset:
/// sort ascending, raw `q_r = p_r * m / r`, enforce monotonicity by reverse
/// cumulative minimum, clamp to `[0, 1]`, map back to original order.
fn apply_bh(tested: &mut [TestedPair]) {
    let mut indices: Vec<usize> = tested
        .iter()
        .enumerate()
        .filter_map(|(i, t)| t.p_value.map(|_| i))
        .collect();
    indices.sort_by(|&a, &b| {
        tested[a]
            .p_value
            .unwrap()
            .partial_cmp(&tested[b].p_value.unwrap())
            .unwrap()
    });

    let m = indices.len();
    if m == 0 {
        return;
    }

    let mut raw_q: Vec<f64> = indices
        .iter()
        .enumerate()
        .map(|(rank0, &idx)| {
            let r = (rank0 + 1) as f64;
            tested[idx].p_value.unwrap() * m as f64 / r
        })
        .collect();

    for i in (0..raw_q.len().saturating_sub(1)).rev() {
        raw_q[i] = raw_q[i].min(raw_q[i + 1]);
    }

    for (rank0, &idx) in indices.iter().enumerate() {
        tested[idx].q_value = Some(raw_q[rank0].clamp(0.0, 1.0));
    }
}

/// Acceptance predicate (spec §4.3): `k=0` accepts iff `ci95_upper <=
/// epsilon`; otherwise accepts iff `q <= q_target`.
pub fn accepts(t: &TestedPair, epsilon: f64, q_target: f64) -> bool {
    match (t.ci95_upper, t.q_value) {
        (Some(ci), _) => ci <= epsilon,
        (_, Some(q)) => q <= q_target,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_of_three_exactness_at_n_500() {
        let t = TestedPair {
            src: "A".into(),
            dst: "B".into(),
            n_src1: 500,
            k_counterex: 0,
            ci95_upper: Some(rule_of_three(500)),
            p_value: None,
            q_value: None,
            lift: 2.0,
        };
        assert_eq!(t.ci95_upper.unwrap(), 0.006);
        assert!(accepts(&t, 0.02, 0.01));
    }

    #[test]
    fn rule_of_three_guards_zero_support() {
        assert_eq!(rule_of_three(0), 1.0);
    }

    #[test]
    fn bh_monotonicity_and_bounds() {
        let pairs = vec![
            PairStat { src: "a".into(), dst: "b".into(), n_src1: 100, k_counterex: 1, n_dst1: 80, total_n: 200 },
            PairStat { src: "c".into(), dst: "d".into(), n_src1: 100, k_counterex: 2, n_dst1: 80, total_n: 200 },
            PairStat { src: "e".into(), dst: "f".into(), n_src1: 100, k_counterex: 3, n_dst1: 80, total_n: 200 },
            PairStat { src: "g".into(), dst: "h".into(), n_src1: 100, k_counterex: 10, n_dst1: 80, total_n: 200 },
        ];
        let tested = test_pairs(&pairs, 0.02);
        let mut by_p: Vec<&TestedPair> = tested.iter().collect();
        by_p.sort_by(|a, b| a.p_value.unwrap().partial_cmp(&b.p_value.unwrap()).unwrap());
        for t in &tested {
            let q = t.q_value.unwrap();
            assert!((0.0..=1.0).contains(&q));
        }
        for w in by_p.windows(2) {
            assert!(w[0].q_value.unwrap() <= w[1].q_value.unwrap() + 1e-12);
        }
    }

    #[test]
    fn exact_and_normal_approx_agree_near_threshold() {
        let exact = one_sided_binomial_pvalue(1999, 50, 0.02);
        let approx = one_sided_binomial_pvalue(2000, 50, 0.02);
        assert!((exact - approx).abs() < 0.01);
    }

    #[test]
    fn k_zero_uses_rule_of_three_not_pvalue() {
        let pairs = vec![PairStat { src: "x".into(), dst: "y".into(), n_src1: 150, k_counterex: 0, n_dst1: 150, total_n: 300 }];
        let tested = test_pairs(&pairs, 0.02);
        assert!(tested[0].ci95_upper.is_some());
        assert!(tested[0].p_value.is_none());
    }
}
