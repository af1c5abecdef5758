//! C1: Binarizer — maps events x metrics to the three-valued lattice
//! {0, 1, unknown}, encoded as two word-packed bitsets per metric.
//!
//! Grounded on the original `binarize_events` (margin-delta threshold
//! binarization into a values bitset and an unknown mask), re-expressed
//! over flat `Vec<u64>` words per the design doc's "operate in 64-bit
//! words" implementation contract for `pairstats.rs`.

use crate::error::{BolcdError, Result};
use std::collections::HashMap;

/// A flat, word-packed bitset of a fixed length `len` bits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitset {
    words: Vec<u64>,
    len: usize,
}

impl Bitset {
    pub fn zeros(len: usize) -> Self {
        let nwords = len.div_ceil(64);
        Self {
            words: vec![0u64; nwords],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn set(&mut self, bit: usize) {
        debug_assert!(bit < self.len);
        self.words[bit / 64] |= 1u64 << (bit % 64);
    }

    #[inline]
    pub fn get(&self, bit: usize) -> bool {
        debug_assert!(bit < self.len);
        (self.words[bit / 64] >> (bit % 64)) & 1 == 1
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// popcount(self & !other & !other_unknown is NOT done here; callers
    /// combine bitsets directly). Plain popcount of this bitset.
    pub fn popcount(&self) -> u64 {
        self.words.iter().map(|w| w.count_ones() as u64).sum()
    }

    /// popcount(self & other).
    pub fn popcount_and(&self, other: &Bitset) -> u64 {
        debug_assert_eq!(self.words.len(), other.words.len());
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & b).count_ones() as u64)
            .sum()
    }

    /// popcount(self & !other).
    pub fn popcount_and_not(&self, other: &Bitset) -> u64 {
        debug_assert_eq!(self.words.len(), other.words.len());
        self.words
            .iter()
            .zip(other.words.iter())
            .map(|(a, b)| (a & !b).count_ones() as u64)
            .sum()
    }

    /// popcount(self & !b & !c).
    pub fn popcount_and_not_not(&self, b: &Bitset, c: &Bitset) -> u64 {
        debug_assert_eq!(self.words.len(), b.words.len());
        debug_assert_eq!(self.words.len(), c.words.len());
        self.words
            .iter()
            .zip(b.words.iter())
            .zip(c.words.iter())
            .map(|((a, b), c)| (a & !b & !c).count_ones() as u64)
            .sum()
    }

    /// Bitwise complement as a new bitset.
    pub fn not(&self) -> Bitset {
        Bitset {
            words: self.words.iter().map(|w| !w).collect(),
            len: self.len,
        }
    }

    /// Bitwise AND as a new bitset.
    pub fn and(&self, other: &Bitset) -> Bitset {
        debug_assert_eq!(self.words.len(), other.words.len());
        Bitset {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(a, b)| a & b)
                .collect(),
            len: self.len,
        }
    }
}

/// Per-metric bitset pair: `values` (known 1-bits) and `unknown` (missing
/// or within the margin band). Invariant: `values & unknown == 0`.
#[derive(Debug, Clone)]
pub struct MetricBits {
    pub name: String,
    pub values: Bitset,
    pub unknown: Bitset,
}

impl MetricBits {
    /// Assert the structural invariant: a bit is never both known-true and
    /// unknown.
    pub fn check_invariant(&self) -> bool {
        self.values
            .words()
            .iter()
            .zip(self.unknown.words().iter())
            .all(|(v, u)| v & u == 0)
    }
}

/// Binarizes an ordered event sequence against per-metric thresholds and a
/// shared margin delta.
///
/// Rules for event k, metric m with value x:
/// - x >= a_m + delta -> values bit k = 1
/// - x <= a_m - delta -> values bit k = 0 (nothing set)
/// - otherwise (|x - a_m| < delta, or missing) -> unknown bit k = 1
pub fn binarize(
    events: &[crate::types::Event],
    thresholds: &HashMap<String, f64>,
    margin_delta: f64,
) -> Result<Vec<MetricBits>> {
    if margin_delta < 0.0 {
        return Err(BolcdError::validation("margin_delta must be >= 0"));
    }
    let n = events.len();
    let mut metrics: Vec<&String> = thresholds.keys().collect();
    metrics.sort();

    let mut out: Vec<MetricBits> = metrics
        .iter()
        .map(|name| MetricBits {
            name: (*name).clone(),
            values: Bitset::zeros(n),
            unknown: Bitset::zeros(n),
        })
        .collect();

    for (bit_index, event) in events.iter().enumerate() {
        for (m_index, name) in metrics.iter().enumerate() {
            let a_m = thresholds[*name];
            match event.get(name) {
                None => out[m_index].unknown.set(bit_index),
                Some(x) => {
                    if x >= a_m + margin_delta {
                        out[m_index].values.set(bit_index);
                    } else if x <= a_m - margin_delta {
                        // explicitly 0: nothing to set
                    } else {
                        out[m_index].unknown.set(bit_index);
                    }
                }
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Event;

    fn thresholds(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn values_and_unknown_never_overlap() {
        let events = vec![
            Event::new().with("x", 1.0),
            Event::new().with("x", 0.5),
            Event::new(),
        ];
        let bits = binarize(&events, &thresholds(&[("x", 0.5)]), 0.1).unwrap();
        assert!(bits[0].check_invariant());
    }

    #[test]
    fn exactly_threshold_with_margin_is_unknown() {
        let events = vec![Event::new().with("x", 0.5)];
        let bits = binarize(&events, &thresholds(&[("x", 0.5)]), 0.1).unwrap();
        assert!(bits[0].unknown.get(0));
        assert!(!bits[0].values.get(0));
    }

    #[test]
    fn missing_value_is_unknown() {
        let events = vec![Event::new()];
        let bits = binarize(&events, &thresholds(&[("x", 0.5)]), 0.0).unwrap();
        assert!(bits[0].unknown.get(0));
        assert!(!bits[0].values.get(0));
    }

    #[test]
    fn idempotent_on_repeated_runs() {
        let events = vec![
            Event::new().with("x", 1.0),
            Event::new().with("x", 0.0),
            Event::new(),
        ];
        let th = thresholds(&[("x", 0.5)]);
        let a = binarize(&events, &th, 0.05).unwrap();
        let b = binarize(&events, &th, 0.05).unwrap();
        assert_eq!(a[0].values, b[0].values);
        assert_eq!(a[0].unknown, b[0].unknown);
    }

    #[test]
    fn unknown_mass_non_decreasing_in_delta() {
        let events = vec![
            Event::new().with("x", 0.52),
            Event::new().with("x", 0.60),
            Event::new().with("x", 0.40),
        ];
        let th = thresholds(&[("x", 0.5)]);
        let small = binarize(&events, &th, 0.01).unwrap();
        let large = binarize(&events, &th, 0.5).unwrap();
        assert!(large[0].unknown.popcount() >= small[0].unknown.popcount());
    }

    #[test]
    fn all_metrics_missing_contributes_zero_support() {
        let events = vec![Event::new(), Event::new()];
        let bits = binarize(&events, &thresholds(&[("x", 0.5), ("y", 1.0)]), 0.0).unwrap();
        for mb in &bits {
            assert_eq!(mb.values.popcount(), 0);
            assert_eq!(mb.unknown.popcount(), 2);
        }
    }
}
