//! C11: Rule derivation — builds connector-neutral suppression rules
//! from accepted A->B->C triangles in the learned graph (spec §4.11; see
//! `SPEC_FULL.md` §4.11a for why only the connector-neutral shape is
//! emitted here, vendor-specific selectors being out of scope).

use crate::graph::EdgeRecord;
use serde::{Deserialize, Serialize};

/// A connector-neutral suppression rule: downstream connectors translate
/// this shape to their own query language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub name: String,
    pub segment: String,
    pub via: String,
    pub src: String,
    pub dst: String,
}

impl SuppressionRule {
    fn idempotent_name(segment: &str, src: &str, via: &str, dst: &str) -> String {
        format!("suppress::{segment}::{src}->{via}->{dst}")
    }
}

/// For each pair of accepted post-reduction edges (A->B) and (B->C) in
/// the same segment whose (A->C) also appears in the pre-reduction edge
/// set, emits one connector-neutral rule. Idempotent by `name`.
pub fn derive_rules(edges: &[EdgeRecord], edges_pre_tr: &[EdgeRecord]) -> Vec<SuppressionRule> {
    let mut rules = Vec::new();
    for ab in edges {
        for bc in edges {
            if bc.segment != ab.segment || bc.src != ab.dst {
                continue;
            }
            let has_ac = edges_pre_tr
                .iter()
                .any(|e| e.segment == ab.segment && e.src == ab.src && e.dst == bc.dst);
            if !has_ac {
                continue;
            }
            let name = SuppressionRule::idempotent_name(&ab.segment, &ab.src, &ab.dst, &bc.dst);
            if rules.iter().any(|r: &SuppressionRule| r.name == name) {
                continue;
            }
            rules.push(SuppressionRule {
                name,
                segment: ab.segment.clone(),
                via: ab.dst.clone(),
                src: ab.src.clone(),
                dst: bc.dst.clone(),
            });
        }
    }
    rules
}
