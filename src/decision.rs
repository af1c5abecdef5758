//! C7: Decision engine — per-alert suppress/deliver decision against the
//! current graph snapshot, with safety guards, root pass, edge matching,
//! and false-suppression validation (spec §4.7's five-step procedure).

use crate::clock::Clock;
use crate::config::{DecisionPolicy, CRITICAL_SIGNATURES};
use crate::graph::{EdgeRecord, Graph};
use crate::types::{Alert, Decision, DecisionRecord};
use crate::validator::{validate, ValidatorWeights};
use chrono::Duration;

/// A strong edge: accepted AND passing the decision policy's
/// significance/support/lift floor (spec §4.7 step 3).
fn is_strong_edge(edge: &EdgeRecord, policy: &DecisionPolicy) -> bool {
    let q_ok = edge.q_value.map(|q| q <= policy.alpha).unwrap_or(
        edge.ci95_upper.map(|ci| ci <= policy.alpha).unwrap_or(false),
    );
    q_ok && edge.n_src1 >= policy.support_min && edge.lift >= policy.lift_min
}

/// Finds the best recent alert (per spec's open-question tie-break:
/// largest `(1/q_value) * support`) whose rule implies `alert.rule_id` via
/// a strong edge within the near-window.
fn find_edge_match<'a>(
    alert: &Alert,
    recent: &[&'a Alert],
    graph: &Graph,
    policy: &DecisionPolicy,
    segment: &str,
) -> Option<(&'a Alert, EdgeRecord)> {
    let window = Duration::seconds(policy.near_window_sec);
    let mut best: Option<(&Alert, EdgeRecord, f64)> = None;

    for r in recent {
        if r.entity_id != alert.entity_id {
            continue;
        }
        let delta = alert.ts - r.ts;
        if delta < Duration::zero() || delta > window {
            continue;
        }
        let Some(edge) = graph.find_edge(&r.rule_id, &alert.rule_id, segment) else {
            continue;
        };
        if !is_strong_edge(edge, policy) {
            continue;
        }
        let q = edge.q_value.or(edge.ci95_upper).unwrap_or(1.0).max(1e-12);
        let tie_break = (1.0 / q) * edge.n_src1 as f64;
        if best.as_ref().map(|(_, _, b)| tie_break > *b).unwrap_or(true) {
            best = Some((r, edge.clone(), tie_break));
        }
    }

    best.map(|(r, e, _)| (r, e))
}

fn matches_critical_signature(alert: &Alert) -> bool {
    let Some(sig) = &alert.signature else {
        return false;
    };
    let sig_lower = sig.to_lowercase();
    CRITICAL_SIGNATURES
        .iter()
        .any(|pattern| sig_lower.contains(pattern))
}

/// Runs the five-step decision procedure for one alert. `recent` is the
/// index of recent alerts for the same entity within the near-window;
/// `prior_same_rule` feeds the validator's rarity signal. `segment` is
/// the segment label the alert falls into.
pub fn decide(
    alert: &Alert,
    graph: Option<&Graph>,
    recent: &[&Alert],
    prior_same_rule: &[&Alert],
    policy: &DecisionPolicy,
    segment: &str,
    clock: &dyn Clock,
) -> DecisionRecord {
    let now = clock.now();

    // Step 1: safety guards.
    if policy.high_severity_protection && alert.severity.is_high_or_critical() {
        return deliver(alert, "high_severity_protection", now, policy);
    }
    if policy
        .allowlist_rules
        .iter()
        .any(|r| r == &alert.rule_id)
    {
        return deliver(alert, "allowlist", now, policy);
    }
    if matches_critical_signature(alert) {
        return deliver(alert, "critical_signature", now, policy);
    }

    let Some(graph) = graph else {
        return deliver(alert, "no_graph", now, policy);
    };

    // Step 2: root pass.
    if graph.incoming(&alert.rule_id, segment).is_empty() {
        return deliver(alert, "root_pass", now, policy);
    }

    // Step 3: edge match.
    let Some((_matched, edge)) = find_edge_match(alert, recent, graph, policy, segment) else {
        return deliver(alert, "no_edge", now, policy);
    };

    // Step 4: false-suppression validation.
    let (score, _log) = validate(alert, recent, prior_same_rule, ValidatorWeights::default(), clock);
    if score > policy.false_suppression_threshold {
        return deliver(alert, "false_suppression_risk", now, policy);
    }

    // Step 5: suppress, with confidence.
    let base = alert.severity.suppression_base_weight();
    let q = edge.q_value.or(edge.ci95_upper).unwrap_or(1.0);
    let edge_conf = ((1.0 - q)
        + (edge.n_src1 as f64 / (2.0 * policy.support_min as f64)).min(1.0)
        + (edge.lift / (2.0 * policy.lift_min)).min(1.0))
        / 3.0;
    let confidence = (base * edge_conf * (1.0 - score)).clamp(0.0, 1.0);

    DecisionRecord {
        alert_id: alert.id.clone(),
        decision: Decision::Suppress,
        confidence,
        reason: serde_json::json!({
            "why": "edge_match",
            "edge": {"src": edge.src, "dst": edge.dst, "q_value": edge.q_value, "ci95_upper": edge.ci95_upper},
            "false_suppression_score": score,
        }),
        policy_version: policy.policy_version.clone(),
        created_at: now,
    }
}

fn deliver(
    alert: &Alert,
    reason: &str,
    now: chrono::DateTime<chrono::Utc>,
    policy: &DecisionPolicy,
) -> DecisionRecord {
    DecisionRecord {
        alert_id: alert.id.clone(),
        decision: Decision::Deliver,
        confidence: 1.0,
        reason: serde_json::json!({ "why": reason }),
        policy_version: policy.policy_version.clone(),
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::graph::EdgeRecord;
    use crate::types::Severity;
    use chrono::Utc;

    fn strong_edge(src: &str, dst: &str) -> EdgeRecord {
        EdgeRecord {
            src: src.into(),
            dst: dst.into(),
            n_src1: 40,
            k_counterex: 0,
            ci95_upper: Some(0.001),
            q_value: Some(0.001),
            segment: "_all".into(),
            lift: 2.5,
        }
    }

    #[test]
    fn near_window_suppression_scenario() {
        let t0 = Utc::now();
        let policy = DecisionPolicy::default();
        let clock = FixedClock::new(t0);
        let graph = Graph::new(vec![strong_edge("R1", "R2")], vec![]);

        let a1 = Alert::new("h", "R1", t0, Severity::Medium);
        let dec1 = decide(&a1, Some(&graph), &[], &[], &policy, "_all", &clock);
        assert_eq!(dec1.decision, Decision::Deliver);
        assert_eq!(dec1.reason["why"], "root_pass");

        let a2 = Alert::new("h", "R2", t0 + Duration::seconds(30), Severity::Medium);
        let recent = vec![&a1];
        let dec2 = decide(&a2, Some(&graph), &recent, &[], &policy, "_all", &clock);
        assert_eq!(dec2.decision, Decision::Suppress);
        assert!(dec2.confidence > 0.0 && dec2.confidence <= 1.0);
    }

    #[test]
    fn safety_guard_overrides_suppression_for_high_severity() {
        let t0 = Utc::now();
        let policy = DecisionPolicy::default();
        let clock = FixedClock::new(t0);
        let graph = Graph::new(vec![strong_edge("R1", "R2")], vec![]);

        let a1 = Alert::new("h", "R1", t0, Severity::Medium);
        let a2 = Alert::new("h", "R2", t0 + Duration::seconds(30), Severity::High);
        let recent = vec![&a1];
        let dec2 = decide(&a2, Some(&graph), &recent, &[], &policy, "_all", &clock);
        assert_eq!(dec2.decision, Decision::Deliver);
        assert_eq!(dec2.reason["why"], "high_severity_protection");
    }

    #[test]
    fn no_graph_delivers_all() {
        let policy = DecisionPolicy::default();
        let clock = FixedClock::new(Utc::now());
        let a1 = Alert::new("h", "R1", Utc::now(), Severity::Low);
        let dec = decide(&a1, None, &[], &[], &policy, "_all", &clock);
        assert_eq!(dec.decision, Decision::Deliver);
        assert_eq!(dec.reason["why"], "no_graph");
    }

    #[test]
    fn critical_signature_always_delivers() {
        let policy = DecisionPolicy::default();
        let clock = FixedClock::new(Utc::now());
        let graph = Graph::new(vec![strong_edge("R1", "R2")], vec![]);
        let a = Alert::new("h", "R2", Utc::now(), Severity::Low).with_signature("sql_injection attempt");
        let dec = decide(&a, Some(&graph), &[], &[], &policy, "_all", &clock);
        assert_eq!(dec.decision, Decision::Deliver);
        assert_eq!(dec.reason["why"], "critical_signature");
    }
}
