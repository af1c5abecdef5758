//! C8: False-suppression validator — a weighted combination of severity,
//! correlation, and rarity signals in `[0, 1]`, logged on every
//! evaluation.

use crate::clock::Clock;
use crate::types::{Alert, ValidationLog};
use chrono::Duration;

/// Weights for {severity, correlation, rarity}, spec default `{0.4, 0.3, 0.3}`.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorWeights {
    pub severity: f64,
    pub correlation: f64,
    pub rarity: f64,
}

impl Default for ValidatorWeights {
    fn default() -> Self {
        Self {
            severity: 0.4,
            correlation: 0.3,
            rarity: 0.3,
        }
    }
}

/// Computes the false-suppression score for `alert` given recent sibling
/// alerts from the same entity (`recent_same_entity`, any severity, used
/// for the correlation signal) and prior alerts matching
/// `(entity_id, rule_id)` in the last 7 days (`prior_same_rule`, used for
/// the rarity signal). Returns the score and the `ValidationLog` entry to
/// persist.
pub fn validate(
    alert: &Alert,
    recent_same_entity: &[&Alert],
    prior_same_rule: &[&Alert],
    weights: ValidatorWeights,
    clock: &dyn Clock,
) -> (f64, ValidationLog) {
    let severity_signal = alert.severity.false_suppression_signal();

    let window = Duration::hours(1);
    let correlation_count = recent_same_entity
        .iter()
        .filter(|a| a.severity.is_high_or_critical())
        .filter(|a| {
            let delta = a.ts - alert.ts;
            delta >= -window && delta <= window
        })
        .count();
    let correlation_signal = (correlation_count as f64 * 0.2).min(1.0);

    let k = prior_same_rule.len() as f64;
    let rarity_signal = 1.0 / (1.0 + k);

    let score = (weights.severity * severity_signal
        + weights.correlation * correlation_signal
        + weights.rarity * rarity_signal)
        .clamp(0.0, 1.0);

    let log = ValidationLog {
        alert_id: alert.id.clone(),
        method: "combined".to_string(),
        score,
        details: serde_json::json!({
            "severity_signal": severity_signal,
            "correlation_signal": correlation_signal,
            "rarity_signal": rarity_signal,
            "correlation_count": correlation_count,
            "prior_same_rule_count": prior_same_rule.len(),
        }),
        validation_ts: clock.now(),
    };

    (score, log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::types::Severity;
    use chrono::Utc;

    fn alert(severity: Severity, ts: chrono::DateTime<Utc>) -> Alert {
        Alert::new("host-1", "R1", ts, severity)
    }

    #[test]
    fn critical_alert_with_no_history_scores_from_severity_alone() {
        let now = Utc::now();
        let a = alert(Severity::Critical, now);
        let (score, log) = validate(&a, &[], &[], ValidatorWeights::default(), &SystemClock);
        assert!((score - 0.4 * 0.9 - 0.3 * 0.0 - 0.3 * 1.0).abs() < 1e-9);
        assert_eq!(log.method, "combined");
    }

    #[test]
    fn correlation_signal_caps_at_one() {
        let now = Utc::now();
        let a = alert(Severity::Low, now);
        let siblings: Vec<Alert> = (0..10)
            .map(|i| Alert::new("host-1", "R2", now + Duration::minutes(i), Severity::Critical))
            .collect();
        let refs: Vec<&Alert> = siblings.iter().collect();
        let (score, _) = validate(&a, &refs, &[], ValidatorWeights::default(), &SystemClock);
        assert!(score <= 0.4 * 0.1 + 0.3 * 1.0 + 0.3 * 1.0 + 1e-9);
    }

    #[test]
    fn rarity_signal_decreases_with_more_priors() {
        let now = Utc::now();
        let a = alert(Severity::Medium, now);
        let priors: Vec<Alert> = (0..5).map(|_| alert(Severity::Medium, now)).collect();
        let refs: Vec<&Alert> = priors.iter().collect();
        let (score_many, _) = validate(&a, &[], &refs, ValidatorWeights::default(), &SystemClock);
        let (score_none, _) = validate(&a, &[], &[], ValidatorWeights::default(), &SystemClock);
        assert!(score_many < score_none);
    }
}
