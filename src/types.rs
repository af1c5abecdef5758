//! Core data model: metrics, events, alerts, decisions, suppressions,
//! late-replays, and audit entries.
//!
//! Field shapes follow the wire schema fragments in the design doc exactly
//! so that `serde_json::to_value` round-trips byte-for-byte with the
//! documented JSON.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// An event is an immutable mapping from metric name to a numeric value,
/// or absent (missing). Event order within a `LearningBatch` defines the
/// bit position in the per-metric bitsets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Event {
    pub values: BTreeMap<String, f64>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, metric: impl Into<String>, value: f64) -> Self {
        self.values.insert(metric.into(), value);
        self
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.values.get(metric).copied()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn is_high_or_critical(&self) -> bool {
        matches!(self, Severity::High | Severity::Critical)
    }

    /// Base confidence weight used by the decision engine's suppression
    /// confidence formula: {info: 1.0, low: 1.0, medium: 0.7, high: 0.3,
    /// critical: 0.1} -- higher severity means the engine should be less
    /// confident about suppressing.
    pub fn suppression_base_weight(&self) -> f64 {
        match self {
            Severity::Critical => 0.1,
            Severity::High => 0.3,
            Severity::Medium => 0.7,
            Severity::Low => 1.0,
            Severity::Info => 1.0,
        }
    }

    /// Severity signal used by the false-suppression validator: {critical:
    /// 0.9, high: 0.7, medium: 0.3, low: 0.1, info: 0.0}.
    pub fn false_suppression_signal(&self) -> f64 {
        match self {
            Severity::Critical => 0.9,
            Severity::High => 0.7,
            Severity::Medium => 0.3,
            Severity::Low => 0.1,
            Severity::Info => 0.0,
        }
    }
}

/// An inbound alert. Immutable once constructed; `id` is deterministic
/// when not supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub ts: chrono::DateTime<chrono::Utc>,
    pub entity_id: String,
    pub rule_id: String,
    pub severity: Severity,
    pub signature: Option<String>,
    pub attrs: Option<serde_json::Value>,
}

impl Alert {
    pub fn new(
        entity_id: impl Into<String>,
        rule_id: impl Into<String>,
        ts: chrono::DateTime<chrono::Utc>,
        severity: Severity,
    ) -> Self {
        let entity_id = entity_id.into();
        let rule_id = rule_id.into();
        let id = deterministic_alert_id(&entity_id, &rule_id, ts);
        Self {
            id,
            ts,
            entity_id,
            rule_id,
            severity,
            signature: None,
            attrs: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// `hash(entity_id|rule_id|ts)`, hex-encoded and truncated to 32 hex chars.
pub fn deterministic_alert_id(
    entity_id: &str,
    rule_id: &str,
    ts: chrono::DateTime<chrono::Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entity_id.as_bytes());
    hasher.update(b"|");
    hasher.update(rule_id.as_bytes());
    hasher.update(b"|");
    hasher.update(ts.to_rfc3339().as_bytes());
    let digest = hasher.finalize();
    hex::encode(digest)[..32].to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Deliver,
    Suppress,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Deliver => "deliver",
            Decision::Suppress => "suppress",
        }
    }
}

/// One decision record per alert, append-once by `alert_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub alert_id: String,
    pub decision: Decision,
    pub confidence: f64,
    pub reason: serde_json::Value,
    pub policy_version: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionStatus {
    Pending,
    Late,
    Expired,
    Validated,
}

impl SuppressionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressionStatus::Pending => "pending",
            SuppressionStatus::Late => "late",
            SuppressionStatus::Expired => "expired",
            SuppressionStatus::Validated => "validated",
        }
    }
}

/// Lifecycle record created when a decision suppresses an alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suppression {
    pub alert_id: String,
    pub edge_id: Option<String>,
    pub false_suppression_score: f64,
    pub validation_method: String,
    pub status: SuppressionStatus,
    pub inserted_ts: chrono::DateTime<chrono::Utc>,
    pub meta: serde_json::Value,
}

/// Append-once-per-alert record of a suppressed alert being surfaced late.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LateReplay {
    pub alert_id: String,
    pub original_ts: chrono::DateTime<chrono::Utc>,
    pub late_ts: chrono::DateTime<chrono::Utc>,
    pub reason: String,
    pub confidence: f64,
    pub delivered: bool,
}

/// One entry in the false-suppression validator's log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationLog {
    pub alert_id: String,
    pub method: String,
    pub score: f64,
    pub details: serde_json::Value,
    pub validation_ts: chrono::DateTime<chrono::Utc>,
}
