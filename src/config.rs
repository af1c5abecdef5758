//! Policy & configuration loading (C12).
//!
//! Thresholds, segmentation, and the decision policy are loaded once at
//! startup and optionally reloaded; the `Policy` struct is passed
//! explicitly to every component rather than read from global state, so
//! that the process-wide mutable surface stays limited to the graph
//! snapshot (atomic swap) and the audit writer handle.

use crate::error::{BolcdError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-metric threshold plus the shared margin used by the binarizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thresholds {
    pub margin_delta: f64,
    pub thresholds: HashMap<String, f64>,
}

impl Thresholds {
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BolcdError::resource(format!("reading thresholds {path:?}: {e}")))?;
        serde_json::from_str(&text).map_err(BolcdError::from)
    }
}

/// Segmentation configuration: a key tuple to bucket events/alerts by, with
/// an optional allow-list of values per key. Values outside the allow-list
/// fold into `_other`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentConfig {
    pub keys: Vec<String>,
    #[serde(default)]
    pub allowlist: HashMap<String, Vec<String>>,
}

impl SegmentConfig {
    pub fn load_json(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BolcdError::resource(format!("reading segments {path:?}: {e}")))?;
        serde_json::from_str(&text).map_err(BolcdError::from)
    }
}

/// Decision policy: significance level, support/lift floors, near-window,
/// TTL, false-suppression thresholds, and the safety-guard allowlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionPolicy {
    pub alpha: f64,
    pub support_min: u64,
    pub lift_min: f64,
    pub near_window_sec: i64,
    pub root_pass: bool,
    pub allowlist_rules: Vec<String>,
    pub policy_version: String,
    pub false_suppression_threshold: f64,
    pub high_severity_protection: bool,
    pub late_ttl_sec: i64,
    pub late_false_threshold: f64,
    pub drift_threshold: f64,
    pub fdr_q: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self {
            alpha: 0.01,
            support_min: 20,
            lift_min: 1.5,
            near_window_sec: 3600,
            root_pass: true,
            allowlist_rules: Vec::new(),
            policy_version: "safe-1.0.0".to_string(),
            false_suppression_threshold: 0.5,
            high_severity_protection: true,
            late_ttl_sec: 86_400,
            late_false_threshold: 0.6,
            drift_threshold: 0.5,
            fdr_q: 0.01,
        }
    }
}

/// Case-insensitive substring patterns that always force delivery,
/// regardless of severity or edge strength.
pub const CRITICAL_SIGNATURES: &[&str] = &[
    "privilege_escalation",
    "data_exfiltration",
    "malware",
    "ransomware",
    "sql_injection",
    "command_injection",
    "unauthorized_access",
    "backdoor",
    "rootkit",
];

impl DecisionPolicy {
    /// Load from environment, following the teacher's `DatabaseConfig::from_env`
    /// pattern: env var -> parse -> validated fallback to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let env_f64 = |key: &str, default: f64| -> f64 {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &f64| v.is_finite())
                .unwrap_or(default)
        };
        let env_u64 = |key: &str, default: u64| -> u64 {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let env_i64 = |key: &str, default: i64| -> i64 {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        };
        let env_bool = |key: &str, default: bool| -> bool {
            std::env::var(key)
                .ok()
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "on"))
                .unwrap_or(default)
        };

        Self {
            alpha: env_f64("BOLCD_POLICY_ALPHA", defaults.alpha),
            support_min: env_u64("BOLCD_POLICY_SUPPORT_MIN", defaults.support_min),
            lift_min: env_f64("BOLCD_POLICY_LIFT_MIN", defaults.lift_min),
            near_window_sec: env_i64("BOLCD_NEAR_WINDOW_SEC", defaults.near_window_sec),
            root_pass: env_bool("BOLCD_ROOT_PASS", defaults.root_pass),
            allowlist_rules: std::env::var("BOLCD_ALLOWLIST_RULES")
                .ok()
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            policy_version: std::env::var("BOLCD_POLICY_VERSION")
                .unwrap_or(defaults.policy_version),
            false_suppression_threshold: env_f64(
                "BOLCD_FALSE_SUPPRESSION_THRESHOLD",
                defaults.false_suppression_threshold,
            ),
            high_severity_protection: env_bool(
                "BOLCD_HIGH_SEVERITY_PROTECTION",
                defaults.high_severity_protection,
            ),
            late_ttl_sec: env_i64("BOLCD_LATE_TTL_SEC", defaults.late_ttl_sec),
            late_false_threshold: env_f64(
                "BOLCD_LATE_FALSE_THRESHOLD",
                defaults.late_false_threshold,
            ),
            drift_threshold: env_f64("BOLCD_DRIFT_THRESHOLD", defaults.drift_threshold),
            fdr_q: defaults.fdr_q,
        }
    }
}

/// Top-level configuration bundle loaded at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub thresholds: Option<Thresholds>,
    pub segments: SegmentConfig,
    pub policy: DecisionPolicy,
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self {
            thresholds: None,
            segments: SegmentConfig::default(),
            policy: DecisionPolicy::from_env(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    std::env::var("BOLCD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("bolcd")
        })
}
