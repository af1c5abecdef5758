//! Collaborator interfaces (spec §6): traits this crate defines and a
//! caller implements to wire in a real event feed, alert delivery path,
//! or SIEM connector. The core never depends on a concrete connector;
//! `writeback` CLI dry-runs exercise [`SIEMConnector`] against a
//! connector-neutral stub, the same way rule derivation ([`crate::rules`])
//! stays connector-neutral rather than emitting vendor query syntax.

use crate::error::Result;
use crate::rules::SuppressionRule;
use crate::types::{Alert, Event};
use async_trait::async_trait;

/// Produces a finite, ordered stream of events for one learning batch.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_batch(&self) -> Result<Vec<Event>>;
}

/// Receives delivered alerts and late-replayed alerts, in delivery order
/// per `alert_id` (spec §5's ordering guarantee).
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn deliver(&self, alert: &Alert) -> Result<()>;
}

/// Outcome of a connector writeback call.
#[derive(Debug, Clone, PartialEq)]
pub struct WritebackStatus {
    pub status: String,
    pub written: usize,
}

/// `ingest(query) -> iterator<event>`, `writeback(rules) -> {status,
/// written}`. Both may fail transiently; callers retry per spec §5's
/// per-attempt timeout and bounded backoff (default 3 attempts, 30s each).
#[async_trait]
pub trait SIEMConnector: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ingest(&self, query: &str) -> Result<Vec<Event>>;
    async fn writeback(&self, rules: &[SuppressionRule], apply: bool) -> Result<WritebackStatus>;
}

/// A no-op connector used by the `writeback` CLI when no vendor-specific
/// connector is wired in: `ingest` returns no events, `writeback` reports
/// what it would have written without calling out anywhere. Vendor query
/// translation is explicitly out of scope (spec §4.11a).
pub struct NeutralConnector {
    pub label: &'static str,
}

#[async_trait]
impl SIEMConnector for NeutralConnector {
    fn name(&self) -> &'static str {
        self.label
    }

    async fn ingest(&self, _query: &str) -> Result<Vec<Event>> {
        Ok(Vec::new())
    }

    async fn writeback(&self, rules: &[SuppressionRule], apply: bool) -> Result<WritebackStatus> {
        Ok(WritebackStatus {
            status: if apply { "applied".to_string() } else { "dry_run".to_string() },
            written: if apply { rules.len() } else { 0 },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn neutral_connector_dry_run_writes_nothing() {
        let connector = NeutralConnector { label: "splunk" };
        let rules = vec![SuppressionRule {
            name: "suppress::_all::A->B->C".into(),
            segment: "_all".into(),
            via: "B".into(),
            src: "A".into(),
            dst: "C".into(),
        }];
        let status = connector.writeback(&rules, false).await.unwrap();
        assert_eq!(status.status, "dry_run");
        assert_eq!(status.written, 0);
    }

    #[tokio::test]
    async fn neutral_connector_apply_reports_full_count() {
        let connector = NeutralConnector { label: "sentinel" };
        let rules = vec![SuppressionRule {
            name: "suppress::_all::A->B->C".into(),
            segment: "_all".into(),
            via: "B".into(),
            src: "A".into(),
            dst: "C".into(),
        }];
        let status = connector.writeback(&rules, true).await.unwrap();
        assert_eq!(status.status, "applied");
        assert_eq!(status.written, 1);
    }
}
