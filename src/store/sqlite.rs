//! SQLite-backed store for decision records, suppressions, late-replays,
//! the hash-chained audit log, and the reconciler lease row. Grounded on
//! the teacher's `db/config.rs` pool setup (WAL journal mode, busy
//! timeout) and `db/queue.rs`'s raw-SQL `CREATE TABLE IF NOT EXISTS`
//! style.

use crate::error::{BolcdError, Result};
use crate::types::{Decision, DecisionRecord, LateReplay, Suppression, SuppressionStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;

pub async fn init_pool(path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db_url = format!("sqlite:{}?mode=rwc", path.display());
    let options = SqliteConnectOptions::from_str(&db_url)
        .map_err(|e| BolcdError::resource(format!("invalid sqlite url: {e}")))?
        .create_if_missing(true)
        .synchronous(SqliteSynchronous::Normal)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    create_tables(&pool).await?;
    Ok(pool)
}

async fn create_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS decisions (
            alert_id TEXT PRIMARY KEY,
            decision TEXT NOT NULL,
            confidence REAL NOT NULL,
            reason TEXT NOT NULL,
            policy_version TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS suppressions (
            alert_id TEXT PRIMARY KEY,
            edge_id TEXT,
            false_suppression_score REAL NOT NULL,
            validation_method TEXT NOT NULL,
            status TEXT NOT NULL,
            inserted_ts TEXT NOT NULL,
            meta TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS late_replays (
            alert_id TEXT PRIMARY KEY,
            original_ts TEXT NOT NULL,
            late_ts TEXT NOT NULL,
            reason TEXT NOT NULL,
            confidence REAL NOT NULL,
            delivered INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            action TEXT NOT NULL,
            diff TEXT NOT NULL,
            hash TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS reconciler_lease (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            holder TEXT NOT NULL,
            expires_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_suppressions_status ON suppressions(status)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Inserts a decision record. Append-once by `alert_id`: if a record
/// already exists, returns the existing one unchanged (spec §4.7).
pub async fn insert_decision_once(pool: &SqlitePool, record: DecisionRecord) -> Result<DecisionRecord> {
    let decision_str = record.decision.as_str();
    let reason_str = record.reason.to_string();
    sqlx::query(
        "INSERT INTO decisions (alert_id, decision, confidence, reason, policy_version, created_at)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(alert_id) DO NOTHING",
    )
    .bind(&record.alert_id)
    .bind(decision_str)
    .bind(record.confidence)
    .bind(&reason_str)
    .bind(&record.policy_version)
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    fetch_decision(pool, &record.alert_id)
        .await?
        .ok_or_else(|| BolcdError::consistency("decision vanished after insert"))
}

pub async fn fetch_decision(pool: &SqlitePool, alert_id: &str) -> Result<Option<DecisionRecord>> {
    let row = sqlx::query("SELECT alert_id, decision, confidence, reason, policy_version, created_at FROM decisions WHERE alert_id = ?")
        .bind(alert_id)
        .fetch_optional(pool)
        .await?;
    let Some(row) = row else { return Ok(None) };
    let decision_str: String = row.try_get("decision")?;
    let reason_str: String = row.try_get("reason")?;
    let created_at_str: String = row.try_get("created_at")?;
    Ok(Some(DecisionRecord {
        alert_id: row.try_get("alert_id")?,
        decision: if decision_str == "suppress" {
            Decision::Suppress
        } else {
            Decision::Deliver
        },
        confidence: row.try_get("confidence")?,
        reason: serde_json::from_str(&reason_str)?,
        policy_version: row.try_get("policy_version")?,
        created_at: chrono::DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| BolcdError::consistency(format!("bad created_at: {e}")))?
            .with_timezone(&chrono::Utc),
    }))
}

pub async fn insert_suppression(pool: &SqlitePool, s: &Suppression) -> Result<()> {
    sqlx::query(
        "INSERT INTO suppressions (alert_id, edge_id, false_suppression_score, validation_method, status, inserted_ts, meta)
         VALUES (?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(alert_id) DO NOTHING",
    )
    .bind(&s.alert_id)
    .bind(&s.edge_id)
    .bind(s.false_suppression_score)
    .bind(&s.validation_method)
    .bind(s.status.as_str())
    .bind(s.inserted_ts.to_rfc3339())
    .bind(s.meta.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update_suppression_status(
    pool: &SqlitePool,
    alert_id: &str,
    status: SuppressionStatus,
) -> Result<()> {
    sqlx::query("UPDATE suppressions SET status = ? WHERE alert_id = ?")
        .bind(status.as_str())
        .bind(alert_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn fetch_pending_suppressions(pool: &SqlitePool) -> Result<Vec<Suppression>> {
    let rows = sqlx::query(
        "SELECT alert_id, edge_id, false_suppression_score, validation_method, status, inserted_ts, meta
         FROM suppressions WHERE status = 'pending'",
    )
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let status_str: String = row.try_get("status")?;
            let inserted_ts_str: String = row.try_get("inserted_ts")?;
            let meta_str: String = row.try_get("meta")?;
            Ok(Suppression {
                alert_id: row.try_get("alert_id")?,
                edge_id: row.try_get("edge_id")?,
                false_suppression_score: row.try_get("false_suppression_score")?,
                validation_method: row.try_get("validation_method")?,
                status: parse_status(&status_str)?,
                inserted_ts: chrono::DateTime::parse_from_rfc3339(&inserted_ts_str)
                    .map_err(|e| BolcdError::consistency(format!("bad inserted_ts: {e}")))?
                    .with_timezone(&chrono::Utc),
                meta: serde_json::from_str(&meta_str)?,
            })
        })
        .collect()
}

fn parse_status(s: &str) -> Result<SuppressionStatus> {
    Ok(match s {
        "pending" => SuppressionStatus::Pending,
        "late" => SuppressionStatus::Late,
        "expired" => SuppressionStatus::Expired,
        "validated" => SuppressionStatus::Validated,
        other => return Err(BolcdError::consistency(format!("unknown suppression status: {other}"))),
    })
}

pub async fn insert_late_replay_once(pool: &SqlitePool, lr: &LateReplay) -> Result<()> {
    sqlx::query(
        "INSERT INTO late_replays (alert_id, original_ts, late_ts, reason, confidence, delivered)
         VALUES (?, ?, ?, ?, ?, ?)
         ON CONFLICT(alert_id) DO NOTHING",
    )
    .bind(&lr.alert_id)
    .bind(lr.original_ts.to_rfc3339())
    .bind(lr.late_ts.to_rfc3339())
    .bind(&lr.reason)
    .bind(lr.confidence)
    .bind(lr.delivered)
    .execute(pool)
    .await?;
    Ok(())
}

/// Acquires the singleton reconciler lease if unheld or expired (spec §5:
/// lease timeout 10s). Returns true if this caller now holds it.
pub async fn try_acquire_lease(
    pool: &SqlitePool,
    holder: &str,
    now: chrono::DateTime<chrono::Utc>,
    ttl: chrono::Duration,
) -> Result<bool> {
    let expires_at = (now + ttl).to_rfc3339();
    let result = sqlx::query(
        "INSERT INTO reconciler_lease (id, holder, expires_at) VALUES (1, ?, ?)
         ON CONFLICT(id) DO UPDATE SET holder = excluded.holder, expires_at = excluded.expires_at
         WHERE reconciler_lease.expires_at < ?",
    )
    .bind(holder)
    .bind(&expires_at)
    .bind(now.to_rfc3339())
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    let row = sqlx::query("SELECT holder FROM reconciler_lease WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    match row {
        None => Ok(false),
        Some(row) => {
            let current_holder: String = row.try_get("holder")?;
            Ok(current_holder == holder)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Decision;
    use chrono::Utc;

    async fn test_pool() -> SqlitePool {
        // Leak the NamedTempFile so the backing file survives for the
        // pool's lifetime; dropping it here would unlink the path out
        // from under any connection the pool opens later.
        let tmp = Box::leak(Box::new(tempfile::NamedTempFile::new().unwrap()));
        init_pool(tmp.path()).await.unwrap()
    }

    #[tokio::test]
    async fn decision_insert_is_append_once() {
        let pool = test_pool().await;
        let record = DecisionRecord {
            alert_id: "a1".into(),
            decision: Decision::Suppress,
            confidence: 0.5,
            reason: serde_json::json!({"why": "edge_match"}),
            policy_version: "v1".into(),
            created_at: Utc::now(),
        };
        let first = insert_decision_once(&pool, record.clone()).await.unwrap();
        let mut second_attempt = record.clone();
        second_attempt.confidence = 0.9;
        let second = insert_decision_once(&pool, second_attempt).await.unwrap();
        assert_eq!(first.confidence, second.confidence);
        assert_eq!(second.confidence, 0.5);
    }

    #[tokio::test]
    async fn lease_is_exclusive_until_expiry() {
        let pool = test_pool().await;
        let now = Utc::now();
        let ttl = chrono::Duration::seconds(10);
        assert!(try_acquire_lease(&pool, "worker-a", now, ttl).await.unwrap());
        assert!(!try_acquire_lease(&pool, "worker-b", now, ttl).await.unwrap());
        let later = now + chrono::Duration::seconds(11);
        assert!(try_acquire_lease(&pool, "worker-b", later, ttl).await.unwrap());
    }

    #[tokio::test]
    async fn suppression_round_trips() {
        let pool = test_pool().await;
        let s = Suppression {
            alert_id: "a1".into(),
            edge_id: Some("R1->R2".into()),
            false_suppression_score: 0.1,
            validation_method: "combined".into(),
            status: SuppressionStatus::Pending,
            inserted_ts: Utc::now(),
            meta: serde_json::json!({}),
        };
        insert_suppression(&pool, &s).await.unwrap();
        let pending = fetch_pending_suppressions(&pool).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].alert_id, "a1");

        update_suppression_status(&pool, "a1", SuppressionStatus::Late)
            .await
            .unwrap();
        let pending_after = fetch_pending_suppressions(&pool).await.unwrap();
        assert!(pending_after.is_empty());
    }
}

