//! C10: Hash-chained audit log — tamper-evident, append-only, backed by
//! the `audit_log` SQLite table (§6.2's storage-shape decision).
//!
//! `hash = SHA256(canonical_json({ts, actor, action, diff}))` where
//! `diff` carries `_prev` = the previous entry's hash before hashing; the
//! first entry omits `_prev`. `verify_chain` re-hashes every entry in
//! insertion order and fails on the first mismatch or broken link.

use crate::error::{BolcdError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub ts: chrono::DateTime<chrono::Utc>,
    pub actor: String,
    pub action: String,
    pub diff: serde_json::Value,
    pub hash: String,
}

/// Canonical JSON for hashing: keys in a fixed order, independent of
/// `serde_json`'s default map ordering (which is insertion order for
/// `serde_json::Map`, preserved here by constructing the value with keys
/// in the documented order).
fn canonical_json(ts: chrono::DateTime<chrono::Utc>, actor: &str, action: &str, diff: &serde_json::Value) -> String {
    let value = serde_json::json!({
        "ts": ts.to_rfc3339(),
        "actor": actor,
        "action": action,
        "diff": diff,
    });
    serde_json::to_string(&value).expect("json serialization of owned values never fails")
}

fn compute_hash(ts: chrono::DateTime<chrono::Utc>, actor: &str, action: &str, diff: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_json(ts, actor, action, diff).as_bytes());
    hex::encode(hasher.finalize())
}

/// Appends one entry to the chain. Single-writer discipline (spec §5):
/// callers serialize writes through one `AuditLog` handle / a mutex at a
/// higher layer; this function itself performs the fetch-last+insert as
/// one logical step assuming no concurrent writer.
pub async fn append(
    pool: &SqlitePool,
    ts: chrono::DateTime<chrono::Utc>,
    actor: &str,
    action: &str,
    mut diff: serde_json::Value,
) -> Result<AuditEntry> {
    let prev_hash = last_hash(pool).await?;
    if let Some(prev) = &prev_hash {
        diff_set_prev(&mut diff, prev);
    }

    let hash = compute_hash(ts, actor, action, &diff);

    let result = sqlx::query(
        "INSERT INTO audit_log (ts, actor, action, diff, hash) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(ts.to_rfc3339())
    .bind(actor)
    .bind(action)
    .bind(diff.to_string())
    .bind(&hash)
    .execute(pool)
    .await?;

    Ok(AuditEntry {
        id: result.last_insert_rowid(),
        ts,
        actor: actor.to_string(),
        action: action.to_string(),
        diff,
        hash,
    })
}

fn diff_set_prev(diff: &mut serde_json::Value, prev_hash: &str) {
    if !diff.is_object() {
        let original = diff.clone();
        *diff = serde_json::json!({ "_value": original });
    }
    diff.as_object_mut()
        .expect("just ensured diff is an object")
        .insert("_prev".to_string(), serde_json::Value::String(prev_hash.to_string()));
}

async fn last_hash(pool: &SqlitePool) -> Result<Option<String>> {
    let row = sqlx::query("SELECT hash FROM audit_log ORDER BY id DESC LIMIT 1")
        .fetch_optional(pool)
        .await?;
    Ok(match row {
        Some(row) => Some(row.try_get("hash")?),
        None => None,
    })
}

pub async fn tail(pool: &SqlitePool, limit: i64) -> Result<Vec<AuditEntry>> {
    let rows = sqlx::query(
        "SELECT id, ts, actor, action, diff, hash FROM audit_log ORDER BY id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    let mut entries: Vec<AuditEntry> = rows
        .into_iter()
        .map(row_to_entry)
        .collect::<Result<_>>()?;
    entries.reverse();
    Ok(entries)
}

fn row_to_entry(row: sqlx::sqlite::SqliteRow) -> Result<AuditEntry> {
    let ts_str: String = row.try_get("ts")?;
    let diff_str: String = row.try_get("diff")?;
    Ok(AuditEntry {
        id: row.try_get("id")?,
        ts: chrono::DateTime::parse_from_rfc3339(&ts_str)
            .map_err(|e| BolcdError::consistency(format!("bad ts in audit entry: {e}")))?
            .with_timezone(&chrono::Utc),
        actor: row.try_get("actor")?,
        action: row.try_get("action")?,
        diff: serde_json::from_str(&diff_str)?,
        hash: row.try_get("hash")?,
    })
}

/// Re-hashes every entry in insertion order; returns the count verified
/// or a `ConsistencyError` describing the first mismatch.
pub async fn verify_chain(pool: &SqlitePool, limit: Option<i64>) -> Result<u64> {
    let rows = sqlx::query("SELECT id, ts, actor, action, diff, hash FROM audit_log ORDER BY id ASC LIMIT ?")
        .bind(limit.unwrap_or(i64::MAX))
        .fetch_all(pool)
        .await?;

    let mut prev_hash: Option<String> = None;
    let mut count = 0u64;
    for row in rows {
        let entry = row_to_entry(row)?;
        let recomputed = compute_hash(entry.ts, &entry.actor, &entry.action, &entry.diff);
        if recomputed != entry.hash {
            return Err(BolcdError::consistency(format!(
                "hash mismatch at audit entry {}: stored {} != recomputed {}",
                entry.id, entry.hash, recomputed
            )));
        }
        let entry_prev = entry.diff.get("_prev").and_then(|v| v.as_str());
        match (&prev_hash, entry_prev) {
            (None, None) => {}
            (Some(expected), Some(actual)) if expected == actual => {}
            (expected, actual) => {
                return Err(BolcdError::consistency(format!(
                    "chain break at audit entry {}: expected _prev {:?}, found {:?}",
                    entry.id, expected, actual
                )));
            }
        }
        prev_hash = Some(entry.hash.clone());
        count += 1;
    }
    Ok(count)
}
