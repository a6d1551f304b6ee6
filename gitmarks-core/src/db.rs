//! Local draft store.
//!
//! Staged feedback survives a restart: each work being graded has a draft key
//! and its pending entries are mirrored into SQLite whenever they change. The
//! server stays the only source of truth for submitted feedback.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::error::DraftError;
use crate::types::{Feedback, FeedbackMap};

/// Preference key holding the last selected classroom id.
pub const SELECTED_CLASSROOM: &str = "selected_classroom";

/// Opens (or creates) the draft database at `path`, configures WAL mode and
/// applies schema migrations.
///
/// # Errors
///
/// Returns [`DraftError`] if the file cannot be opened or the DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, DraftError> {
    let conn = Connection::open(path).await?;

    conn.call(|db| -> rusqlite::Result<()> {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        crate::schema::migrate(db)?;
        Ok(())
    })
    .await?;

    tracing::debug!(path, "draft store opened");
    Ok(conn)
}

/// Draft key for one piece of student work, e.g. `staged_feedback_12_345`.
pub fn draft_key(assignment_id: i64, work_id: i64) -> String {
    format!("staged_feedback_{assignment_id}_{work_id}")
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Loads the staged feedback map stored under `key`. Missing keys yield an
/// empty map.
///
/// # Errors
///
/// Returns [`DraftError`] if the query fails or a row holds invalid JSON.
pub async fn load_staged_feedback(conn: &Connection, key: &str) -> Result<FeedbackMap, DraftError> {
    let key = key.to_owned();
    let rows: Vec<(i64, String)> = conn
        .call(move |db| -> rusqlite::Result<Vec<(i64, String)>> {
            let mut stmt = db.prepare(
                "SELECT local_id, payload FROM staged_feedback
                 WHERE draft_key = ?1 ORDER BY local_id",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![&key], |r| Ok((r.get(0)?, r.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
        .await?;

    let mut map = FeedbackMap::new();
    for (id, payload) in rows {
        let fb: Feedback = serde_json::from_str(&payload)?;
        map.insert(id as u64, fb);
    }
    Ok(map)
}

/// Replaces everything stored under `key` with `staged`. An empty map clears
/// the key.
///
/// # Errors
///
/// Returns [`DraftError`] if serialization or the write transaction fails.
pub async fn save_staged_feedback(
    conn: &Connection,
    key: &str,
    staged: &FeedbackMap,
) -> Result<(), DraftError> {
    let key = key.to_owned();
    let rows = staged
        .iter()
        .map(|(id, fb)| Ok((*id as i64, serde_json::to_string(fb)?)))
        .collect::<Result<Vec<(i64, String)>, serde_json::Error>>()?;

    conn.call(move |db| -> rusqlite::Result<()> {
        let now = now_secs();
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM staged_feedback WHERE draft_key = ?1",
            rusqlite::params![&key],
        )?;
        for (id, payload) in &rows {
            tx.execute(
                "INSERT INTO staged_feedback (draft_key, local_id, payload, updated_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![&key, id, payload, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    })
    .await?;
    Ok(())
}

/// Reads a preference value.
///
/// # Errors
///
/// Returns [`DraftError`] if the query fails.
pub async fn get_preference(conn: &Connection, key: &str) -> Result<Option<String>, DraftError> {
    let key = key.to_owned();
    let value = conn
        .call(move |db| -> rusqlite::Result<Option<String>> {
            db.query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                rusqlite::params![&key],
                |r| r.get(0),
            )
            .optional()
        })
        .await?;
    Ok(value)
}

/// Upserts a preference value.
///
/// # Errors
///
/// Returns [`DraftError`] if the write fails.
pub async fn set_preference(conn: &Connection, key: &str, value: &str) -> Result<(), DraftError> {
    let key = key.to_owned();
    let value = value.to_owned();
    conn.call(move |db| -> rusqlite::Result<()> {
        db.execute(
            "INSERT INTO preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            rusqlite::params![&key, &value],
        )?;
        Ok(())
    })
    .await?;
    Ok(())
}
