/// DDL to create the schema_version tracking table.
///
/// Applied unconditionally on every open before the version check; `IF NOT
/// EXISTS` makes it safe to run repeatedly.
pub const SCHEMA_VERSION_DDL: &str = "
    CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER NOT NULL
    ) STRICT;
";

/// DDL for the v1 draft schema.
///
/// - `staged_feedback`: one row per pending feedback entry, keyed by the draft
///   key of the work being graded and the entry's local feedback id. The entry
///   itself is stored as its JSON wire form.
/// - `preferences`: small key/value settings such as the selected classroom.
pub const SCHEMA_V1_SQL: &str = "
    CREATE TABLE IF NOT EXISTS staged_feedback (
        draft_key   TEXT    NOT NULL,
        local_id    INTEGER NOT NULL,
        payload     TEXT    NOT NULL,
        updated_at  INTEGER NOT NULL,
        PRIMARY KEY (draft_key, local_id)
    ) STRICT;

    CREATE TABLE IF NOT EXISTS preferences (
        key         TEXT    PRIMARY KEY,
        value       TEXT    NOT NULL
    ) STRICT;
";

/// Forward-only migration to the latest schema version. Idempotent.
///
/// # Errors
///
/// Returns `rusqlite::Error` if the DDL fails or the version row cannot be read.
pub fn migrate(db: &mut rusqlite::Connection) -> rusqlite::Result<()> {
    db.execute_batch(SCHEMA_VERSION_DDL)?;

    let version: i64 = db
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if version < 1 {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        tx.execute_batch(SCHEMA_V1_SQL)?;
        tx.execute("INSERT INTO schema_version (version) VALUES (1)", [])?;
        tx.commit()?;
    }

    Ok(())
}
