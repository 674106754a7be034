//! SQL schemas for the two Laurel SQLite stores.
//!
//! Each is executed once at connection startup. Future migrations will be
//! gated on `PRAGMA user_version`.

use crate::Result;

/// Content store DDL. Descriptive fields live in a JSON `document` column so
/// category payloads can evolve without migrations.
pub const CONTENT_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS achievements (
    content_id  TEXT PRIMARY KEY,
    owner_id    TEXT NOT NULL,
    category    TEXT NOT NULL,             -- discriminant of CategoryDetails
    document    TEXT NOT NULL,             -- JSON: title, description, details, tags, points
    attachments TEXT NOT NULL DEFAULT '[]',-- JSON array, appended to in place
    is_deleted  INTEGER NOT NULL DEFAULT 0,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS achievements_owner_idx ON achievements(owner_id);

PRAGMA user_version = 1;
";

/// Reference store DDL.
pub const REFERENCE_SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS achievement_references (
    reference_id   TEXT PRIMARY KEY,
    owner_id       TEXT NOT NULL,
    content_id     TEXT NOT NULL UNIQUE,
    status         TEXT NOT NULL
                   CHECK (status IN ('draft', 'submitted', 'verified', 'rejected')),
    submitted_at   TEXT,
    verified_at    TEXT,
    verified_by    TEXT,
    rejection_note TEXT,
    created_at     TEXT NOT NULL,
    updated_at     TEXT NOT NULL,
    CHECK (status != 'rejected' OR (rejection_note IS NOT NULL AND rejection_note != ''))
);

-- Audit trail. Rows are never updated; they go away only with their reference.
CREATE TABLE IF NOT EXISTS achievement_history (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    history_id      TEXT NOT NULL UNIQUE,
    reference_id    TEXT NOT NULL
                    REFERENCES achievement_references(reference_id) ON DELETE CASCADE,
    previous_status TEXT,
    new_status      TEXT NOT NULL,
    changed_by      TEXT NOT NULL,
    note            TEXT,
    created_at      TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS achievement_history_immutable
BEFORE UPDATE ON achievement_history
BEGIN
    SELECT RAISE(ABORT, 'achievement history is append-only');
END;

CREATE INDEX IF NOT EXISTS references_owner_idx  ON achievement_references(owner_id);
CREATE INDEX IF NOT EXISTS references_status_idx ON achievement_references(status);
CREATE INDEX IF NOT EXISTS history_reference_idx ON achievement_history(reference_id);

PRAGMA user_version = 1;
";

/// Run `ddl` against `conn`.
pub async fn init(conn: &tokio_rusqlite::Connection, ddl: &'static str) -> Result<()> {
  conn
    .call(move |conn| {
      conn.execute_batch(ddl)?;
      Ok(())
    })
    .await?;
  Ok(())
}
