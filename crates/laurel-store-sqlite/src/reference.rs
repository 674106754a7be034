//! [`SqliteReferenceStore`]: the SQLite implementation of [`ReferenceStore`].

use std::path::Path;

use laurel_core::{
  lifecycle::{
    AchievementReference, AchievementStatus, HistoryEntry, NewHistoryEntry, NewReference,
    StatusChange,
  },
  store::{ReferenceFilter, ReferenceStore},
};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    HISTORY_COLUMNS, REFERENCE_COLUMNS, RawHistory, RawReference, encode_dt, encode_status,
    encode_uuid, now,
  },
  schema::{self, REFERENCE_SCHEMA},
};

/// Workflow references and their audit trail, backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteReferenceStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteReferenceStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    schema::init(&conn, REFERENCE_SCHEMA).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    schema::init(&conn, REFERENCE_SCHEMA).await?;
    Ok(Self { conn })
  }

  /// Close the underlying connection, flushing pending work.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }
}

/// The `SET` assignments and extra bound values for one [`StatusChange`].
/// `?1` is the reference id, `?2` the target status, `?3` the timestamp.
fn change_assignments(change: &StatusChange) -> (&'static str, Vec<Value>) {
  match change {
    StatusChange::Submit => ("submitted_at = ?3", vec![]),
    StatusChange::RevertToDraft => ("submitted_at = NULL", vec![]),
    StatusChange::Verify { reviewer } => (
      "verified_at = ?3, verified_by = ?4, rejection_note = NULL",
      vec![Value::Text(encode_uuid(*reviewer))],
    ),
    StatusChange::Reject { reviewer, note } => (
      "verified_at = ?3, verified_by = ?4, rejection_note = ?5",
      vec![Value::Text(encode_uuid(*reviewer)), Value::Text(note.clone())],
    ),
  }
}

impl ReferenceStore for SqliteReferenceStore {
  type Error = crate::Error;

  async fn create_reference(&self, input: NewReference) -> Result<AchievementReference> {
    let created_at = now();
    let reference = AchievementReference {
      reference_id:   input.reference_id,
      owner_id:       input.owner_id,
      content_id:     input.content_id,
      status:         AchievementStatus::Draft,
      submitted_at:   None,
      verified_at:    None,
      verified_by:    None,
      rejection_note: None,
      created_at,
      updated_at:     created_at,
    };

    let id_str      = encode_uuid(reference.reference_id);
    let owner_str   = encode_uuid(reference.owner_id);
    let content_str = reference.content_id.to_string();
    let status_str  = encode_status(reference.status);
    let at_str      = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_references (
             reference_id, owner_id, content_id, status, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, owner_str, content_str, status_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(reference)
  }

  async fn get_reference(&self, id: Uuid) -> Result<Option<AchievementReference>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawReference> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {REFERENCE_COLUMNS} FROM achievement_references
                 WHERE reference_id = ?1"
              ),
              rusqlite::params![id_str],
              RawReference::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReference::into_reference).transpose()
  }

  async fn list_references(&self, filter: &ReferenceFilter) -> Result<Vec<AchievementReference>> {
    let owner_str  = filter.owner_id.map(encode_uuid);
    let status_str = filter.status.map(encode_status);
    // A negative LIMIT means "no limit" to SQLite.
    let limit_val  = filter.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset_val = i64::try_from(filter.offset.unwrap_or(0)).unwrap_or(i64::MAX);

    let raws: Vec<RawReference> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REFERENCE_COLUMNS} FROM achievement_references
           WHERE (?1 IS NULL OR owner_id = ?1)
             AND (?2 IS NULL OR status = ?2)
           ORDER BY created_at DESC, rowid DESC
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner_str, status_str, limit_val, offset_val],
            RawReference::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawReference::into_reference).collect()
  }

  async fn transition(
    &self,
    id: Uuid,
    change: StatusChange,
  ) -> Result<Option<AchievementReference>> {
    let guard = change
      .expected_from()
      .iter()
      .map(|s| format!("'{}'", encode_status(*s)))
      .collect::<Vec<_>>()
      .join(", ");
    let (assignments, extra) = change_assignments(&change);

    let mut values = vec![
      Value::Text(encode_uuid(id)),
      Value::Text(encode_status(change.target()).to_owned()),
      Value::Text(encode_dt(now())),
    ];
    values.extend(extra);

    let sql = format!(
      "UPDATE achievement_references
       SET status = ?2, updated_at = ?3, {assignments}
       WHERE reference_id = ?1 AND status IN ({guard})
       RETURNING {REFERENCE_COLUMNS}"
    );

    let raw: Option<RawReference> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(values), RawReference::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReference::into_reference).transpose()
  }

  async fn delete_reference(&self, id: Uuid, expected: AchievementStatus) -> Result<bool> {
    let id_str     = encode_uuid(id);
    let status_str = encode_status(expected);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM achievement_references WHERE reference_id = ?1 AND status = ?2",
          rusqlite::params![id_str, status_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn append_history(&self, entry: NewHistoryEntry) -> Result<HistoryEntry> {
    let stored = HistoryEntry {
      history_id:      Uuid::new_v4(),
      reference_id:    entry.reference_id,
      previous_status: entry.previous_status,
      new_status:      entry.new_status,
      changed_by:      entry.changed_by,
      note:            entry.note,
      created_at:      now(),
    };

    let id_str       = encode_uuid(stored.history_id);
    let ref_str      = encode_uuid(stored.reference_id);
    let prev_str     = stored.previous_status.map(encode_status);
    let new_str      = encode_status(stored.new_status);
    let actor_str    = encode_uuid(stored.changed_by);
    let note         = stored.note.clone();
    let at_str       = encode_dt(stored.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievement_history (
             history_id, reference_id, previous_status, new_status,
             changed_by, note, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, ref_str, prev_str, new_str, actor_str, note, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(stored)
  }

  async fn list_history(&self, reference_id: Uuid) -> Result<Vec<HistoryEntry>> {
    let ref_str = encode_uuid(reference_id);

    let raws: Vec<RawHistory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {HISTORY_COLUMNS} FROM achievement_history
           WHERE reference_id = ?1
           ORDER BY created_at ASC, seq ASC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![ref_str], RawHistory::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistory::into_entry).collect()
  }
}
