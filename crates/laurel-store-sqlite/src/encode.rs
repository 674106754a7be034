//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `Z` suffix) so that they sort lexicographically. UUIDs are
//! stored as hyphenated lowercase strings. Structured content fields are
//! stored as compact JSON.

use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, SubsecRound as _, Utc};
use laurel_core::{
  content::{AchievementContent, Attachment, Category, CategoryDetails, ContentId},
  lifecycle::{AchievementReference, AchievementStatus, HistoryEntry},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// The current time, truncated to the precision that survives a round trip
/// through [`encode_dt`].
pub fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── Status ──────────────────────────────────────────────────────────────────

pub fn encode_status(s: AchievementStatus) -> &'static str { s.into() }

pub fn decode_status(s: &str) -> Result<AchievementStatus> {
  Ok(AchievementStatus::parse(s)?)
}

// ─── Content document ────────────────────────────────────────────────────────

/// The JSON shape of the `document` column.
#[derive(Serialize, Deserialize)]
struct ContentDocument {
  title:       String,
  description: String,
  details:     serde_json::Value,
  #[serde(default)]
  tags:        BTreeSet<String>,
  #[serde(default)]
  points:      u32,
}

/// Serialise the descriptive fields of `content` for the `document` column.
pub fn encode_document(content: &AchievementContent) -> Result<String> {
  let doc = ContentDocument {
    title:       content.title.clone(),
    description: content.description.clone(),
    details:     content.details.to_json()?,
    tags:        content.tags.clone(),
    points:      content.points,
  };
  Ok(serde_json::to_string(&doc)?)
}

pub fn encode_attachment(a: &Attachment) -> Result<String> { Ok(serde_json::to_string(a)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

pub const CONTENT_COLUMNS: &str = "content_id, owner_id, category, document, attachments, \
                                   is_deleted, created_at, updated_at";

/// Raw values read directly from an `achievements` row.
pub struct RawContent {
  pub content_id:  String,
  pub owner_id:    String,
  pub category:    String,
  pub document:    String,
  pub attachments: String,
  pub is_deleted:  bool,
  pub created_at:  String,
  pub updated_at:  String,
}

impl RawContent {
  /// Read a row selected with [`CONTENT_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      content_id:  row.get(0)?,
      owner_id:    row.get(1)?,
      category:    row.get(2)?,
      document:    row.get(3)?,
      attachments: row.get(4)?,
      is_deleted:  row.get(5)?,
      created_at:  row.get(6)?,
      updated_at:  row.get(7)?,
    })
  }

  pub fn into_content(self) -> Result<AchievementContent> {
    let doc: ContentDocument = serde_json::from_str(&self.document)?;
    let category = Category::parse(&self.category)?;

    Ok(AchievementContent {
      content_id:  ContentId::new(self.content_id),
      owner_id:    decode_uuid(&self.owner_id)?,
      title:       doc.title,
      description: doc.description,
      details:     CategoryDetails::from_parts(category, doc.details)?,
      tags:        doc.tags,
      points:      doc.points,
      attachments: serde_json::from_str(&self.attachments)?,
      is_deleted:  self.is_deleted,
      created_at:  decode_dt(&self.created_at)?,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

pub const REFERENCE_COLUMNS: &str = "reference_id, owner_id, content_id, status, submitted_at, \
                                     verified_at, verified_by, rejection_note, created_at, \
                                     updated_at";

/// Raw values read directly from an `achievement_references` row.
pub struct RawReference {
  pub reference_id:   String,
  pub owner_id:       String,
  pub content_id:     String,
  pub status:         String,
  pub submitted_at:   Option<String>,
  pub verified_at:    Option<String>,
  pub verified_by:    Option<String>,
  pub rejection_note: Option<String>,
  pub created_at:     String,
  pub updated_at:     String,
}

impl RawReference {
  /// Read a row selected with [`REFERENCE_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      reference_id:   row.get(0)?,
      owner_id:       row.get(1)?,
      content_id:     row.get(2)?,
      status:         row.get(3)?,
      submitted_at:   row.get(4)?,
      verified_at:    row.get(5)?,
      verified_by:    row.get(6)?,
      rejection_note: row.get(7)?,
      created_at:     row.get(8)?,
      updated_at:     row.get(9)?,
    })
  }

  pub fn into_reference(self) -> Result<AchievementReference> {
    Ok(AchievementReference {
      reference_id:   decode_uuid(&self.reference_id)?,
      owner_id:       decode_uuid(&self.owner_id)?,
      content_id:     ContentId::new(self.content_id),
      status:         decode_status(&self.status)?,
      submitted_at:   decode_opt_dt(self.submitted_at)?,
      verified_at:    decode_opt_dt(self.verified_at)?,
      verified_by:    self.verified_by.as_deref().map(decode_uuid).transpose()?,
      rejection_note: self.rejection_note,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const HISTORY_COLUMNS: &str =
  "history_id, reference_id, previous_status, new_status, changed_by, note, created_at";

/// Raw values read directly from an `achievement_history` row.
pub struct RawHistory {
  pub history_id:      String,
  pub reference_id:    String,
  pub previous_status: Option<String>,
  pub new_status:      String,
  pub changed_by:      String,
  pub note:            Option<String>,
  pub created_at:      String,
}

impl RawHistory {
  /// Read a row selected with [`HISTORY_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      history_id:      row.get(0)?,
      reference_id:    row.get(1)?,
      previous_status: row.get(2)?,
      new_status:      row.get(3)?,
      changed_by:      row.get(4)?,
      note:            row.get(5)?,
      created_at:      row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<HistoryEntry> {
    Ok(HistoryEntry {
      history_id:      decode_uuid(&self.history_id)?,
      reference_id:    decode_uuid(&self.reference_id)?,
      previous_status: self.previous_status.as_deref().map(decode_status).transpose()?,
      new_status:      decode_status(&self.new_status)?,
      changed_by:      decode_uuid(&self.changed_by)?,
      note:            self.note,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}
