//! Achievement content: the descriptive payload of an achievement.
//!
//! Content lives in the content store, keyed by an opaque [`ContentId`]
//! assigned by that store. It is never hard-deleted; a soft-deleted record is
//! invisible to every read.

use std::{collections::BTreeSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Store-assigned identifier of a content record. Opaque to every layer above
/// the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentId(String);

impl ContentId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ContentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

// ─── Category ────────────────────────────────────────────────────────────────

/// The closed set of achievement categories.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Category {
  Academic,
  Competition,
  Organization,
  Publication,
  Certification,
  Other,
}

impl Category {
  /// Parse the discriminant stored in the `category` column.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownCategory(s.to_owned()))
  }
}

// ─── Category detail sub-types ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompetitionLevel {
  International,
  National,
  Regional,
  Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationKind {
  Journal,
  Conference,
  Book,
}

/// A date range, open-ended when `end` is absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
  pub start: NaiveDate,
  pub end:   Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicDetails {
  pub event_date: Option<NaiveDate>,
  pub organizer:  Option<String>,
  /// Grade or score as reported by the awarding body.
  pub score:      Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitionDetails {
  pub competition_name: String,
  pub level:            CompetitionLevel,
  /// Final placement, 1 being first.
  pub rank:             Option<u32>,
  pub medal:            Option<String>,
  pub event_date:       Option<NaiveDate>,
  pub location:         Option<String>,
  pub organizer:        Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationDetails {
  pub organization_name: String,
  pub position:          String,
  pub period:            Option<Period>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationDetails {
  pub kind:              PublicationKind,
  pub publication_title: String,
  #[serde(default)]
  pub authors:           Vec<String>,
  pub publisher:         Option<String>,
  pub issn:              Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificationDetails {
  pub certification_name:   String,
  pub issued_by:            String,
  pub certification_number: Option<String>,
  pub valid_until:          Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtherDetails {
  pub event_date:    Option<NaiveDate>,
  pub location:      Option<String>,
  pub organizer:     Option<String>,
  /// Escape hatch for fields that don't fit any category.
  #[serde(default)]
  pub custom_fields: serde_json::Map<String, serde_json::Value>,
}

// ─── CategoryDetails ─────────────────────────────────────────────────────────

/// The category-specific payload of an achievement. The variant doubles as
/// the achievement's [`Category`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", content = "data", rename_all = "snake_case")]
pub enum CategoryDetails {
  Academic(AcademicDetails),
  Competition(CompetitionDetails),
  Organization(OrganizationDetails),
  Publication(PublicationDetails),
  Certification(CertificationDetails),
  Other(OtherDetails),
}

impl CategoryDetails {
  pub fn category(&self) -> Category {
    match self {
      Self::Academic(_) => Category::Academic,
      Self::Competition(_) => Category::Competition,
      Self::Organization(_) => Category::Organization,
      Self::Publication(_) => Category::Publication,
      Self::Certification(_) => Category::Certification,
      Self::Other(_) => Category::Other,
    }
  }

  /// Serialise the inner payload (without the category tag).
  pub fn to_json(&self) -> Result<serde_json::Value> {
    let full = serde_json::to_value(self)?;
    Ok(full.get("data").cloned().unwrap_or(serde_json::Value::Null))
  }

  /// Rebuild from a stored category and its payload.
  pub fn from_parts(category: Category, data: serde_json::Value) -> Result<Self> {
    let wrapped = serde_json::json!({ "category": category.as_ref(), "data": data });
    Ok(serde_json::from_value(wrapped)?)
  }
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// A file attached to an achievement. No binary data lives in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub file_name:   String,
  pub url:         String,
  pub media_type:  String,
  /// Size in bytes.
  pub size:        u64,
  pub uploaded_at: DateTime<Utc>,
}

/// Input for attaching a file; `uploaded_at` is assigned on append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAttachment {
  pub file_name:  String,
  pub url:        String,
  pub media_type: String,
  pub size:       u64,
}

impl NewAttachment {
  pub fn validate(&self) -> Result<()> {
    if self.file_name.trim().is_empty() {
      return Err(Error::EmptyField("file_name"));
    }
    if self.url.trim().is_empty() {
      return Err(Error::EmptyAttachmentUrl(self.file_name.clone()));
    }
    Ok(())
  }

  pub fn stamp(self, uploaded_at: DateTime<Utc>) -> Attachment {
    Attachment {
      file_name: self.file_name,
      url: self.url,
      media_type: self.media_type,
      size: self.size,
      uploaded_at,
    }
  }
}

// ─── AchievementContent ──────────────────────────────────────────────────────

/// A content record as held by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementContent {
  pub content_id:  ContentId,
  /// The student who owns the achievement. Never changes after creation.
  pub owner_id:    Uuid,
  pub title:       String,
  pub description: String,
  pub details:     CategoryDetails,
  pub tags:        BTreeSet<String>,
  pub points:      u32,
  pub attachments: Vec<Attachment>,
  pub is_deleted:  bool,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
}

impl AchievementContent {
  pub fn category(&self) -> Category { self.details.category() }
}

/// Input to [`crate::store::ContentStore::create`]. Identity and timestamps are
/// assigned by the store.
#[derive(Debug, Clone)]
pub struct NewContent {
  pub owner_id:    Uuid,
  pub title:       String,
  pub description: String,
  pub details:     CategoryDetails,
  pub tags:        BTreeSet<String>,
  pub points:      u32,
}

impl NewContent {
  pub fn validate(&self) -> Result<()> {
    if self.title.trim().is_empty() {
      return Err(Error::EmptyField("title"));
    }
    if self.description.trim().is_empty() {
      return Err(Error::EmptyField("description"));
    }
    Ok(())
  }
}

/// A partial update. `None` keeps the existing value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPatch {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub details:     Option<CategoryDetails>,
  pub tags:        Option<BTreeSet<String>>,
  pub points:      Option<u32>,
}

impl ContentPatch {
  pub fn is_empty(&self) -> bool {
    self.title.is_none()
      && self.description.is_none()
      && self.details.is_none()
      && self.tags.is_none()
      && self.points.is_none()
  }

  pub fn validate(&self) -> Result<()> {
    if self.is_empty() {
      return Err(Error::EmptyPatch);
    }
    if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
      return Err(Error::EmptyField("title"));
    }
    if self.description.as_deref().is_some_and(|d| d.trim().is_empty()) {
      return Err(Error::EmptyField("description"));
    }
    Ok(())
  }

  /// Overwrite the provided fields of `content`.
  pub fn apply_to(self, content: &mut AchievementContent) {
    if let Some(title) = self.title {
      content.title = title;
    }
    if let Some(description) = self.description {
      content.description = description;
    }
    if let Some(details) = self.details {
      content.details = details;
    }
    if let Some(tags) = self.tags {
      content.tags = tags;
    }
    if let Some(points) = self.points {
      content.points = points;
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn competition() -> CategoryDetails {
    CategoryDetails::Competition(CompetitionDetails {
      competition_name: "National Programming Contest".into(),
      level:            CompetitionLevel::National,
      rank:             Some(2),
      medal:            Some("silver".into()),
      event_date:       NaiveDate::from_ymd_opt(2024, 5, 17),
      location:         Some("Bandung".into()),
      organizer:        None,
    })
  }

  #[test]
  fn details_payload_excludes_category_tag() {
    let json = competition().to_json().unwrap();
    assert_eq!(json["competition_name"], "National Programming Contest");
    assert!(json.get("category").is_none());
  }

  #[test]
  fn details_rebuild_from_parts() {
    let details = competition();
    let rebuilt =
      CategoryDetails::from_parts(details.category(), details.to_json().unwrap())
        .unwrap();
    assert_eq!(rebuilt, details);
  }

  #[test]
  fn details_reject_mismatched_payload() {
    let payload = serde_json::json!({ "organization_name": "BEM" });
    assert!(CategoryDetails::from_parts(Category::Competition, payload).is_err());
  }

  #[test]
  fn category_parse_rejects_unknown() {
    assert_eq!(Category::parse("publication").unwrap(), Category::Publication);
    assert!(matches!(
      Category::parse("sports"),
      Err(Error::UnknownCategory(s)) if s == "sports"
    ));
  }

  #[test]
  fn patch_validation() {
    assert!(matches!(ContentPatch::default().validate(), Err(Error::EmptyPatch)));

    let blank_title = ContentPatch { title: Some("  ".into()), ..Default::default() };
    assert!(matches!(blank_title.validate(), Err(Error::EmptyField("title"))));

    let points_only = ContentPatch { points: Some(0), ..Default::default() };
    assert!(points_only.validate().is_ok());
  }

  #[test]
  fn new_content_requires_title_and_description() {
    let mut input = NewContent {
      owner_id:    Uuid::new_v4(),
      title:       "Winner".into(),
      description: String::new(),
      details:     competition(),
      tags:        BTreeSet::new(),
      points:      10,
    };
    assert!(matches!(input.validate(), Err(Error::EmptyField("description"))));
    input.description = "First place".into();
    assert!(input.validate().is_ok());
  }
}
