//! [`SqliteContentStore`]: the SQLite implementation of [`ContentStore`].

use std::path::Path;

use laurel_core::{
  content::{AchievementContent, Attachment, ContentId, NewContent},
  store::ContentStore,
};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use crate::{
  Result,
  encode::{
    CONTENT_COLUMNS, RawContent, encode_attachment, encode_document, encode_dt, encode_uuid, now,
  },
  schema::{self, CONTENT_SCHEMA},
};

/// Achievement content backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteContentStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteContentStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    schema::init(&conn, CONTENT_SCHEMA).await?;
    Ok(Self { conn })
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    schema::init(&conn, CONTENT_SCHEMA).await?;
    Ok(Self { conn })
  }

  /// Close the underlying connection, flushing pending work.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  /// Run a single-row `UPDATE … RETURNING` and decode the result.
  async fn update_returning(
    &self,
    sql: String,
    params: Vec<String>,
  ) -> Result<Option<AchievementContent>> {
    let raw: Option<RawContent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(params), RawContent::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContent::into_content).transpose()
  }
}

impl ContentStore for SqliteContentStore {
  type Error = crate::Error;

  async fn create(&self, input: NewContent) -> Result<AchievementContent> {
    let created_at = now();
    let content = AchievementContent {
      content_id: ContentId::new(Uuid::new_v4().simple().to_string()),
      owner_id: input.owner_id,
      title: input.title,
      description: input.description,
      details: input.details,
      tags: input.tags,
      points: input.points,
      attachments: Vec::new(),
      is_deleted: false,
      created_at,
      updated_at: created_at,
    };

    let id_str       = content.content_id.to_string();
    let owner_str    = encode_uuid(content.owner_id);
    let category_str = content.category().as_ref().to_owned();
    let document     = encode_document(&content)?;
    let at_str       = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO achievements (
             content_id, owner_id, category, document, attachments,
             is_deleted, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, '[]', 0, ?5, ?5)",
          rusqlite::params![id_str, owner_str, category_str, document, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(content)
  }

  async fn get(&self, id: ContentId) -> Result<Option<AchievementContent>> {
    let id_str = id.to_string();

    let raw: Option<RawContent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {CONTENT_COLUMNS} FROM achievements
                 WHERE content_id = ?1 AND is_deleted = 0"
              ),
              rusqlite::params![id_str],
              RawContent::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawContent::into_content).transpose()
  }

  async fn get_many(&self, ids: &[ContentId]) -> Result<Vec<AchievementContent>> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let id_strs: Vec<String> = ids.iter().map(ToString::to_string).collect();
    let placeholders = vec!["?"; id_strs.len()].join(", ");

    let raws: Vec<RawContent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {CONTENT_COLUMNS} FROM achievements
           WHERE content_id IN ({placeholders}) AND is_deleted = 0"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(id_strs), RawContent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawContent::into_content).collect()
  }

  async fn update(
    &self,
    id: ContentId,
    content: AchievementContent,
  ) -> Result<Option<AchievementContent>> {
    let params = vec![
      id.to_string(),
      content.category().as_ref().to_owned(),
      encode_document(&content)?,
      encode_dt(now()),
    ];
    self
      .update_returning(
        format!(
          "UPDATE achievements
           SET category = ?2, document = ?3, updated_at = ?4
           WHERE content_id = ?1 AND is_deleted = 0
           RETURNING {CONTENT_COLUMNS}"
        ),
        params,
      )
      .await
  }

  async fn append_attachment(
    &self,
    id: ContentId,
    attachment: Attachment,
  ) -> Result<Option<AchievementContent>> {
    let params = vec![id.to_string(), encode_attachment(&attachment)?, encode_dt(now())];
    self
      .update_returning(
        format!(
          "UPDATE achievements
           SET attachments = json_insert(attachments, '$[#]', json(?2)), updated_at = ?3
           WHERE content_id = ?1 AND is_deleted = 0
           RETURNING {CONTENT_COLUMNS}"
        ),
        params,
      )
      .await
  }

  async fn remove_attachment(
    &self,
    id: ContentId,
    attachment: Attachment,
  ) -> Result<Option<AchievementContent>> {
    let params = vec![id.to_string(), encode_attachment(&attachment)?, encode_dt(now())];
    self
      .update_returning(
        format!(
          "UPDATE achievements
           SET attachments = (
                 SELECT json_group_array(json(value)) FROM json_each(attachments)
                 WHERE json(value) <> json(?2)
               ),
               updated_at = ?3
           WHERE content_id = ?1 AND is_deleted = 0
           RETURNING {CONTENT_COLUMNS}"
        ),
        params,
      )
      .await
  }

  async fn soft_delete(&self, id: ContentId) -> Result<bool> {
    let id_str = id.to_string();
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievements SET is_deleted = 1, updated_at = ?2
           WHERE content_id = ?1 AND is_deleted = 0",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }

  async fn restore(&self, id: ContentId) -> Result<bool> {
    let id_str = id.to_string();
    let at_str = encode_dt(now());

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE achievements SET is_deleted = 0, updated_at = ?2
           WHERE content_id = ?1 AND is_deleted = 1",
          rusqlite::params![id_str, at_str],
        )?)
      })
      .await?;

    Ok(changed == 1)
  }
}
