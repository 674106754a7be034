//! Integration tests for the SQLite stores against in-memory databases.

use std::collections::BTreeSet;

use laurel_core::{
  content::{
    CategoryDetails, CertificationDetails, CompetitionDetails, CompetitionLevel, ContentId,
    NewAttachment, NewContent, OtherDetails,
  },
  lifecycle::{AchievementStatus, NewHistoryEntry, NewReference, StatusChange},
  store::{ContentStore, ReferenceFilter, ReferenceStore, StoreError},
};
use uuid::Uuid;

use crate::{SqliteContentStore, SqliteReferenceStore, encode::now};

async fn contents() -> SqliteContentStore {
  SqliteContentStore::open_in_memory()
    .await
    .expect("in-memory content store")
}

async fn references() -> SqliteReferenceStore {
  SqliteReferenceStore::open_in_memory()
    .await
    .expect("in-memory reference store")
}

fn competition_content(owner_id: Uuid, title: &str) -> NewContent {
  NewContent {
    owner_id,
    title: title.into(),
    description: "Second place in the national final".into(),
    details: CategoryDetails::Competition(CompetitionDetails {
      competition_name: "Gemastik".into(),
      level:            CompetitionLevel::National,
      rank:             Some(2),
      medal:            Some("silver".into()),
      event_date:       None,
      location:         Some("Surabaya".into()),
      organizer:        None,
    }),
    tags: BTreeSet::from(["programming".to_string(), "team".to_string()]),
    points: 40,
  }
}

// ─── Content store ───────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_content() {
  let s = contents().await;
  let owner = Uuid::new_v4();

  let created = s.create(competition_content(owner, "Gemastik")).await.unwrap();
  assert!(!created.is_deleted);
  assert!(created.attachments.is_empty());

  let fetched = s.get(created.content_id.clone()).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_content_returns_none() {
  let s = contents().await;
  let result = s.get(ContentId::new("does-not-exist")).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn soft_deleted_content_is_invisible() {
  let s = contents().await;
  let created = s
    .create(competition_content(Uuid::new_v4(), "Gemastik"))
    .await
    .unwrap();

  assert!(s.soft_delete(created.content_id.clone()).await.unwrap());
  assert!(s.get(created.content_id.clone()).await.unwrap().is_none());
  assert!(
    s.get_many(&[created.content_id.clone()])
      .await
      .unwrap()
      .is_empty()
  );

  // A second soft delete finds nothing to delete.
  assert!(!s.soft_delete(created.content_id.clone()).await.unwrap());
}

#[tokio::test]
async fn restore_undoes_soft_delete() {
  let s = contents().await;
  let created = s
    .create(competition_content(Uuid::new_v4(), "Gemastik"))
    .await
    .unwrap();

  assert!(!s.restore(created.content_id.clone()).await.unwrap());
  s.soft_delete(created.content_id.clone()).await.unwrap();
  assert!(s.restore(created.content_id.clone()).await.unwrap());
  assert!(s.get(created.content_id).await.unwrap().is_some());
}

#[tokio::test]
async fn get_many_omits_missing_and_deleted() {
  let s = contents().await;
  let owner = Uuid::new_v4();
  let a = s.create(competition_content(owner, "A")).await.unwrap();
  let b = s.create(competition_content(owner, "B")).await.unwrap();
  let c = s.create(competition_content(owner, "C")).await.unwrap();
  s.soft_delete(b.content_id.clone()).await.unwrap();

  let ids = [
    a.content_id.clone(),
    b.content_id.clone(),
    c.content_id.clone(),
    ContentId::new("ghost"),
  ];
  let found = s.get_many(&ids).await.unwrap();

  let found_ids: BTreeSet<_> = found.into_iter().map(|c| c.content_id).collect();
  assert_eq!(found_ids, BTreeSet::from([a.content_id, c.content_id]));
}

#[tokio::test]
async fn get_many_empty_input() {
  let s = contents().await;
  assert!(s.get_many(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn update_overwrites_descriptive_fields() {
  let s = contents().await;
  let created = s
    .create(competition_content(Uuid::new_v4(), "Gemastik"))
    .await
    .unwrap();

  let mut changed = created.clone();
  changed.title = "Gemastik 2024".into();
  changed.points = 55;
  changed.details = CategoryDetails::Certification(CertificationDetails {
    certification_name:   "AWS Cloud Practitioner".into(),
    issued_by:            "Amazon".into(),
    certification_number: None,
    valid_until:          None,
  });

  let updated = s
    .update(created.content_id.clone(), changed)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(updated.title, "Gemastik 2024");
  assert_eq!(updated.points, 55);
  assert_eq!(updated.category(), laurel_core::content::Category::Certification);
  assert_eq!(updated.owner_id, created.owner_id);
  assert_eq!(updated.created_at, created.created_at);
  assert!(updated.updated_at >= created.updated_at);
}

#[tokio::test]
async fn update_deleted_content_returns_none() {
  let s = contents().await;
  let created = s
    .create(competition_content(Uuid::new_v4(), "Gemastik"))
    .await
    .unwrap();
  s.soft_delete(created.content_id.clone()).await.unwrap();

  let result = s.update(created.content_id.clone(), created).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn attachments_append_in_order() {
  let s = contents().await;
  let created = s
    .create(NewContent {
      owner_id:    Uuid::new_v4(),
      title:       "Seminar speaker".into(),
      description: "Invited talk".into(),
      details:     CategoryDetails::Other(OtherDetails::default()),
      tags:        BTreeSet::new(),
      points:      5,
    })
    .await
    .unwrap();

  for name in ["certificate.pdf", "photo.jpg"] {
    let attachment = NewAttachment {
      file_name:  name.into(),
      url:        format!("https://files.example.com/{name}"),
      media_type: "application/octet-stream".into(),
      size:       1024,
    }
    .stamp(now());
    s.append_attachment(created.content_id.clone(), attachment)
      .await
      .unwrap()
      .unwrap();
  }

  let fetched = s.get(created.content_id).await.unwrap().unwrap();
  let names: Vec<_> = fetched.attachments.iter().map(|a| a.file_name.as_str()).collect();
  assert_eq!(names, ["certificate.pdf", "photo.jpg"]);
}

#[tokio::test]
async fn remove_attachment_keeps_the_others() {
  let s = contents().await;
  let created = s.create(competition_content(Uuid::new_v4(), "Hackathon")).await.unwrap();

  let stamped: Vec<_> = ["poster.png", "slides.pdf", "photo.jpg"]
    .into_iter()
    .map(|name| {
      NewAttachment {
        file_name:  name.into(),
        url:        format!("https://files.example.com/{name}"),
        media_type: "application/octet-stream".into(),
        size:       2048,
      }
      .stamp(now())
    })
    .collect();
  for a in &stamped {
    s.append_attachment(created.content_id.clone(), a.clone())
      .await
      .unwrap()
      .unwrap();
  }

  let trimmed = s
    .remove_attachment(created.content_id.clone(), stamped[1].clone())
    .await
    .unwrap()
    .unwrap();
  let names: Vec<_> = trimmed.attachments.iter().map(|a| a.file_name.as_str()).collect();
  assert_eq!(names, ["poster.png", "photo.jpg"]);

  // Removing something that is not there changes nothing.
  let unchanged = s
    .remove_attachment(created.content_id.clone(), stamped[1].clone())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(unchanged.attachments, trimmed.attachments);

  for a in [&stamped[0], &stamped[2]] {
    s.remove_attachment(created.content_id.clone(), a.clone())
      .await
      .unwrap()
      .unwrap();
  }
  let empty = s.get(created.content_id.clone()).await.unwrap().unwrap();
  assert!(empty.attachments.is_empty());

  assert!(s.soft_delete(created.content_id.clone()).await.unwrap());
  assert!(
    s.remove_attachment(created.content_id, stamped[0].clone())
      .await
      .unwrap()
      .is_none()
  );
}

// ─── Reference store ─────────────────────────────────────────────────────────

fn new_reference(owner_id: Uuid) -> NewReference {
  NewReference {
    reference_id: Uuid::new_v4(),
    owner_id,
    content_id: ContentId::new(Uuid::new_v4().simple().to_string()),
  }
}

#[tokio::test]
async fn create_reference_starts_in_draft() {
  let s = references().await;
  let created = s.create_reference(new_reference(Uuid::new_v4())).await.unwrap();

  assert_eq!(created.status, AchievementStatus::Draft);
  assert!(created.submitted_at.is_none());

  let fetched = s.get_reference(created.reference_id).await.unwrap().unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn get_missing_reference_returns_none() {
  let s = references().await;
  assert!(s.get_reference(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn submit_then_verify() {
  let s = references().await;
  let reviewer = Uuid::new_v4();
  let r = s.create_reference(new_reference(Uuid::new_v4())).await.unwrap();

  let submitted = s
    .transition(r.reference_id, StatusChange::Submit)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(submitted.status, AchievementStatus::Submitted);
  assert!(submitted.submitted_at.is_some());

  let verified = s
    .transition(r.reference_id, StatusChange::Verify { reviewer })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(verified.status, AchievementStatus::Verified);
  assert_eq!(verified.verified_by, Some(reviewer));
  assert!(verified.verified_at.is_some());
  assert!(verified.rejection_note.is_none());
}

#[tokio::test]
async fn transition_guard_rejects_wrong_status() {
  let s = references().await;
  let r = s.create_reference(new_reference(Uuid::new_v4())).await.unwrap();

  let result = s
    .transition(r.reference_id, StatusChange::Verify { reviewer: Uuid::new_v4() })
    .await
    .unwrap();
  assert!(result.is_none());

  let unchanged = s.get_reference(r.reference_id).await.unwrap().unwrap();
  assert_eq!(unchanged.status, AchievementStatus::Draft);
}

#[tokio::test]
async fn transition_on_missing_reference_returns_none() {
  let s = references().await;
  let result = s
    .transition(Uuid::new_v4(), StatusChange::Submit)
    .await
    .unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn reject_then_revert_clears_submitted_at() {
  let s = references().await;
  let reviewer = Uuid::new_v4();
  let r = s.create_reference(new_reference(Uuid::new_v4())).await.unwrap();
  s.transition(r.reference_id, StatusChange::Submit)
    .await
    .unwrap()
    .unwrap();

  let rejected = s
    .transition(r.reference_id, StatusChange::Reject {
      reviewer,
      note: "incomplete".into(),
    })
    .await
    .unwrap()
    .unwrap();
  assert_eq!(rejected.status, AchievementStatus::Rejected);
  assert_eq!(rejected.rejection_note.as_deref(), Some("incomplete"));

  let reverted = s
    .transition(r.reference_id, StatusChange::RevertToDraft)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(reverted.status, AchievementStatus::Draft);
  assert!(reverted.submitted_at.is_none());
}

#[tokio::test]
async fn concurrent_verifications_have_one_winner() {
  let s = references().await;
  let r = s.create_reference(new_reference(Uuid::new_v4())).await.unwrap();
  s.transition(r.reference_id, StatusChange::Submit)
    .await
    .unwrap()
    .unwrap();

  let (a, b) = tokio::join!(
    s.transition(r.reference_id, StatusChange::Verify { reviewer: Uuid::new_v4() }),
    s.transition(r.reference_id, StatusChange::Reject {
      reviewer: Uuid::new_v4(),
      note:     "duplicate".into(),
    }),
  );
  let winners = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
  assert_eq!(winners, 1);
}

#[tokio::test]
async fn delete_reference_is_guarded_by_status() {
  let s = references().await;
  let r = s.create_reference(new_reference(Uuid::new_v4())).await.unwrap();
  s.transition(r.reference_id, StatusChange::Submit)
    .await
    .unwrap()
    .unwrap();

  assert!(
    !s.delete_reference(r.reference_id, AchievementStatus::Draft)
      .await
      .unwrap()
  );
  assert!(s.get_reference(r.reference_id).await.unwrap().is_some());

  assert!(
    s.delete_reference(r.reference_id, AchievementStatus::Submitted)
      .await
      .unwrap()
  );
  assert!(s.get_reference(r.reference_id).await.unwrap().is_none());
}

#[tokio::test]
async fn list_references_filters_and_pages() {
  let s = references().await;
  let alice = Uuid::new_v4();
  let bob = Uuid::new_v4();

  let a1 = s.create_reference(new_reference(alice)).await.unwrap();
  let a2 = s.create_reference(new_reference(alice)).await.unwrap();
  s.create_reference(new_reference(bob)).await.unwrap();
  s.transition(a2.reference_id, StatusChange::Submit)
    .await
    .unwrap()
    .unwrap();

  let all = s.list_references(&ReferenceFilter::default()).await.unwrap();
  assert_eq!(all.len(), 3);

  let mine = s
    .list_references(&ReferenceFilter { owner_id: Some(alice), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(mine.len(), 2);
  // Newest first.
  assert_eq!(mine[0].reference_id, a2.reference_id);
  assert_eq!(mine[1].reference_id, a1.reference_id);

  let pending = s
    .list_references(&ReferenceFilter {
      status: Some(AchievementStatus::Submitted),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(pending.len(), 1);
  assert_eq!(pending[0].reference_id, a2.reference_id);

  let page = s
    .list_references(&ReferenceFilter {
      limit: Some(1),
      offset: Some(1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(page.len(), 1);
}

#[tokio::test]
async fn list_references_clamps_oversized_pages() {
  let s = references().await;
  let owner = Uuid::new_v4();
  for _ in 0..3 {
    s.create_reference(new_reference(owner)).await.unwrap();
  }

  let everything = s
    .list_references(&ReferenceFilter { limit: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(everything.len(), 3);

  let past_the_end = s
    .list_references(&ReferenceFilter { offset: Some(usize::MAX), ..Default::default() })
    .await
    .unwrap();
  assert!(past_the_end.is_empty());

  let capped = s
    .list_references(&ReferenceFilter {
      limit: Some(2),
      offset: Some(usize::MAX - 1),
      ..Default::default()
    })
    .await
    .unwrap();
  assert!(capped.is_empty());
}

// ─── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_ordered_and_scoped() {
  let s = references().await;
  let owner = Uuid::new_v4();
  let r = s.create_reference(new_reference(owner)).await.unwrap();
  let other = s.create_reference(new_reference(owner)).await.unwrap();

  let steps = [
    (None, AchievementStatus::Draft),
    (Some(AchievementStatus::Draft), AchievementStatus::Submitted),
    (Some(AchievementStatus::Submitted), AchievementStatus::Rejected),
  ];
  for (previous_status, new_status) in steps {
    s.append_history(NewHistoryEntry {
      reference_id: r.reference_id,
      previous_status,
      new_status,
      changed_by: owner,
      note: None,
    })
    .await
    .unwrap();
  }
  s.append_history(NewHistoryEntry {
    reference_id:    other.reference_id,
    previous_status: None,
    new_status:      AchievementStatus::Draft,
    changed_by:      owner,
    note:            None,
  })
  .await
  .unwrap();

  let history = s.list_history(r.reference_id).await.unwrap();
  let got: Vec<_> = history
    .iter()
    .map(|h| (h.previous_status, h.new_status))
    .collect();
  assert_eq!(got, steps);
  assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[tokio::test]
async fn history_empty_for_unknown_reference() {
  let s = references().await;
  assert!(s.list_history(Uuid::new_v4()).await.unwrap().is_empty());
}

#[tokio::test]
async fn history_requires_existing_reference() {
  let s = references().await;
  let err = s
    .append_history(NewHistoryEntry {
      reference_id:    Uuid::new_v4(),
      previous_status: None,
      new_status:      AchievementStatus::Draft,
      changed_by:      Uuid::new_v4(),
      note:            None,
    })
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::Database(_)));
  assert!(!err.is_transient());
}

#[tokio::test]
async fn deleting_reference_removes_its_history() {
  let s = references().await;
  let owner = Uuid::new_v4();
  let r = s.create_reference(new_reference(owner)).await.unwrap();
  s.append_history(NewHistoryEntry {
    reference_id:    r.reference_id,
    previous_status: None,
    new_status:      AchievementStatus::Draft,
    changed_by:      owner,
    note:            None,
  })
  .await
  .unwrap();

  s.delete_reference(r.reference_id, AchievementStatus::Draft)
    .await
    .unwrap();
  assert!(s.list_history(r.reference_id).await.unwrap().is_empty());
}
