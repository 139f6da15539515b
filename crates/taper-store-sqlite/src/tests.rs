//! Integration tests for `SqliteStore` against an in-memory database.

use taper_core::{
  Error,
  measurement::{Metrics, NewMeasurement},
  party::{NewProvider, NewSubject},
  share::{NewShare, ShareDecision, ShareStatus},
  store::MeasurementStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

async fn subject(s: &SqliteStore, email: &str) -> Uuid {
  s.add_subject(NewSubject {
    name:  "Ada".into(),
    email: email.into(),
  })
  .await
  .unwrap()
  .subject_id
}

async fn provider(s: &SqliteStore, email: &str) -> Uuid {
  s.add_provider(NewProvider {
    name:  "Stitch & Co".into(),
    email: email.into(),
  })
  .await
  .unwrap()
  .provider_id
}

fn sample_measurement(subject_id: Uuid) -> NewMeasurement {
  NewMeasurement {
    subject_id,
    height: 175.0,
    metrics: Metrics {
      shoulder_width: Some(40.2),
      chest_circumference: Some(92.5),
      waist_circumference: None,
      ..Metrics::default()
    },
    front_image: "staging/front_a.jpg".into(),
    side_image: "staging/side_a.jpg".into(),
    metadata: Some(serde_json::json!({ "body_height_pixels": 1043.5 })),
    confidence: Some(serde_json::json!({ "front_detection": true })),
    notes: Some("first fitting".into()),
  }
}

// ─── Parties ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_and_get_subject() {
  let s = store().await;

  let id = subject(&s, "ada@example.com").await;
  let fetched = s.get_subject(id).await.unwrap().unwrap();
  assert_eq!(fetched.subject_id, id);
  assert_eq!(fetched.email, "ada@example.com");
}

#[tokio::test]
async fn get_subject_missing_returns_none() {
  let s = store().await;
  assert!(s.get_subject(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn duplicate_subject_email_conflicts() {
  let s = store().await;
  subject(&s, "ada@example.com").await;

  let err = s
    .add_subject(NewSubject {
      name:  "Other Ada".into(),
      email: "ada@example.com".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmailTaken(_)));
}

#[tokio::test]
async fn duplicate_provider_email_conflicts() {
  let s = store().await;
  provider(&s, "shop@example.com").await;

  let err = s
    .add_provider(NewProvider {
      name:  "Copycat".into(),
      email: "shop@example.com".into(),
    })
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmailTaken(_)));
}

// ─── Measurements ────────────────────────────────────────────────────────────

#[tokio::test]
async fn insert_and_get_measurement_round_trips() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;

  let created = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  let fetched = s
    .get_measurement(created.measurement_id)
    .await
    .unwrap()
    .unwrap();

  assert_eq!(fetched.subject_id, owner);
  assert_eq!(fetched.height, 175.0);
  assert_eq!(fetched.metrics.shoulder_width, Some(40.2));
  assert_eq!(fetched.metrics.chest_circumference, Some(92.5));
  // Undetected metrics stay absent rather than becoming zero.
  assert_eq!(fetched.metrics.waist_circumference, None);
  assert_eq!(fetched.metrics.inseam, None);
  assert_eq!(fetched.front_image, "staging/front_a.jpg");
  assert!(!fetched.is_favorite);
  assert_eq!(
    fetched.confidence,
    Some(serde_json::json!({ "front_detection": true }))
  );
}

#[tokio::test]
async fn zero_metric_is_preserved_not_nulled() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;

  let mut input = sample_measurement(owner);
  input.metrics.wrist_circumference = Some(0.0);
  let created = s.insert_measurement(input).await.unwrap();

  let fetched = s
    .get_measurement(created.measurement_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.metrics.wrist_circumference, Some(0.0));
}

#[tokio::test]
async fn find_one_is_idempotent() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let created = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let a = s.get_measurement(created.measurement_id).await.unwrap().unwrap();
  let b = s.get_measurement(created.measurement_id).await.unwrap().unwrap();
  assert_eq!(serde_json::to_value(&a).unwrap(), serde_json::to_value(&b).unwrap());
}

#[tokio::test]
async fn subject_listing_is_newest_first() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;

  let first = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  let second = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let listed = s.list_measurements_for_subject(owner).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].measurement_id, second.measurement_id);
  assert_eq!(listed[1].measurement_id, first.measurement_id);
}

#[tokio::test]
async fn delete_requires_ownership() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let intruder = subject(&s, "eve@example.com").await;
  let created = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let err = s
    .delete_measurement(created.measurement_id, intruder)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotOwner { .. }));

  // Nothing was touched.
  assert!(
    s.get_measurement(created.measurement_id)
      .await
      .unwrap()
      .is_some()
  );
}

#[tokio::test]
async fn delete_cascades_to_shares() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let created = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  s.create_share(
    NewShare {
      measurement_id: created.measurement_id,
      provider_id:    p,
      message:        None,
    },
    owner,
  )
  .await
  .unwrap();

  let deleted = s
    .delete_measurement(created.measurement_id, owner)
    .await
    .unwrap();
  assert_eq!(deleted.measurement_id, created.measurement_id);

  assert!(
    s.get_measurement(created.measurement_id)
      .await
      .unwrap()
      .is_none()
  );
  assert!(s.list_shares_for_subject(owner).await.unwrap().is_empty());
  assert!(s.list_shares_for_provider(p).await.unwrap().is_empty());
}

// ─── Shares ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn share_starts_pending() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let share = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        Some("please review".into()),
      },
      owner,
    )
    .await
    .unwrap();

  assert_eq!(share.status, ShareStatus::Pending);
  assert_eq!(share.message.as_deref(), Some("please review"));
  assert!(share.viewed_at.is_none());
}

#[tokio::test]
async fn share_requires_ownership() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let intruder = subject(&s, "eve@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let err = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      intruder,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::NotOwner { .. }));
}

#[tokio::test]
async fn share_requires_existing_measurement_and_provider() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let err = s
    .create_share(
      NewShare {
        measurement_id: Uuid::new_v4(),
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::MeasurementNotFound(_)));

  let err = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    Uuid::new_v4(),
        message:        None,
      },
      owner,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::ProviderNotFound(_)));
}

#[tokio::test]
async fn duplicate_share_pair_conflicts_even_after_rejection() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();

  let share = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap();

  s.resolve_share(share.share_id, p, ShareDecision::Rejected, None)
    .await
    .unwrap();

  // Still a duplicate: rejection does not free the pair for re-sharing.
  let err = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::AlreadyShared { .. }));
}

#[tokio::test]
async fn view_stamps_once_and_is_idempotent() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  let share = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap();

  let viewed = s.view_share(share.share_id, p).await.unwrap();
  assert_eq!(viewed.status, ShareStatus::Viewed);
  let stamp = viewed.viewed_at.expect("viewed_at stamped");

  let again = s.view_share(share.share_id, p).await.unwrap();
  assert_eq!(again.status, ShareStatus::Viewed);
  assert_eq!(again.viewed_at, Some(stamp));
}

#[tokio::test]
async fn view_by_non_recipient_is_forbidden() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let other = provider(&s, "other@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  let share = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap();

  let err = s.view_share(share.share_id, other).await.unwrap_err();
  assert!(matches!(err, Error::NotRecipient { .. }));

  // No transition happened.
  let listed = s.list_shares_for_provider(p).await.unwrap();
  assert_eq!(listed[0].share.status, ShareStatus::Pending);
  assert!(listed[0].share.viewed_at.is_none());
}

#[tokio::test]
async fn accept_is_allowed_from_pending() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  let share = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap();

  let resolved = s
    .resolve_share(share.share_id, p, ShareDecision::Accepted, None)
    .await
    .unwrap();
  assert_eq!(resolved.status, ShareStatus::Accepted);
}

#[tokio::test]
async fn terminal_share_refuses_further_transitions() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  let share = s
    .create_share(
      NewShare {
        measurement_id: m.measurement_id,
        provider_id:    p,
        message:        None,
      },
      owner,
    )
    .await
    .unwrap();

  s.view_share(share.share_id, p).await.unwrap();
  let rejected = s
    .resolve_share(
      share.share_id,
      p,
      ShareDecision::Rejected,
      Some("image too dark".into()),
    )
    .await
    .unwrap();
  assert_eq!(rejected.status, ShareStatus::Rejected);
  assert_eq!(rejected.provider_notes.as_deref(), Some("image too dark"));

  let err = s
    .resolve_share(share.share_id, p, ShareDecision::Accepted, None)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::ShareClosed {
      status: ShareStatus::Rejected,
      ..
    }
  ));
}

#[tokio::test]
async fn provider_listing_resolves_subject_and_measurement() {
  let s = store().await;
  let owner = subject(&s, "ada@example.com").await;
  let p = provider(&s, "shop@example.com").await;
  let m = s.insert_measurement(sample_measurement(owner)).await.unwrap();
  s.create_share(
    NewShare {
      measurement_id: m.measurement_id,
      provider_id:    p,
      message:        Some("please review".into()),
    },
    owner,
  )
  .await
  .unwrap();

  let listed = s.list_shares_for_provider(p).await.unwrap();
  assert_eq!(listed.len(), 1);
  let view = &listed[0];
  assert_eq!(view.subject.as_ref().unwrap().subject_id, owner);
  assert_eq!(
    view.measurement.as_ref().unwrap().measurement_id,
    m.measurement_id
  );
  assert!(view.provider.is_none());

  let outgoing = s.list_shares_for_subject(owner).await.unwrap();
  assert_eq!(outgoing.len(), 1);
  assert_eq!(outgoing[0].provider.as_ref().unwrap().provider_id, p);
  assert!(outgoing[0].measurement.is_none());
}
