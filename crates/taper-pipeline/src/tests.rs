//! Pipeline integration tests against a stub engine and an in-memory store.

use bytes::Bytes;
use taper_core::{
  engine::{EngineError, EngineReport, EngineRequest, MeasurementEngine},
  measurement::{Gender, Metrics},
  party::NewSubject,
  store::MeasurementStore,
};
use taper_store_sqlite::SqliteStore;
use tempfile::TempDir;
use uuid::Uuid;

use crate::{Error, Staging, SubmitRequest, Upload, intake, process};

/// Engine double: runs the provided closure instead of a subprocess.
struct StubEngine<F>(F);

impl<F> MeasurementEngine for StubEngine<F>
where
  F: Fn(&EngineRequest) -> Result<EngineReport, EngineError> + Send + Sync,
{
  async fn compute(&self, request: &EngineRequest) -> Result<EngineReport, EngineError> {
    (self.0)(request)
  }
}

fn sample_report() -> EngineReport {
  EngineReport {
    metrics:    Metrics {
      shoulder_width: Some(40.2),
      chest_circumference: Some(92.5),
      ..Metrics::default()
    },
    metadata:   Some(serde_json::json!({ "body_height_pixels": 1043.5 })),
    confidence: Some(serde_json::json!({ "front_detection": true })),
  }
}

fn jpeg(filename: &str) -> Upload {
  Upload {
    filename:     filename.into(),
    content_type: "image/jpeg".into(),
    bytes:        Bytes::from_static(b"\xff\xd8\xff\xe0 not a real jpeg"),
  }
}

async fn store_with_subject() -> (SqliteStore, Uuid) {
  let store = SqliteStore::open_in_memory().await.expect("in-memory store");
  let subject = store
    .add_subject(NewSubject {
      name:  "Ada".into(),
      email: "ada@example.com".into(),
    })
    .await
    .unwrap();
  (store, subject.subject_id)
}

fn request(subject_id: Uuid) -> SubmitRequest {
  SubmitRequest {
    subject_id,
    height: 175.0,
    gender: Gender::Female,
    notes: Some("first fitting".into()),
    front: jpeg("front.jpg"),
    side: jpeg("side.jpg"),
  }
}

fn staged_file_count(dir: &TempDir) -> usize {
  std::fs::read_dir(dir.path()).unwrap().count()
}

// ─── Success path ────────────────────────────────────────────────────────────

#[tokio::test]
async fn successful_run_persists_mapped_metrics() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  // The engine must observe both staged files on disk.
  let engine = StubEngine(|req: &EngineRequest| {
    assert!(req.front_image.exists());
    assert!(req.side_image.exists());
    Ok(sample_report())
  });

  let measurement = process(&staging, &engine, &store, request(subject_id))
    .await
    .unwrap();

  assert_eq!(measurement.subject_id, subject_id);
  assert_eq!(measurement.height, 175.0);
  assert_eq!(measurement.metrics.shoulder_width, Some(40.2));
  assert_eq!(measurement.metrics.waist_circumference, None);

  // Durable record matches what was returned.
  let fetched = store
    .get_measurement(measurement.measurement_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(fetched.metrics.shoulder_width, Some(40.2));

  // Both artifacts are retained for audit.
  assert_eq!(staged_file_count(&dir), 2);
  assert!(std::path::Path::new(&measurement.front_image).exists());
  assert!(std::path::Path::new(&measurement.side_image).exists());
}

#[tokio::test]
async fn concurrent_submissions_get_distinct_artifact_names() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  let engine = StubEngine(|_: &EngineRequest| Ok(sample_report()));

  let a = process(&staging, &engine, &store, request(subject_id))
    .await
    .unwrap();
  let b = process(&staging, &engine, &store, request(subject_id))
    .await
    .unwrap();

  assert_ne!(a.front_image, b.front_image);
  assert_eq!(staged_file_count(&dir), 4);
}

// ─── Failure paths ───────────────────────────────────────────────────────────

#[tokio::test]
async fn engine_rejection_cleans_up_and_persists_nothing() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  let engine = StubEngine(|_: &EngineRequest| {
    Err(EngineError::Rejected(
      "Could not detect body pose in front image.".into(),
    ))
  });

  let err = process(&staging, &engine, &store, request(subject_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Engine(EngineError::Rejected(_))));

  assert!(store.list_measurements().await.unwrap().is_empty());
  assert_eq!(staged_file_count(&dir), 0);
}

#[tokio::test]
async fn malformed_engine_output_cleans_up() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  let engine = StubEngine(|_: &EngineRequest| {
    Err(EngineError::Malformed("not json".into()))
  });

  let err = process(&staging, &engine, &store, request(subject_id))
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Engine(EngineError::Malformed(_))));
  assert_eq!(staged_file_count(&dir), 0);
}

#[tokio::test]
async fn wrong_content_type_is_rejected_before_any_write() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  let engine = StubEngine(|_: &EngineRequest| -> Result<EngineReport, EngineError> {
    panic!("engine must not run for invalid input")
  });

  let mut req = request(subject_id);
  req.front = Upload {
    filename:     "front.txt".into(),
    content_type: "text/plain".into(),
    bytes:        Bytes::from_static(b"not an image"),
  };

  let err = process(&staging, &engine, &store, req).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Intake(intake::Error::UnsupportedType { .. })
  ));
  assert_eq!(staged_file_count(&dir), 0);
}

#[tokio::test]
async fn oversized_upload_is_rejected_before_any_write() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  let engine = StubEngine(|_: &EngineRequest| -> Result<EngineReport, EngineError> {
    panic!("engine must not run for invalid input")
  });

  let mut req = request(subject_id);
  req.side = Upload {
    filename:     "side.jpg".into(),
    content_type: "image/jpeg".into(),
    bytes:        Bytes::from(vec![0u8; intake::MAX_UPLOAD_BYTES + 1]),
  };

  let err = process(&staging, &engine, &store, req).await.unwrap_err();
  assert!(matches!(err, Error::Intake(intake::Error::TooLarge { .. })));
  assert_eq!(staged_file_count(&dir), 0);
}

#[tokio::test]
async fn unknown_subject_is_rejected_before_any_write() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let store = SqliteStore::open_in_memory().await.unwrap();
  let engine = StubEngine(|_: &EngineRequest| Ok(sample_report()));

  let err = process(&staging, &engine, &store, request(Uuid::new_v4()))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(taper_core::Error::SubjectNotFound(_))
  ));
  assert_eq!(staged_file_count(&dir), 0);
}

#[tokio::test]
async fn out_of_range_height_is_rejected_before_any_write() {
  let dir = TempDir::new().unwrap();
  let staging = Staging::new(dir.path());
  let (store, subject_id) = store_with_subject().await;
  let engine = StubEngine(|_: &EngineRequest| Ok(sample_report()));

  let mut req = request(subject_id);
  req.height = 20.0;

  let err = process(&staging, &engine, &store, req).await.unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(taper_core::Error::HeightOutOfRange(_))
  ));
  assert_eq!(staged_file_count(&dir), 0);
}
