//! Handlers for `/measurements` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/measurements` | multipart: `front_image`, `side_image`, `subject_id`, `height`, `gender`, optional `notes` |
//! | `GET`  | `/measurements` | All measurements, newest first |
//! | `GET`  | `/measurements/:id` | 404 if not found |
//! | `GET`  | `/subjects/:id/measurements` | A subject's measurements, newest first |
//! | `DELETE` | `/measurements/:id?subject_id=<owner>` | Owner only; cascades to shares and staged images |

use axum::{
  Json,
  extract::{Multipart, Path, Query, State},
  extract::multipart::Field,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::{Value, json};
use taper_core::{
  engine::MeasurementEngine,
  measurement::{Gender, Measurement},
  store::MeasurementStore,
};
use taper_pipeline::{
  SubmitRequest, Upload, cleanup,
  intake::{self, ImageRole},
  process,
};
use uuid::Uuid;

use crate::{ApiError, AppState, ok, ok_list};

// ─── Submit ──────────────────────────────────────────────────────────────────

/// Accumulates the multipart fields of one submission.
#[derive(Default)]
struct SubmitParts {
  front:      Option<Upload>,
  side:       Option<Upload>,
  subject_id: Option<Uuid>,
  height:     Option<f64>,
  gender:     Option<Gender>,
  notes:      Option<String>,
}

async fn read_upload(field: Field<'_>) -> Result<Upload, ApiError> {
  let filename = field.file_name().unwrap_or_default().to_owned();
  let content_type = field
    .content_type()
    .unwrap_or("application/octet-stream")
    .to_owned();
  let bytes = field
    .bytes()
    .await
    .map_err(|e| ApiError::InvalidInput(format!("failed to read upload: {e}")))?;
  Ok(Upload {
    filename,
    content_type,
    bytes,
  })
}

async fn read_text(field: Field<'_>) -> Result<String, ApiError> {
  field
    .text()
    .await
    .map_err(|e| ApiError::InvalidInput(format!("failed to read field: {e}")))
}

async fn collect_parts(mut multipart: Multipart) -> Result<SubmitParts, ApiError> {
  let mut parts = SubmitParts::default();

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {e}")))?
  {
    let name = field.name().unwrap_or_default().to_owned();
    match name.as_str() {
      "front_image" => parts.front = Some(read_upload(field).await?),
      "side_image" => parts.side = Some(read_upload(field).await?),
      "subject_id" => {
        let text = read_text(field).await?;
        parts.subject_id = Some(text.parse().map_err(|_| {
          ApiError::InvalidInput(format!("subject_id is not a valid UUID: {text:?}"))
        })?);
      }
      "height" => {
        let text = read_text(field).await?;
        parts.height = Some(text.parse().map_err(|_| {
          ApiError::InvalidInput(format!("height is not a number: {text:?}"))
        })?);
      }
      "gender" => {
        let text = read_text(field).await?;
        parts.gender = Some(match text.as_str() {
          "male" => Gender::Male,
          "female" => Gender::Female,
          other => {
            return Err(ApiError::InvalidInput(format!(
              "gender must be \"male\" or \"female\", got {other:?}"
            )));
          }
        });
      }
      "notes" => parts.notes = Some(read_text(field).await?),
      // Unknown fields are ignored rather than rejected.
      _ => {}
    }
  }

  Ok(parts)
}

/// `POST /measurements` — multipart submission of one image pair.
pub async fn submit<S, E>(
  State(state): State<AppState<S, E>>,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let parts = collect_parts(multipart).await?;

  let front = parts
    .front
    .ok_or_else(|| ApiError::InvalidInput(intake::Error::Missing(ImageRole::Front).to_string()))?;
  let side = parts
    .side
    .ok_or_else(|| ApiError::InvalidInput(intake::Error::Missing(ImageRole::Side).to_string()))?;
  let subject_id = parts
    .subject_id
    .ok_or_else(|| ApiError::InvalidInput("subject_id is required".to_owned()))?;
  let height = parts
    .height
    .ok_or_else(|| ApiError::InvalidInput("height is required".to_owned()))?;
  let gender = parts
    .gender
    .ok_or_else(|| ApiError::InvalidInput("gender is required".to_owned()))?;

  let request = SubmitRequest {
    subject_id,
    height,
    gender,
    notes: parts.notes,
    front,
    side,
  };

  let measurement =
    process(&state.staging, &*state.engine, &*state.store, request).await?;
  Ok((StatusCode::CREATED, ok(measurement)))
}

// ─── Reads ───────────────────────────────────────────────────────────────────

/// `GET /measurements`
pub async fn list<S, E>(
  State(state): State<AppState<S, E>>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let measurements: Vec<Measurement> = state.store.list_measurements().await?;
  Ok(ok_list(measurements))
}

/// `GET /measurements/:id`
pub async fn get_one<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let measurement = state
    .store
    .get_measurement(id)
    .await?
    .ok_or(taper_core::Error::MeasurementNotFound(id))?;
  Ok(ok(measurement))
}

/// `GET /subjects/:id/measurements`
pub async fn list_for_subject<S, E>(
  State(state): State<AppState<S, E>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  state
    .store
    .get_subject(subject_id)
    .await?
    .ok_or(taper_core::Error::SubjectNotFound(subject_id))?;

  let measurements = state.store.list_measurements_for_subject(subject_id).await?;
  Ok(ok_list(measurements))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OwnerParams {
  /// The acting subject; must own the measurement.
  pub subject_id: Uuid,
}

/// `DELETE /measurements/:id?subject_id=<owner>`
///
/// Ordered cascade: share rows and the record go in one store transaction,
/// then the two staged images are discarded best-effort.
pub async fn remove<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
  Query(params): Query<OwnerParams>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let deleted = state.store.delete_measurement(id, params.subject_id).await?;

  cleanup::discard([&deleted.front_image, &deleted.side_image]).await;

  Ok(Json(json!({
    "success": true,
    "message": "measurement deleted",
  })))
}
