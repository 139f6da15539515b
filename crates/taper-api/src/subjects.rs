//! Handlers for `/subjects` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/subjects` | Newest first |
//! | `POST` | `/subjects` | Body: `{"name":..,"email":..}`; duplicate email → 409 |
//! | `GET`  | `/subjects/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use taper_core::{engine::MeasurementEngine, party::NewSubject, store::MeasurementStore};
use uuid::Uuid;

use crate::{ApiError, AppState, ok, ok_list};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:  String,
  pub email: String,
}

fn check_profile(name: &str, email: &str) -> Result<(), ApiError> {
  if name.trim().is_empty() {
    return Err(ApiError::InvalidInput("name is required".to_owned()));
  }
  if email.trim().is_empty() || !email.contains('@') {
    return Err(ApiError::InvalidInput(format!("not a valid email: {email:?}")));
  }
  Ok(())
}

/// `POST /subjects`
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  check_profile(&body.name, &body.email)?;
  let subject = state
    .store
    .add_subject(NewSubject {
      name:  body.name,
      email: body.email,
    })
    .await?;
  Ok((StatusCode::CREATED, ok(subject)))
}

/// `GET /subjects`
pub async fn list<S, E>(
  State(state): State<AppState<S, E>>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let subjects = state.store.list_subjects().await?;
  Ok(ok_list(subjects))
}

/// `GET /subjects/:id`
pub async fn get_one<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let subject = state
    .store
    .get_subject(id)
    .await?
    .ok_or(taper_core::Error::SubjectNotFound(id))?;
  Ok(ok(subject))
}
