//! Handlers for `/providers` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/providers` | Newest first |
//! | `POST` | `/providers` | Body: `{"name":..,"email":..}`; duplicate email → 409 |
//! | `GET`  | `/providers/:id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use taper_core::{engine::MeasurementEngine, party::NewProvider, store::MeasurementStore};
use uuid::Uuid;

use crate::{ApiError, AppState, ok, ok_list};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:  String,
  pub email: String,
}

/// `POST /providers`
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::InvalidInput("name is required".to_owned()));
  }
  if body.email.trim().is_empty() || !body.email.contains('@') {
    return Err(ApiError::InvalidInput(format!(
      "not a valid email: {:?}",
      body.email
    )));
  }

  let provider = state
    .store
    .add_provider(NewProvider {
      name:  body.name,
      email: body.email,
    })
    .await?;
  Ok((StatusCode::CREATED, ok(provider)))
}

/// `GET /providers`
pub async fn list<S, E>(
  State(state): State<AppState<S, E>>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let providers = state.store.list_providers().await?;
  Ok(ok_list(providers))
}

/// `GET /providers/:id`
pub async fn get_one<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let provider = state
    .store
    .get_provider(id)
    .await?
    .ok_or(taper_core::Error::ProviderNotFound(id))?;
  Ok(ok(provider))
}
