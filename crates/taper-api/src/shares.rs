//! Handlers for the sharing workflow.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/shares` | Body: [`CreateBody`]; subject offers a measurement |
//! | `GET`  | `/shares/:id?provider_id=<recipient>` | First provider read moves `pending → viewed` |
//! | `POST` | `/shares/:id/accept` | Body: [`ActBody`] |
//! | `POST` | `/shares/:id/reject` | Body: [`ActBody`] |
//! | `GET`  | `/subjects/:id/shares` | Outgoing shares, provider resolved |
//! | `GET`  | `/providers/:id/shares` | Incoming shares, subject + measurement resolved |
//!
//! Every mutating action re-checks the caller's claimed identity against the
//! stored owner or recipient; nothing is derived from earlier calls.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use taper_core::{
  engine::MeasurementEngine,
  share::{NewShare, ShareDecision},
  store::MeasurementStore,
};
use uuid::Uuid;

use crate::{ApiError, AppState, ok, ok_list};

// ─── Create ──────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /shares`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  /// The acting subject; must own the measurement.
  pub subject_id:     Uuid,
  pub measurement_id: Uuid,
  pub provider_id:    Uuid,
  pub message:        Option<String>,
}

/// `POST /shares` — returns 201 + the pending share.
pub async fn create<S, E>(
  State(state): State<AppState<S, E>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let share = state
    .store
    .create_share(
      NewShare {
        measurement_id: body.measurement_id,
        provider_id:    body.provider_id,
        message:        body.message,
      },
      body.subject_id,
    )
    .await?;
  Ok((StatusCode::CREATED, ok(share)))
}

// ─── Provider read / view ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecipientParams {
  /// The acting provider; must be the share's recipient.
  pub provider_id: Uuid,
}

/// `GET /shares/:id?provider_id=<recipient>`
///
/// Reading a pending share as its recipient stamps `viewed_at` and moves it
/// to `viewed`; later reads return the share unchanged.
pub async fn get_one<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
  Query(params): Query<RecipientParams>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let share = state.store.view_share(id, params.provider_id).await?;
  Ok(ok(share))
}

// ─── Accept / Reject ─────────────────────────────────────────────────────────

/// JSON body accepted by the accept and reject endpoints.
#[derive(Debug, Deserialize)]
pub struct ActBody {
  /// The acting provider; must be the share's recipient.
  pub provider_id: Uuid,
  pub notes:       Option<String>,
}

/// `POST /shares/:id/accept`
pub async fn accept<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActBody>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let share = state
    .store
    .resolve_share(id, body.provider_id, ShareDecision::Accepted, body.notes)
    .await?;
  Ok(ok(share))
}

/// `POST /shares/:id/reject`
pub async fn reject<S, E>(
  State(state): State<AppState<S, E>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ActBody>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let share = state
    .store
    .resolve_share(id, body.provider_id, ShareDecision::Rejected, body.notes)
    .await?;
  Ok(ok(share))
}

// ─── Listings ────────────────────────────────────────────────────────────────

/// `GET /subjects/:id/shares` — outgoing shares with each provider resolved.
pub async fn list_for_subject<S, E>(
  State(state): State<AppState<S, E>>,
  Path(subject_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  let shares = state.store.list_shares_for_subject(subject_id).await?;
  Ok(ok_list(shares))
}

/// `GET /providers/:id/shares` — incoming shares with the subject and the
/// measurement resolved.
pub async fn list_for_provider<S, E>(
  State(state): State<AppState<S, E>>,
  Path(provider_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError>
where
  S: MeasurementStore,
  E: MeasurementEngine,
{
  state
    .store
    .get_provider(provider_id)
    .await?
    .ok_or(taper_core::Error::ProviderNotFound(provider_id))?;

  let shares = state.store.list_shares_for_provider(provider_id).await?;
  Ok(ok_list(shares))
}
