//! JSON REST API for Taper.
//!
//! Exposes an axum [`Router`] backed by any
//! [`taper_core::store::MeasurementStore`] and
//! [`taper_core::engine::MeasurementEngine`]. Auth, TLS, and transport
//! concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", taper_api::api_router(state.clone()))
//! ```

pub mod error;
pub mod health;
pub mod measurements;
pub mod providers;
pub mod shares;
pub mod subjects;

use std::sync::Arc;

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, post},
};
use serde::Serialize;
use serde_json::{Value, json};
use taper_core::{engine::MeasurementEngine, store::MeasurementStore};
use taper_pipeline::Staging;

pub use error::ApiError;

/// Request-body ceiling: two images at the per-file intake cap, plus
/// multipart framing headroom. The per-file limit itself is enforced by the
/// intake layer.
const BODY_LIMIT: usize = 2 * taper_pipeline::intake::MAX_UPLOAD_BYTES + 64 * 1024;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, E> {
  pub store:   Arc<S>,
  pub engine:  Arc<E>,
  pub staging: Staging,
}

// Manual impl: `S` and `E` sit behind `Arc`s, so no `Clone` bounds needed.
impl<S, E> Clone for AppState<S, E> {
  fn clone(&self) -> Self {
    Self {
      store:   Arc::clone(&self.store),
      engine:  Arc::clone(&self.engine),
      staging: self.staging.clone(),
    }
  }
}

// ─── Response envelope ───────────────────────────────────────────────────────

/// `{"success": true, "data": ...}`
pub(crate) fn ok<T: Serialize>(data: T) -> Json<Value> {
  Json(json!({ "success": true, "data": data }))
}

/// `{"success": true, "count": N, "data": [...]}`
pub(crate) fn ok_list<T: Serialize>(data: Vec<T>) -> Json<Value> {
  Json(json!({ "success": true, "count": data.len(), "data": data }))
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, E>(state: AppState<S, E>) -> Router<()>
where
  S: MeasurementStore + 'static,
  E: MeasurementEngine + 'static,
{
  Router::new()
    // Measurements
    .route(
      "/measurements",
      get(measurements::list::<S, E>).post(measurements::submit::<S, E>),
    )
    .route(
      "/measurements/{id}",
      get(measurements::get_one::<S, E>).delete(measurements::remove::<S, E>),
    )
    // Shares
    .route("/shares", post(shares::create::<S, E>))
    .route("/shares/{id}", get(shares::get_one::<S, E>))
    .route("/shares/{id}/accept", post(shares::accept::<S, E>))
    .route("/shares/{id}/reject", post(shares::reject::<S, E>))
    // Subjects
    .route(
      "/subjects",
      get(subjects::list::<S, E>).post(subjects::create::<S, E>),
    )
    .route("/subjects/{id}", get(subjects::get_one::<S, E>))
    .route(
      "/subjects/{id}/measurements",
      get(measurements::list_for_subject::<S, E>),
    )
    .route("/subjects/{id}/shares", get(shares::list_for_subject::<S, E>))
    // Providers
    .route(
      "/providers",
      get(providers::list::<S, E>).post(providers::create::<S, E>),
    )
    .route("/providers/{id}", get(providers::get_one::<S, E>))
    .route(
      "/providers/{id}/shares",
      get(shares::list_for_provider::<S, E>),
    )
    // Liveness
    .route("/health", get(health::check))
    .layer(DefaultBodyLimit::max(BODY_LIMIT))
    .with_state(state)
}
