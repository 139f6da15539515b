//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure response carries `success: false` plus a stable,
//! machine-distinguishable error kind and a human-readable message.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("{0}")]
  InvalidInput(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Computation(String),

  #[error("{0}")]
  Internal(String),
}

impl ApiError {
  fn status(&self) -> StatusCode {
    match self {
      Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::Forbidden(_) => StatusCode::FORBIDDEN,
      Self::Conflict(_) => StatusCode::CONFLICT,
      Self::Computation(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Self::InvalidInput(_) => "invalid_input",
      Self::NotFound(_) => "not_found",
      Self::Forbidden(_) => "forbidden",
      Self::Conflict(_) => "conflict",
      Self::Computation(_) => "computation_failed",
      Self::Internal(_) => "storage",
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let body = json!({
      "success": false,
      "error": { "kind": self.kind(), "message": self.to_string() },
    });
    (self.status(), Json(body)).into_response()
  }
}

impl From<taper_core::Error> for ApiError {
  fn from(e: taper_core::Error) -> Self {
    use taper_core::Error as E;
    match e {
      E::SubjectNotFound(_)
      | E::ProviderNotFound(_)
      | E::MeasurementNotFound(_)
      | E::ShareNotFound(_) => Self::NotFound(e.to_string()),
      E::NotOwner { .. } | E::NotRecipient { .. } => Self::Forbidden(e.to_string()),
      E::AlreadyShared { .. } | E::EmailTaken(_) | E::ShareClosed { .. } => {
        Self::Conflict(e.to_string())
      }
      E::HeightOutOfRange(_) => Self::InvalidInput(e.to_string()),
      E::Serialization(_) | E::Storage(_) => Self::Internal(e.to_string()),
    }
  }
}

impl From<taper_pipeline::Error> for ApiError {
  fn from(e: taper_pipeline::Error) -> Self {
    use taper_pipeline::Error as E;
    match e {
      E::Intake(inner) => Self::InvalidInput(inner.to_string()),
      E::Domain(inner) => Self::from(inner),
      E::Engine(inner) => Self::Computation(inner.to_string()),
      E::Staging(inner) => Self::Internal(inner.to_string()),
    }
  }
}
