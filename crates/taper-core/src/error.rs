//! Error types for `taper-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::share::ShareStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("subject not found: {0}")]
  SubjectNotFound(Uuid),

  #[error("provider not found: {0}")]
  ProviderNotFound(Uuid),

  #[error("measurement not found: {0}")]
  MeasurementNotFound(Uuid),

  #[error("share not found: {0}")]
  ShareNotFound(Uuid),

  /// The acting subject does not own the measurement it tried to mutate.
  #[error("measurement {measurement_id} is not owned by subject {subject_id}")]
  NotOwner {
    measurement_id: Uuid,
    subject_id:     Uuid,
  },

  /// The acting provider is not the recipient of the share it tried to act on.
  #[error("share {share_id} is not addressed to provider {provider_id}")]
  NotRecipient {
    share_id:    Uuid,
    provider_id: Uuid,
  },

  /// A share already exists for this (measurement, provider) pair.
  #[error("measurement {measurement_id} already shared with provider {provider_id}")]
  AlreadyShared {
    measurement_id: Uuid,
    provider_id:    Uuid,
  },

  #[error("email already registered: {0}")]
  EmailTaken(String),

  /// The share is in a terminal state and accepts no further transitions.
  #[error("share {share_id} is already {status}")]
  ShareClosed {
    share_id: Uuid,
    status:   ShareStatus,
  },

  #[error("height {0} is outside the accepted range (50-300)")]
  HeightOutOfRange(f64),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),

  /// A persistence-layer failure (connection, constraint, corrupt row).
  #[error("storage error: {0}")]
  Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend failure as a [`Error::Storage`].
  pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Storage(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
