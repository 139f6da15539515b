//! Error type for `taper-pipeline`.

use taper_core::engine::EngineError;
use thiserror::Error;

use crate::intake;

#[derive(Debug, Error)]
pub enum Error {
  /// Upload rejected before any disk write.
  #[error("invalid upload: {0}")]
  Intake(#[from] intake::Error),

  /// Domain failure (unknown subject, out-of-range height, storage).
  #[error(transparent)]
  Domain(#[from] taper_core::Error),

  /// The external computation produced no usable result. Staged artifacts
  /// have already been discarded when this surfaces.
  #[error("measurement computation failed: {0}")]
  Engine(#[from] EngineError),

  /// Staging-area write failure.
  #[error("failed to stage upload: {0}")]
  Staging(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
