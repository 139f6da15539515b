//! The contract with the external measurement computation.
//!
//! The engine is opaque: it accepts two staged images plus two scalars and
//! returns a structured result or a structured failure. This module defines
//! that boundary; `taper-pipeline` provides the subprocess implementation.

use std::{future::Future, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::measurement::{Gender, Metrics};

/// One invocation of the engine. Both staged files must exist before the
/// engine is invoked — partial pairs never reach it.
#[derive(Debug, Clone)]
pub struct EngineRequest {
  pub front_image: PathBuf,
  pub side_image:  PathBuf,
  pub height:      f64,
  pub gender:      Gender,
}

/// A successful engine run, already mapped into canonical form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineReport {
  pub metrics:    Metrics,
  /// Engine diagnostics as returned (pixel scale, image resolutions).
  pub metadata:   Option<Value>,
  /// Per-landmark/per-view detection flags as returned.
  pub confidence: Option<Value>,
}

/// Why an engine run produced no usable result.
///
/// All variants are of the same failure class: the caller cleans up staged
/// artifacts and surfaces a processing failure. There are no retries.
#[derive(Debug, Error)]
pub enum EngineError {
  /// The external process could not be started.
  #[error("engine could not be started: {0}")]
  Spawn(String),

  /// The wall-clock deadline elapsed before the engine finished.
  #[error("engine exceeded the {0:?} deadline")]
  TimedOut(Duration),

  /// Output was not well-formed per the wire contract.
  #[error("engine output was malformed: {0}")]
  Malformed(String),

  /// The engine ran and reported `success: false`.
  #[error("engine rejected the input: {0}")]
  Rejected(String),
}

/// Abstraction over the measurement computation.
///
/// Implementations must not hold any lock shared across requests: the compute
/// call is the one operation expected to block for non-trivial wall-clock
/// time, and many subjects run pipelines concurrently.
pub trait MeasurementEngine: Send + Sync {
  fn compute(
    &self,
    request: &EngineRequest,
  ) -> impl Future<Output = Result<EngineReport, EngineError>> + Send;
}
