//! [`PythonEngine`] — the subprocess implementation of [`MeasurementEngine`].
//!
//! Runs the external computation as a bounded child process: argv carries the
//! two staged image paths plus the two scalars, stdout carries the structured
//! result, stderr carries diagnostics. Only the absence or malformedness of
//! the success payload indicates failure — stderr output alone does not.

use std::{path::PathBuf, process::Stdio, time::Duration};

use tokio::process::Command;

use taper_core::engine::{EngineError, EngineReport, EngineRequest, MeasurementEngine};

use crate::mapper;

/// Default wall-clock bound for one engine run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The external measurement computation, invoked as
/// `<python> <script> <front> <side> <height> <gender>`.
#[derive(Debug, Clone)]
pub struct PythonEngine {
  python:  PathBuf,
  script:  PathBuf,
  timeout: Duration,
}

impl PythonEngine {
  pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
    Self {
      python:  python.into(),
      script:  script.into(),
      timeout: DEFAULT_TIMEOUT,
    }
  }

  pub fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  /// Liveness check: can the interpreter be started at all?
  pub async fn probe(&self) -> bool {
    Command::new(&self.python)
      .arg("--version")
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .status()
      .await
      .map(|status| status.success())
      .unwrap_or(false)
  }
}

impl MeasurementEngine for PythonEngine {
  async fn compute(&self, request: &EngineRequest) -> Result<EngineReport, EngineError> {
    let mut cmd = Command::new(&self.python);
    cmd
      .arg(&self.script)
      .arg(&request.front_image)
      .arg(&request.side_image)
      .arg(request.height.to_string())
      .arg(request.gender.to_string())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      // If the deadline elapses the dropped future must take the child
      // with it; a straggler result has no caller left to receive it.
      .kill_on_drop(true);

    tracing::debug!(
      front = %request.front_image.display(),
      side = %request.side_image.display(),
      height = request.height,
      gender = %request.gender,
      "invoking measurement engine"
    );

    let output = tokio::time::timeout(self.timeout, cmd.output())
      .await
      .map_err(|_| EngineError::TimedOut(self.timeout))?
      .map_err(|e| EngineError::Spawn(e.to_string()))?;

    // Diagnostic channel only; never a failure signal by itself.
    if !output.stderr.is_empty() {
      tracing::warn!(
        stderr = %String::from_utf8_lossy(&output.stderr),
        "engine diagnostics"
      );
    }

    mapper::parse_report(&output.stdout)
  }
}
