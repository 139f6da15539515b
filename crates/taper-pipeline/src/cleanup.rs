//! Best-effort removal of staged artifacts.
//!
//! A removal failure is logged and swallowed — cleanup must never mask or
//! replace the error that triggered it.

use std::path::Path;

/// Remove each staged file, logging failures at warn level.
pub async fn discard<I, P>(paths: I)
where
  I: IntoIterator<Item = P>,
  P: AsRef<Path>,
{
  for path in paths {
    let path = path.as_ref();
    if let Err(e) = tokio::fs::remove_file(path).await {
      tracing::warn!(path = %path.display(), error = %e, "failed to remove staged artifact");
    }
  }
}
