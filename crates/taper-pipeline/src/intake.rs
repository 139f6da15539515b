//! Upload validation and staging.
//!
//! Both images of a request are validated (type, size) before anything is
//! written, then staged under request-unique names so concurrent uploads
//! never collide. Either both staged files exist when this module returns,
//! or neither does.

use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

/// Per-file upload ceiling.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted directly. `image/jpg` is not a registered type but
/// common in the wild.
const ALLOWED_MIME: [&str; 3] = ["image/jpeg", "image/jpg", "image/png"];

/// Extensions accepted when a client mislabels the upload as a generic
/// octet-stream.
const ALLOWED_EXT: [&str; 3] = ["jpg", "jpeg", "png"];

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Which of the two required images an intake error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
  Front,
  Side,
}

impl std::fmt::Display for ImageRole {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Front => write!(f, "front"),
      Self::Side => write!(f, "side"),
    }
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("the {0} image is required")]
  Missing(ImageRole),

  #[error("only JPEG and PNG images are accepted; the {role} image was {content_type:?}")]
  UnsupportedType { role: ImageRole, content_type: String },

  #[error("the {role} image is {size} bytes; the limit is {MAX_UPLOAD_BYTES}")]
  TooLarge { role: ImageRole, size: usize },
}

// ─── Upload ──────────────────────────────────────────────────────────────────

/// One raw uploaded file, as received from the transport layer.
#[derive(Debug, Clone)]
pub struct Upload {
  pub filename:     String,
  pub content_type: String,
  pub bytes:        Bytes,
}

impl Upload {
  fn extension(&self) -> Option<String> {
    Path::new(&self.filename)
      .extension()
      .map(|e| e.to_string_lossy().to_lowercase())
  }
}

/// Reject wrong types and oversized buffers before any disk write.
pub fn validate(role: ImageRole, upload: &Upload) -> Result<(), Error> {
  let accepted = ALLOWED_MIME.contains(&upload.content_type.as_str())
    || (upload.content_type == "application/octet-stream"
      && upload
        .extension()
        .is_some_and(|ext| ALLOWED_EXT.contains(&ext.as_str())));

  if !accepted {
    return Err(Error::UnsupportedType {
      role,
      content_type: upload.content_type.clone(),
    });
  }

  if upload.bytes.len() > MAX_UPLOAD_BYTES {
    return Err(Error::TooLarge {
      role,
      size: upload.bytes.len(),
    });
  }

  Ok(())
}

/// The staged file name extension for an accepted upload.
fn staged_extension(upload: &Upload) -> &'static str {
  match upload.content_type.as_str() {
    "image/png" => "png",
    "application/octet-stream" if upload.extension().as_deref() == Some("png") => "png",
    _ => "jpg",
  }
}

// ─── Staging ─────────────────────────────────────────────────────────────────

/// Both images of one request, staged and ready for the engine.
#[derive(Debug, Clone)]
pub struct StagedPair {
  pub front: PathBuf,
  pub side:  PathBuf,
}

/// The staging area for uploaded image pairs.
#[derive(Debug, Clone)]
pub struct Staging {
  dir: PathBuf,
}

impl Staging {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  /// Create the staging directory if it does not exist yet.
  pub async fn ensure_dir(&self) -> std::io::Result<()> {
    tokio::fs::create_dir_all(&self.dir).await
  }

  /// Validate and write both images.
  ///
  /// Names carry a request-unique token, so concurrent requests cannot
  /// collide and no locking is needed. If the second write fails, the first
  /// file is removed before the error propagates — partial pairs never
  /// outlive this call.
  pub async fn stage_pair(
    &self,
    front: &Upload,
    side: &Upload,
  ) -> crate::Result<StagedPair> {
    validate(ImageRole::Front, front)?;
    validate(ImageRole::Side, side)?;

    let token = Uuid::new_v4().simple().to_string();
    let front_path = self
      .dir
      .join(format!("front_{token}.{}", staged_extension(front)));
    let side_path = self
      .dir
      .join(format!("side_{token}.{}", staged_extension(side)));

    tokio::fs::write(&front_path, &front.bytes).await?;
    if let Err(e) = tokio::fs::write(&side_path, &side.bytes).await {
      crate::cleanup::discard([&front_path]).await;
      return Err(e.into());
    }

    Ok(StagedPair {
      front: front_path,
      side:  side_path,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn upload(filename: &str, content_type: &str, len: usize) -> Upload {
    Upload {
      filename:     filename.into(),
      content_type: content_type.into(),
      bytes:        Bytes::from(vec![0u8; len]),
    }
  }

  #[test]
  fn accepts_whitelisted_mime_types() {
    for ct in ["image/jpeg", "image/jpg", "image/png"] {
      assert!(validate(ImageRole::Front, &upload("a.bin", ct, 10)).is_ok());
    }
  }

  #[test]
  fn rejects_plain_text() {
    let err =
      validate(ImageRole::Front, &upload("a.txt", "text/plain", 10)).unwrap_err();
    assert!(matches!(err, Error::UnsupportedType { .. }));
  }

  #[test]
  fn octet_stream_falls_back_to_extension() {
    assert!(
      validate(
        ImageRole::Side,
        &upload("photo.JPEG", "application/octet-stream", 10)
      )
      .is_ok()
    );
    let err = validate(
      ImageRole::Side,
      &upload("photo.gif", "application/octet-stream", 10),
    )
    .unwrap_err();
    assert!(matches!(err, Error::UnsupportedType { .. }));
  }

  #[test]
  fn rejects_oversized_buffers() {
    let err = validate(
      ImageRole::Front,
      &upload("a.jpg", "image/jpeg", MAX_UPLOAD_BYTES + 1),
    )
    .unwrap_err();
    assert!(matches!(err, Error::TooLarge { .. }));
  }

  #[test]
  fn size_at_the_ceiling_is_accepted() {
    assert!(
      validate(
        ImageRole::Front,
        &upload("a.jpg", "image/jpeg", MAX_UPLOAD_BYTES)
      )
      .is_ok()
    );
  }

  #[test]
  fn png_keeps_its_extension_when_staged() {
    assert_eq!(staged_extension(&upload("a.png", "image/png", 1)), "png");
    assert_eq!(staged_extension(&upload("a.jpg", "image/jpeg", 1)), "jpg");
    assert_eq!(
      staged_extension(&upload("a.png", "application/octet-stream", 1)),
      "png"
    );
  }
}
