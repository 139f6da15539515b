//! Measurement — one completed processing result.
//!
//! A measurement is written exactly once, by a successful pipeline run. The
//! owner, height, image references, and metric values never change afterwards;
//! reprocessing the same photographs creates a new record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// Accepted range for the declared height, unit-agnostic (e.g. cm).
pub const HEIGHT_MIN: f64 = 50.0;
pub const HEIGHT_MAX: f64 = 300.0;

/// Validate the declared height before any I/O happens.
pub fn check_height(height: f64) -> Result<()> {
  if !height.is_finite() || !(HEIGHT_MIN..=HEIGHT_MAX).contains(&height) {
    return Err(Error::HeightOutOfRange(height));
  }
  Ok(())
}

// ─── Gender ──────────────────────────────────────────────────────────────────

/// The biomechanical model category the external engine is keyed to.
///
/// A closed two-value enumeration by engine contract; widening it requires a
/// new engine, not a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
  Male,
  Female,
}

impl std::fmt::Display for Gender {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Male => write!(f, "male"),
      Self::Female => write!(f, "female"),
    }
  }
}

// ─── Metrics ─────────────────────────────────────────────────────────────────

/// The twelve body metrics the engine can derive.
///
/// Every field is independently optional: `None` means the engine could not
/// determine that metric. Zero is a legitimate physical value and is never
/// used as a stand-in for "not detected".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
  pub shoulder_width:      Option<f64>,
  pub chest_circumference: Option<f64>,
  pub waist_circumference: Option<f64>,
  pub hip_circumference:   Option<f64>,
  pub neck_circumference:  Option<f64>,
  pub bicep_circumference: Option<f64>,
  pub wrist_circumference: Option<f64>,
  pub thigh_circumference: Option<f64>,
  pub sleeve_length:       Option<f64>,
  pub upper_arm_length:    Option<f64>,
  pub inseam:              Option<f64>,
  pub torso_length:        Option<f64>,
}

// ─── Measurement ─────────────────────────────────────────────────────────────

/// A persisted measurement record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
  pub measurement_id: Uuid,
  /// Owner; immutable after creation.
  pub subject_id:     Uuid,
  /// The declared height the metrics were scaled against.
  pub height:         f64,
  #[serde(flatten)]
  pub metrics:        Metrics,
  /// Staging reference of the front source image, retained for audit.
  pub front_image:    String,
  /// Staging reference of the side source image, retained for audit.
  pub side_image:     String,
  /// Free-form engine diagnostics (pixel scale, per-image resolution).
  pub metadata:       Option<serde_json::Value>,
  /// Free-form per-landmark/per-view detection flags.
  pub confidence:     Option<serde_json::Value>,
  pub notes:          Option<String>,
  pub is_favorite:    bool,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Everything the store needs for the single-shot insert of a freshly
/// mapped pipeline result.
#[derive(Debug, Clone)]
pub struct NewMeasurement {
  pub subject_id:  Uuid,
  pub height:      f64,
  pub metrics:     Metrics,
  pub front_image: String,
  pub side_image:  String,
  pub metadata:    Option<serde_json::Value>,
  pub confidence:  Option<serde_json::Value>,
  pub notes:       Option<String>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn height_bounds_are_inclusive() {
    assert!(check_height(50.0).is_ok());
    assert!(check_height(300.0).is_ok());
    assert!(check_height(175.0).is_ok());
  }

  #[test]
  fn height_outside_range_is_rejected() {
    assert!(matches!(check_height(49.9), Err(Error::HeightOutOfRange(_))));
    assert!(matches!(check_height(300.1), Err(Error::HeightOutOfRange(_))));
    assert!(matches!(check_height(f64::NAN), Err(Error::HeightOutOfRange(_))));
  }
}
