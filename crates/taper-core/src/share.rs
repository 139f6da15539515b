//! SharedMeasurement — one offer of a measurement to a provider.
//!
//! Shares move strictly forward: `pending → viewed → {accepted, rejected}`.
//! The terminal states accept no further transitions; a rejected measurement
//! cannot be silently re-offered under the same share record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  measurement::Measurement,
  party::{Provider, Subject},
};

// ─── Status ──────────────────────────────────────────────────────────────────

/// The workflow state of a share.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareStatus {
  Pending,
  Viewed,
  Accepted,
  Rejected,
}

impl ShareStatus {
  /// Terminal states accept no further provider actions.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Accepted | Self::Rejected)
  }
}

impl std::fmt::Display for ShareStatus {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Pending => write!(f, "pending"),
      Self::Viewed => write!(f, "viewed"),
      Self::Accepted => write!(f, "accepted"),
      Self::Rejected => write!(f, "rejected"),
    }
  }
}

/// The provider's verdict on a share — the two terminal transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareDecision {
  Accepted,
  Rejected,
}

impl ShareDecision {
  pub fn status(self) -> ShareStatus {
    match self {
      Self::Accepted => ShareStatus::Accepted,
      Self::Rejected => ShareStatus::Rejected,
    }
  }
}

// ─── Share ───────────────────────────────────────────────────────────────────

/// A persisted share record. At most one exists per
/// (`measurement_id`, `provider_id`) pair at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedMeasurement {
  pub share_id:       Uuid,
  pub subject_id:     Uuid,
  pub measurement_id: Uuid,
  pub provider_id:    Uuid,
  pub status:         ShareStatus,
  /// Optional text from the subject at share time.
  pub message:        Option<String>,
  /// Optional text the provider attached while acting on the share.
  pub provider_notes: Option<String>,
  /// Stamped on the first provider view; null while `pending`.
  pub viewed_at:      Option<DateTime<Utc>>,
  pub shared_at:      DateTime<Utc>,
}

/// Input for the subject's share action.
#[derive(Debug, Clone)]
pub struct NewShare {
  pub measurement_id: Uuid,
  pub provider_id:    Uuid,
  pub message:        Option<String>,
}

// ─── Read-side join ──────────────────────────────────────────────────────────

/// A share with its counterpart party resolved, so a caller can render the
/// row without a second round trip.
///
/// When listed for a subject the `provider` side is populated; when listed
/// for a provider the `subject` and `measurement` sides are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareView {
  #[serde(flatten)]
  pub share:       SharedMeasurement,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub provider:    Option<Provider>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub subject:     Option<Subject>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub measurement: Option<Measurement>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn terminal_states() {
    assert!(!ShareStatus::Pending.is_terminal());
    assert!(!ShareStatus::Viewed.is_terminal());
    assert!(ShareStatus::Accepted.is_terminal());
    assert!(ShareStatus::Rejected.is_terminal());
  }

  #[test]
  fn decision_maps_to_terminal_status() {
    assert_eq!(ShareDecision::Accepted.status(), ShareStatus::Accepted);
    assert_eq!(ShareDecision::Rejected.status(), ShareStatus::Rejected);
    assert!(ShareDecision::Accepted.status().is_terminal());
  }
}
