//! The two party kinds of the service.
//!
//! A subject owns measurements; a provider receives shares of them. Both are
//! thin profile envelopes — everything interesting about a subject lives in
//! their measurements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The end user whose body is measured.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
  pub subject_id: Uuid,
  pub name:       String,
  /// Unique across subjects.
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

/// The service professional a measurement may be shared with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
  pub provider_id: Uuid,
  pub name:        String,
  /// Unique across providers.
  pub email:       String,
  pub created_at:  DateTime<Utc>,
}

/// Input for registering a subject.
#[derive(Debug, Clone, Deserialize)]
pub struct NewSubject {
  pub name:  String,
  pub email: String,
}

/// Input for registering a provider.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProvider {
  pub name:  String,
  pub email: String,
}
