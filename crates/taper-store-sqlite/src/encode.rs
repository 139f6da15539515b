//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings (which makes lexicographic
//! and chronological ordering coincide). The free-form metadata/confidence
//! records are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use taper_core::{
  Error, Result,
  measurement::{Measurement, Metrics},
  party::{Provider, Subject},
  share::{ShareStatus, SharedMeasurement},
};
use uuid::Uuid;

/// Wrap any backend-layer failure as a storage error.
pub fn storage(e: impl std::error::Error + Send + Sync + 'static) -> Error {
  Error::storage(e)
}

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Uuid::parse_str(s).map_err(storage)
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(storage)
}

// ─── ShareStatus ─────────────────────────────────────────────────────────────

pub fn encode_status(s: ShareStatus) -> &'static str {
  match s {
    ShareStatus::Pending => "pending",
    ShareStatus::Viewed => "viewed",
    ShareStatus::Accepted => "accepted",
    ShareStatus::Rejected => "rejected",
  }
}

pub fn decode_status(s: &str) -> Result<ShareStatus> {
  match s {
    "pending" => Ok(ShareStatus::Pending),
    "viewed" => Ok(ShareStatus::Viewed),
    "accepted" => Ok(ShareStatus::Accepted),
    "rejected" => Ok(ShareStatus::Rejected),
    other => Err(Error::storage(std::io::Error::new(
      std::io::ErrorKind::InvalidData,
      format!("unknown share status: {other:?}"),
    ))),
  }
}

// ─── Free-form JSON ──────────────────────────────────────────────────────────

pub fn encode_json(v: Option<&serde_json::Value>) -> Result<Option<String>> {
  v.map(serde_json::to_string).transpose().map_err(Error::from)
}

pub fn decode_json(s: Option<&str>) -> Result<Option<serde_json::Value>> {
  s.map(serde_json::from_str).transpose().map_err(Error::from)
}

// ─── Column lists ────────────────────────────────────────────────────────────

/// Prefix every column in a `*_COLS` list with a table alias, for joins where
/// column names collide across tables.
pub fn qualified(cols: &str, alias: &str) -> String {
  cols
    .split(',')
    .map(|c| format!("{alias}.{}", c.trim()))
    .collect::<Vec<_>>()
    .join(", ")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `subjects` row.
pub struct RawSubject {
  pub subject_id: String,
  pub name:       String,
  pub email:      String,
  pub created_at: String,
}

/// Column list matching [`read_subject`].
pub const SUBJECT_COLS: &str = "subject_id, name, email, created_at";

pub fn read_subject(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<RawSubject> {
  Ok(RawSubject {
    subject_id: row.get(base)?,
    name:       row.get(base + 1)?,
    email:      row.get(base + 2)?,
    created_at: row.get(base + 3)?,
  })
}

impl RawSubject {
  pub fn into_subject(self) -> Result<Subject> {
    Ok(Subject {
      subject_id: decode_uuid(&self.subject_id)?,
      name:       self.name,
      email:      self.email,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `providers` row.
pub struct RawProvider {
  pub provider_id: String,
  pub name:        String,
  pub email:       String,
  pub created_at:  String,
}

/// Column list matching [`read_provider`].
pub const PROVIDER_COLS: &str = "provider_id, name, email, created_at";

pub fn read_provider(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<RawProvider> {
  Ok(RawProvider {
    provider_id: row.get(base)?,
    name:        row.get(base + 1)?,
    email:       row.get(base + 2)?,
    created_at:  row.get(base + 3)?,
  })
}

impl RawProvider {
  pub fn into_provider(self) -> Result<Provider> {
    Ok(Provider {
      provider_id: decode_uuid(&self.provider_id)?,
      name:        self.name,
      email:       self.email,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `measurements` row. Metric columns come
/// out of SQLite as `Option<f64>` with no further decoding.
pub struct RawMeasurement {
  pub measurement_id: String,
  pub subject_id:     String,
  pub height:         f64,
  pub metrics:        Metrics,
  pub front_image:    String,
  pub side_image:     String,
  pub metadata:       Option<String>,
  pub confidence:     Option<String>,
  pub notes:          Option<String>,
  pub is_favorite:    bool,
  pub created_at:     String,
  pub updated_at:     String,
}

/// Column list matching [`read_measurement`]. Keep the metric order in sync.
pub const MEASUREMENT_COLS: &str = "measurement_id, subject_id, height, \
   shoulder_width, chest_circumference, waist_circumference, \
   hip_circumference, neck_circumference, bicep_circumference, \
   wrist_circumference, thigh_circumference, sleeve_length, \
   upper_arm_length, inseam, torso_length, \
   front_image, side_image, metadata, confidence, notes, is_favorite, \
   created_at, updated_at";

/// Number of columns consumed by [`read_measurement`].
pub const MEASUREMENT_COL_COUNT: usize = 23;

pub fn read_measurement(
  row: &rusqlite::Row<'_>,
  base: usize,
) -> rusqlite::Result<RawMeasurement> {
  Ok(RawMeasurement {
    measurement_id: row.get(base)?,
    subject_id:     row.get(base + 1)?,
    height:         row.get(base + 2)?,
    metrics:        Metrics {
      shoulder_width:      row.get(base + 3)?,
      chest_circumference: row.get(base + 4)?,
      waist_circumference: row.get(base + 5)?,
      hip_circumference:   row.get(base + 6)?,
      neck_circumference:  row.get(base + 7)?,
      bicep_circumference: row.get(base + 8)?,
      wrist_circumference: row.get(base + 9)?,
      thigh_circumference: row.get(base + 10)?,
      sleeve_length:       row.get(base + 11)?,
      upper_arm_length:    row.get(base + 12)?,
      inseam:              row.get(base + 13)?,
      torso_length:        row.get(base + 14)?,
    },
    front_image:    row.get(base + 15)?,
    side_image:     row.get(base + 16)?,
    metadata:       row.get(base + 17)?,
    confidence:     row.get(base + 18)?,
    notes:          row.get(base + 19)?,
    is_favorite:    row.get(base + 20)?,
    created_at:     row.get(base + 21)?,
    updated_at:     row.get(base + 22)?,
  })
}

impl RawMeasurement {
  pub fn into_measurement(self) -> Result<Measurement> {
    Ok(Measurement {
      measurement_id: decode_uuid(&self.measurement_id)?,
      subject_id:     decode_uuid(&self.subject_id)?,
      height:         self.height,
      metrics:        self.metrics,
      front_image:    self.front_image,
      side_image:     self.side_image,
      metadata:       decode_json(self.metadata.as_deref())?,
      confidence:     decode_json(self.confidence.as_deref())?,
      notes:          self.notes,
      is_favorite:    self.is_favorite,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw values read directly from a `shared_measurements` row.
pub struct RawShare {
  pub share_id:       String,
  pub subject_id:     String,
  pub measurement_id: String,
  pub provider_id:    String,
  pub status:         String,
  pub message:        Option<String>,
  pub provider_notes: Option<String>,
  pub viewed_at:      Option<String>,
  pub shared_at:      String,
}

/// Column list matching [`read_share`].
pub const SHARE_COLS: &str = "share_id, subject_id, measurement_id, \
   provider_id, status, message, provider_notes, viewed_at, shared_at";

/// Number of columns consumed by [`read_share`].
pub const SHARE_COL_COUNT: usize = 9;

pub fn read_share(row: &rusqlite::Row<'_>, base: usize) -> rusqlite::Result<RawShare> {
  Ok(RawShare {
    share_id:       row.get(base)?,
    subject_id:     row.get(base + 1)?,
    measurement_id: row.get(base + 2)?,
    provider_id:    row.get(base + 3)?,
    status:         row.get(base + 4)?,
    message:        row.get(base + 5)?,
    provider_notes: row.get(base + 6)?,
    viewed_at:      row.get(base + 7)?,
    shared_at:      row.get(base + 8)?,
  })
}

impl RawShare {
  pub fn into_share(self) -> Result<SharedMeasurement> {
    Ok(SharedMeasurement {
      share_id:       decode_uuid(&self.share_id)?,
      subject_id:     decode_uuid(&self.subject_id)?,
      measurement_id: decode_uuid(&self.measurement_id)?,
      provider_id:    decode_uuid(&self.provider_id)?,
      status:         decode_status(&self.status)?,
      message:        self.message,
      provider_notes: self.provider_notes,
      viewed_at:      self.viewed_at.as_deref().map(decode_dt).transpose()?,
      shared_at:      decode_dt(&self.shared_at)?,
    })
  }
}
