//! [`SqliteStore`] — the SQLite implementation of [`MeasurementStore`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use taper_core::{
  Error, Result,
  measurement::{Measurement, NewMeasurement},
  party::{NewProvider, NewSubject, Provider, Subject},
  share::{NewShare, ShareDecision, ShareStatus, ShareView, SharedMeasurement},
  store::MeasurementStore,
};

use crate::{
  encode::{
    MEASUREMENT_COLS, PROVIDER_COLS, RawMeasurement, RawProvider, RawShare,
    RawSubject, SHARE_COLS, SHARE_COL_COUNT, SUBJECT_COLS, encode_dt,
    encode_json, encode_status, encode_uuid, qualified, read_measurement,
    read_provider, read_share, read_subject, storage,
  },
  schema::SCHEMA,
};

/// True when the underlying SQLite error is a UNIQUE/constraint violation.
/// Used to turn insert races into the same conflict errors the prechecks
/// produce.
fn is_constraint_violation(e: &tokio_rusqlite::Error) -> bool {
  matches!(
    e,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(f, _))
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Taper store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(storage)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(storage)
  }

  /// Fetch a share row by id without any authorization check.
  async fn fetch_share(&self, share_id: Uuid) -> Result<Option<SharedMeasurement>> {
    let id_str = encode_uuid(share_id);
    let sql = format!(
      "SELECT {SHARE_COLS} FROM shared_measurements WHERE share_id = ?1"
    );

    let raw: Option<RawShare> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], |row| read_share(row, 0))
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawShare::into_share).transpose()
  }

  /// True when an email is already present in `table`.
  async fn email_taken(&self, table: &'static str, email: &str) -> Result<bool> {
    let email = email.to_owned();
    let sql = format!("SELECT 1 FROM {table} WHERE email = ?1");

    self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![email], |_| Ok(true))
            .optional()?
            .unwrap_or(false),
        )
      })
      .await
      .map_err(storage)
  }
}

// ─── MeasurementStore impl ───────────────────────────────────────────────────

impl MeasurementStore for SqliteStore {
  // ── Parties ───────────────────────────────────────────────────────────────

  async fn add_subject(&self, input: NewSubject) -> Result<Subject> {
    if self.email_taken("subjects", &input.email).await? {
      return Err(Error::EmailTaken(input.email));
    }

    let subject = Subject {
      subject_id: Uuid::new_v4(),
      name:       input.name,
      email:      input.email,
      created_at: Utc::now(),
    };

    let id_str = encode_uuid(subject.subject_id);
    let name = subject.name.clone();
    let email = subject.email.clone();
    let at_str = encode_dt(subject.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subjects (subject_id, name, email, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, email, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| {
        // An insert race slipped past the precheck.
        if is_constraint_violation(&e) {
          Error::EmailTaken(subject.email.clone())
        } else {
          storage(e)
        }
      })?;

    Ok(subject)
  }

  async fn get_subject(&self, id: Uuid) -> Result<Option<Subject>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {SUBJECT_COLS} FROM subjects WHERE subject_id = ?1");

    let raw: Option<RawSubject> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], |row| read_subject(row, 0))
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawSubject::into_subject).transpose()
  }

  async fn list_subjects(&self) -> Result<Vec<Subject>> {
    let sql = format!("SELECT {SUBJECT_COLS} FROM subjects ORDER BY created_at DESC");

    let raws: Vec<RawSubject> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| read_subject(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawSubject::into_subject).collect()
  }

  async fn add_provider(&self, input: NewProvider) -> Result<Provider> {
    if self.email_taken("providers", &input.email).await? {
      return Err(Error::EmailTaken(input.email));
    }

    let provider = Provider {
      provider_id: Uuid::new_v4(),
      name:        input.name,
      email:       input.email,
      created_at:  Utc::now(),
    };

    let id_str = encode_uuid(provider.provider_id);
    let name = provider.name.clone();
    let email = provider.email.clone();
    let at_str = encode_dt(provider.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO providers (provider_id, name, email, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, email, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| {
        if is_constraint_violation(&e) {
          Error::EmailTaken(provider.email.clone())
        } else {
          storage(e)
        }
      })?;

    Ok(provider)
  }

  async fn get_provider(&self, id: Uuid) -> Result<Option<Provider>> {
    let id_str = encode_uuid(id);
    let sql = format!("SELECT {PROVIDER_COLS} FROM providers WHERE provider_id = ?1");

    let raw: Option<RawProvider> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], |row| read_provider(row, 0))
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawProvider::into_provider).transpose()
  }

  async fn list_providers(&self) -> Result<Vec<Provider>> {
    let sql = format!("SELECT {PROVIDER_COLS} FROM providers ORDER BY created_at DESC");

    let raws: Vec<RawProvider> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| read_provider(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws.into_iter().map(RawProvider::into_provider).collect()
  }

  // ── Measurements ──────────────────────────────────────────────────────────

  async fn insert_measurement(&self, input: NewMeasurement) -> Result<Measurement> {
    let now = Utc::now();
    let measurement = Measurement {
      measurement_id: Uuid::new_v4(),
      subject_id:     input.subject_id,
      height:         input.height,
      metrics:        input.metrics,
      front_image:    input.front_image,
      side_image:     input.side_image,
      metadata:       input.metadata,
      confidence:     input.confidence,
      notes:          input.notes,
      is_favorite:    false,
      created_at:     now,
      updated_at:     now,
    };

    let id_str = encode_uuid(measurement.measurement_id);
    let subject_str = encode_uuid(measurement.subject_id);
    let height = measurement.height;
    let m = measurement.metrics;
    let front = measurement.front_image.clone();
    let side = measurement.side_image.clone();
    let metadata_str = encode_json(measurement.metadata.as_ref())?;
    let confidence_str = encode_json(measurement.confidence.as_ref())?;
    let notes = measurement.notes.clone();
    let at_str = encode_dt(now);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO measurements (
             measurement_id, subject_id, height,
             shoulder_width, chest_circumference, waist_circumference,
             hip_circumference, neck_circumference, bicep_circumference,
             wrist_circumference, thigh_circumference, sleeve_length,
             upper_arm_length, inseam, torso_length,
             front_image, side_image, metadata, confidence, notes,
             is_favorite, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                     ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
          rusqlite::params![
            id_str,
            subject_str,
            height,
            m.shoulder_width,
            m.chest_circumference,
            m.waist_circumference,
            m.hip_circumference,
            m.neck_circumference,
            m.bicep_circumference,
            m.wrist_circumference,
            m.thigh_circumference,
            m.sleeve_length,
            m.upper_arm_length,
            m.inseam,
            m.torso_length,
            front,
            side,
            metadata_str,
            confidence_str,
            notes,
            false,
            at_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(storage)?;

    Ok(measurement)
  }

  async fn get_measurement(&self, id: Uuid) -> Result<Option<Measurement>> {
    let id_str = encode_uuid(id);
    let sql = format!(
      "SELECT {MEASUREMENT_COLS} FROM measurements WHERE measurement_id = ?1"
    );

    let raw: Option<RawMeasurement> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], |row| {
              read_measurement(row, 0)
            })
            .optional()?,
        )
      })
      .await
      .map_err(storage)?;

    raw.map(RawMeasurement::into_measurement).transpose()
  }

  async fn list_measurements(&self) -> Result<Vec<Measurement>> {
    let sql = format!(
      "SELECT {MEASUREMENT_COLS} FROM measurements ORDER BY created_at DESC"
    );

    let raws: Vec<RawMeasurement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], |row| read_measurement(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws
      .into_iter()
      .map(RawMeasurement::into_measurement)
      .collect()
  }

  async fn list_measurements_for_subject(
    &self,
    subject_id: Uuid,
  ) -> Result<Vec<Measurement>> {
    let id_str = encode_uuid(subject_id);
    let sql = format!(
      "SELECT {MEASUREMENT_COLS} FROM measurements
       WHERE subject_id = ?1 ORDER BY created_at DESC"
    );

    let raws: Vec<RawMeasurement> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| read_measurement(row, 0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws
      .into_iter()
      .map(RawMeasurement::into_measurement)
      .collect()
  }

  async fn delete_measurement(
    &self,
    id: Uuid,
    acting_subject: Uuid,
  ) -> Result<Measurement> {
    let measurement = self
      .get_measurement(id)
      .await?
      .ok_or(Error::MeasurementNotFound(id))?;

    if measurement.subject_id != acting_subject {
      return Err(Error::NotOwner {
        measurement_id: id,
        subject_id:     acting_subject,
      });
    }

    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        // Shares first, then the record, atomically. Artifact removal is
        // the caller's step and must not be able to block this one.
        let tx = conn.transaction()?;
        tx.execute(
          "DELETE FROM shared_measurements WHERE measurement_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.execute(
          "DELETE FROM measurements WHERE measurement_id = ?1",
          rusqlite::params![id_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await
      .map_err(storage)?;

    Ok(measurement)
  }

  // ── Shares ────────────────────────────────────────────────────────────────

  async fn create_share(
    &self,
    input: NewShare,
    acting_subject: Uuid,
  ) -> Result<SharedMeasurement> {
    let measurement = self
      .get_measurement(input.measurement_id)
      .await?
      .ok_or(Error::MeasurementNotFound(input.measurement_id))?;

    if measurement.subject_id != acting_subject {
      return Err(Error::NotOwner {
        measurement_id: input.measurement_id,
        subject_id:     acting_subject,
      });
    }

    self
      .get_provider(input.provider_id)
      .await?
      .ok_or(Error::ProviderNotFound(input.provider_id))?;

    // One share per (measurement, provider) pair, in any status.
    let m_str = encode_uuid(input.measurement_id);
    let p_str = encode_uuid(input.provider_id);
    let exists: bool = self
      .conn
      .call({
        let (m_str, p_str) = (m_str.clone(), p_str.clone());
        move |conn| {
          Ok(
            conn
              .query_row(
                "SELECT 1 FROM shared_measurements
                 WHERE measurement_id = ?1 AND provider_id = ?2",
                rusqlite::params![m_str, p_str],
                |_| Ok(true),
              )
              .optional()?
              .unwrap_or(false),
          )
        }
      })
      .await
      .map_err(storage)?;

    if exists {
      return Err(Error::AlreadyShared {
        measurement_id: input.measurement_id,
        provider_id:    input.provider_id,
      });
    }

    let share = SharedMeasurement {
      share_id:       Uuid::new_v4(),
      subject_id:     acting_subject,
      measurement_id: input.measurement_id,
      provider_id:    input.provider_id,
      status:         ShareStatus::Pending,
      message:        input.message,
      provider_notes: None,
      viewed_at:      None,
      shared_at:      Utc::now(),
    };

    let id_str = encode_uuid(share.share_id);
    let s_str = encode_uuid(share.subject_id);
    let status_str = encode_status(share.status).to_owned();
    let message = share.message.clone();
    let at_str = encode_dt(share.shared_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO shared_measurements (
             share_id, subject_id, measurement_id, provider_id,
             status, message, shared_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![id_str, s_str, m_str, p_str, status_str, message, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(|e| {
        // The UNIQUE(measurement_id, provider_id) constraint backs the
        // precheck against concurrent creates.
        if is_constraint_violation(&e) {
          Error::AlreadyShared {
            measurement_id: share.measurement_id,
            provider_id:    share.provider_id,
          }
        } else {
          storage(e)
        }
      })?;

    Ok(share)
  }

  async fn list_shares_for_subject(&self, subject_id: Uuid) -> Result<Vec<ShareView>> {
    let id_str = encode_uuid(subject_id);
    let sql = format!(
      "SELECT {}, {} FROM shared_measurements s
       JOIN providers p ON p.provider_id = s.provider_id
       WHERE s.subject_id = ?1
       ORDER BY s.shared_at DESC",
      qualified(SHARE_COLS, "s"),
      qualified(PROVIDER_COLS, "p"),
    );

    let raws: Vec<(RawShare, RawProvider)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok((read_share(row, 0)?, read_provider(row, SHARE_COL_COUNT)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws
      .into_iter()
      .map(|(share, provider)| {
        Ok(ShareView {
          share:       share.into_share()?,
          provider:    Some(provider.into_provider()?),
          subject:     None,
          measurement: None,
        })
      })
      .collect()
  }

  async fn list_shares_for_provider(&self, provider_id: Uuid) -> Result<Vec<ShareView>> {
    let id_str = encode_uuid(provider_id);
    let sql = format!(
      "SELECT {}, {}, {} FROM shared_measurements s
       JOIN subjects u ON u.subject_id = s.subject_id
       JOIN measurements m ON m.measurement_id = s.measurement_id
       WHERE s.provider_id = ?1
       ORDER BY s.shared_at DESC",
      qualified(SHARE_COLS, "s"),
      qualified(SUBJECT_COLS, "u"),
      qualified(MEASUREMENT_COLS, "m"),
    );

    let raws: Vec<(RawShare, RawSubject, RawMeasurement)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            let share = read_share(row, 0)?;
            let subject = read_subject(row, SHARE_COL_COUNT)?;
            let measurement = read_measurement(row, SHARE_COL_COUNT + 4)?;
            Ok((share, subject, measurement))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(storage)?;

    raws
      .into_iter()
      .map(|(share, subject, measurement)| {
        Ok(ShareView {
          share:       share.into_share()?,
          provider:    None,
          subject:     Some(subject.into_subject()?),
          measurement: Some(measurement.into_measurement()?),
        })
      })
      .collect()
  }

  async fn view_share(
    &self,
    share_id: Uuid,
    acting_provider: Uuid,
  ) -> Result<SharedMeasurement> {
    let share = self
      .fetch_share(share_id)
      .await?
      .ok_or(Error::ShareNotFound(share_id))?;

    if share.provider_id != acting_provider {
      return Err(Error::NotRecipient {
        share_id,
        provider_id: acting_provider,
      });
    }

    if share.status != ShareStatus::Pending {
      // Already viewed or beyond; the first-view transition is idempotent.
      return Ok(share);
    }

    let id_str = encode_uuid(share_id);
    let at_str = encode_dt(Utc::now());
    self
      .conn
      .call(move |conn| {
        // Optimistic precondition: a racing accept/reject wins and this
        // update becomes a no-op.
        conn.execute(
          "UPDATE shared_measurements
           SET status = 'viewed', viewed_at = ?2
           WHERE share_id = ?1 AND status = 'pending'",
          rusqlite::params![id_str, at_str],
        )?;
        Ok(())
      })
      .await
      .map_err(storage)?;

    self
      .fetch_share(share_id)
      .await?
      .ok_or(Error::ShareNotFound(share_id))
  }

  async fn resolve_share(
    &self,
    share_id: Uuid,
    acting_provider: Uuid,
    decision: ShareDecision,
    provider_notes: Option<String>,
  ) -> Result<SharedMeasurement> {
    let share = self
      .fetch_share(share_id)
      .await?
      .ok_or(Error::ShareNotFound(share_id))?;

    if share.provider_id != acting_provider {
      return Err(Error::NotRecipient {
        share_id,
        provider_id: acting_provider,
      });
    }

    let id_str = encode_uuid(share_id);
    let status_str = encode_status(decision.status()).to_owned();
    let affected = self
      .conn
      .call(move |conn| {
        // Serialized per record: only one racer passes the status
        // precondition.
        Ok(conn.execute(
          "UPDATE shared_measurements
           SET status = ?2, provider_notes = COALESCE(?3, provider_notes)
           WHERE share_id = ?1 AND status IN ('pending', 'viewed')",
          rusqlite::params![id_str, status_str, provider_notes],
        )?)
      })
      .await
      .map_err(storage)?;

    if affected == 0 {
      let current = self
        .fetch_share(share_id)
        .await?
        .ok_or(Error::ShareNotFound(share_id))?;
      return Err(Error::ShareClosed {
        share_id,
        status: current.status,
      });
    }

    self
      .fetch_share(share_id)
      .await?
      .ok_or(Error::ShareNotFound(share_id))
  }
}
