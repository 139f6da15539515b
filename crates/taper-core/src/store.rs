//! The `MeasurementStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `taper-store-sqlite`).
//! Higher layers (`taper-pipeline`, `taper-api`) depend on this abstraction,
//! not on any concrete backend.
//!
//! All operations return [`crate::Error`] so the caller can distinguish the
//! full failure taxonomy (not-found, forbidden, conflict, storage); backends
//! translate their internal failures into [`crate::Error::Storage`].
//!
//! Authorization is part of the contract: every mutating operation takes the
//! caller's claimed identity and re-checks it against the stored owner or
//! recipient — the store never trusts a cached role.

use std::future::Future;

use uuid::Uuid;

use crate::{
  Result,
  measurement::{Measurement, NewMeasurement},
  party::{NewProvider, NewSubject, Provider, Subject},
  share::{NewShare, ShareDecision, ShareView, SharedMeasurement},
};

/// Abstraction over a Taper storage backend.
///
/// Measurements are written exactly once; the only mutations are the
/// subject-authorized delete and the share workflow transitions. Share
/// transitions must be serialized per record (the SQLite backend uses an
/// optimistic precondition on the current status).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait MeasurementStore: Send + Sync {
  // ── Parties ───────────────────────────────────────────────────────────

  /// Register a subject. Fails with [`crate::Error::EmailTaken`] if the
  /// email is already registered.
  fn add_subject(
    &self,
    input: NewSubject,
  ) -> impl Future<Output = Result<Subject>> + Send + '_;

  /// Retrieve a subject by id. Returns `None` if not found.
  fn get_subject(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Subject>>> + Send + '_;

  fn list_subjects(&self) -> impl Future<Output = Result<Vec<Subject>>> + Send + '_;

  /// Register a provider. Fails with [`crate::Error::EmailTaken`] if the
  /// email is already registered.
  fn add_provider(
    &self,
    input: NewProvider,
  ) -> impl Future<Output = Result<Provider>> + Send + '_;

  /// Retrieve a provider by id. Returns `None` if not found.
  fn get_provider(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Provider>>> + Send + '_;

  fn list_providers(&self) -> impl Future<Output = Result<Vec<Provider>>> + Send + '_;

  // ── Measurements ──────────────────────────────────────────────────────

  /// Persist a freshly mapped pipeline result — single-shot, never partial.
  /// Timestamps and the id are assigned by the store.
  fn insert_measurement(
    &self,
    input: NewMeasurement,
  ) -> impl Future<Output = Result<Measurement>> + Send + '_;

  /// Retrieve a measurement by id. Returns `None` if not found.
  fn get_measurement(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Measurement>>> + Send + '_;

  /// All measurements, newest first. Administrative.
  fn list_measurements(
    &self,
  ) -> impl Future<Output = Result<Vec<Measurement>>> + Send + '_;

  /// A subject's measurements, newest first.
  fn list_measurements_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Measurement>>> + Send + '_;

  /// Delete a measurement and its share rows in one transaction.
  ///
  /// Only the owning subject may delete; anyone else fails with
  /// [`crate::Error::NotOwner`] and no data is touched. Returns the deleted
  /// record so the caller can remove the two staged image artifacts
  /// afterwards.
  fn delete_measurement(
    &self,
    id: Uuid,
    acting_subject: Uuid,
  ) -> impl Future<Output = Result<Measurement>> + Send + '_;

  // ── Shares ────────────────────────────────────────────────────────────

  /// Offer a measurement to a provider. Initial status is `pending`.
  ///
  /// Fails with [`crate::Error::NotOwner`] if the acting subject does not
  /// own the measurement, with a not-found error if the measurement or
  /// provider does not exist, and with [`crate::Error::AlreadyShared`] if a
  /// share already exists for this (measurement, provider) pair — regardless
  /// of its current status.
  fn create_share(
    &self,
    input: NewShare,
    acting_subject: Uuid,
  ) -> impl Future<Output = Result<SharedMeasurement>> + Send + '_;

  /// A subject's outgoing shares, newest first, with each provider resolved.
  fn list_shares_for_subject(
    &self,
    subject_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ShareView>>> + Send + '_;

  /// A provider's incoming shares, newest first, with the subject and the
  /// measurement resolved.
  fn list_shares_for_provider(
    &self,
    provider_id: Uuid,
  ) -> impl Future<Output = Result<Vec<ShareView>>> + Send + '_;

  /// The provider's first read of a pending share: `pending → viewed`, with
  /// `viewed_at` stamped. Idempotent once the share is `viewed` or beyond.
  fn view_share(
    &self,
    share_id: Uuid,
    acting_provider: Uuid,
  ) -> impl Future<Output = Result<SharedMeasurement>> + Send + '_;

  /// Accept or reject a share, optionally attaching provider notes.
  ///
  /// Allowed only from `pending` or `viewed`; a share already in a terminal
  /// state fails with [`crate::Error::ShareClosed`]. Concurrent racers are
  /// serialized by an optimistic precondition on the current status — the
  /// loser observes the terminal state, not a double transition.
  fn resolve_share(
    &self,
    share_id: Uuid,
    acting_provider: Uuid,
    decision: ShareDecision,
    provider_notes: Option<String>,
  ) -> impl Future<Output = Result<SharedMeasurement>> + Send + '_;
}
