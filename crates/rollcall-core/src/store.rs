//! Storage traits.
//!
//! [`AttendanceStore`] is everything the reconciliation engine needs;
//! [`DirectoryStore`] covers the admin-only people and device-config CRUD.
//! Backends (e.g. `rollcall-store-sqlite`) implement both, and the HTTP layer
//! depends on the combined [`Store`] bound.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  attendance::{AttendanceInterval, AttendanceQuery, AttendanceRecord, NewInterval},
  device::DeviceConfig,
  person::{NewPerson, Person, PersonMatch},
  punch::{NewTransactionLog, TransactionLog},
};

/// Reads and writes behind the check-in/check-out state machine.
pub trait AttendanceStore: Send + Sync + 'static {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── People ────────────────────────────────────────────────────────────

  fn get_person(
    &self,
    id: i64,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Resolve a terminal employee code: badge number first, then numeric id.
  fn find_person_by_code(
    &self,
    code: String,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  // ── Intervals ─────────────────────────────────────────────────────────

  /// The person's interval with the latest check-in, open or closed.
  fn latest_interval(
    &self,
    person_id: i64,
  ) -> impl Future<Output = Result<Option<AttendanceInterval>, Self::Error>> + Send + '_;

  /// Atomically open a new interval. Returns `None` without writing if the
  /// person already has an open interval.
  fn begin_interval(
    &self,
    input: NewInterval,
  ) -> impl Future<Output = Result<Option<AttendanceInterval>, Self::Error>> + Send + '_;

  /// Set the check-out of the person's single open interval. Returns `None`
  /// without writing if there is no open interval.
  fn close_interval(
    &self,
    person_id: i64,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<AttendanceInterval>, Self::Error>> + Send + '_;

  fn list_attendance(
    &self,
    query: AttendanceQuery,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  // ── Audit trail ───────────────────────────────────────────────────────

  fn append_transaction_log(
    &self,
    input: NewTransactionLog,
  ) -> impl Future<Output = Result<TransactionLog, Self::Error>> + Send + '_;

  /// Most recent rows first.
  fn list_transaction_logs(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<TransactionLog>, Self::Error>> + Send + '_;
}

/// Admin CRUD over people and device settings.
pub trait DirectoryStore: AttendanceStore {
  fn add_person(
    &self,
    input: NewPerson,
  ) -> impl Future<Output = Result<Person, Self::Error>> + Send + '_;

  /// All people, ordered by name.
  fn list_people(&self) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + '_;

  /// Replace a person's editable fields. Returns `None` if not found.
  fn update_person(
    &self,
    id: i64,
    input: NewPerson,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  /// Delete a person and their attendance. Returns `false` if not found.
  fn delete_person(&self, id: i64) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Search ────────────────────────────────────────────────────────────

  /// People whose name, email or badge number contains `text`, ordered by
  /// name.
  fn search_people(
    &self,
    text: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<PersonMatch>, Self::Error>> + Send + '_;

  /// Intervals whose person's name or status contains `text`, or whose
  /// check-in falls on the `YYYY-MM-DD` date `text` names. Newest first.
  fn search_attendance(
    &self,
    text: String,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<AttendanceRecord>, Self::Error>> + Send + '_;

  // ── Device ────────────────────────────────────────────────────────────

  /// The most recently saved device configuration.
  fn device_config(
    &self,
  ) -> impl Future<Output = Result<Option<DeviceConfig>, Self::Error>> + Send + '_;

  fn save_device_config(
    &self,
    config: DeviceConfig,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Convenience bound for backends that provide both traits.
pub trait Store: DirectoryStore {}

impl<T: DirectoryStore> Store for T {}
