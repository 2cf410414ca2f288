//! Attendance intervals and the check-in/check-out state they imply.
//!
//! An interval opens on check-in and closes on check-out. For any person at
//! most one interval may be open (have no check-out) at a time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::person::Role;

// ─── Status and state ────────────────────────────────────────────────────────

/// Tag assigned to an interval when it is opened.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AttendanceStatus {
  #[default]
  Present,
  Late,
  Absent,
}

/// Where a person currently stands, derived from their latest interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresenceState {
  CheckedIn,
  #[default]
  CheckedOut,
}

impl PresenceState {
  /// The transition a new punch triggers from this state.
  pub fn next_action(self) -> Action {
    match self {
      Self::CheckedOut => Action::CheckIn,
      Self::CheckedIn => Action::CheckOut,
    }
  }
}

/// A state transition applied to a person.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Action {
  CheckIn,
  CheckOut,
}

// ─── Intervals ───────────────────────────────────────────────────────────────

/// One presence period. Created by a check-in, closed by the matching
/// check-out, never deleted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceInterval {
  pub id:        i64,
  #[serde(rename = "user_id")]
  pub person_id: i64,
  pub check_in:  DateTime<Utc>,
  pub check_out: Option<DateTime<Utc>>,
  pub status:    AttendanceStatus,
}

impl AttendanceInterval {
  pub fn is_open(&self) -> bool { self.check_out.is_none() }

  /// The presence state this interval implies when it is the latest one.
  pub fn state(&self) -> PresenceState {
    if self.is_open() {
      PresenceState::CheckedIn
    } else {
      PresenceState::CheckedOut
    }
  }
}

/// Input to [`crate::store::AttendanceStore::begin_interval`].
#[derive(Debug, Clone)]
pub struct NewInterval {
  pub person_id: i64,
  pub check_in:  DateTime<Utc>,
  pub status:    AttendanceStatus,
}

impl NewInterval {
  /// A device-driven check-in; always tagged [`AttendanceStatus::Present`].
  pub fn present(person_id: i64, check_in: DateTime<Utc>) -> Self {
    Self { person_id, check_in, status: AttendanceStatus::Present }
  }
}

// ─── Read model ──────────────────────────────────────────────────────────────

/// An interval joined with the person it belongs to, as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
  #[serde(flatten)]
  pub interval:  AttendanceInterval,
  pub user_name: String,
  pub user_role: Role,
  /// Hours between check-in and check-out, formatted like `"7.50h"`.
  pub duration:  Option<String>,
}

impl AttendanceRecord {
  pub fn new(interval: AttendanceInterval, user_name: String, user_role: Role) -> Self {
    let duration = interval.check_out.map(|out| {
      let hours = (out - interval.check_in).num_seconds() as f64 / 3600.0;
      format!("{hours:.2}h")
    });
    Self { interval, user_name, user_role, duration }
  }
}

/// Filters for [`crate::store::AttendanceStore::list_attendance`].
#[derive(Debug, Clone, Default)]
pub struct AttendanceQuery {
  /// Inclusive lower bound on the check-in date.
  pub start_date: Option<NaiveDate>,
  /// Inclusive upper bound on the check-in date.
  pub end_date:   Option<NaiveDate>,
  pub person_id:  Option<i64>,
  pub status:     Option<AttendanceStatus>,
  pub limit:      Option<usize>,
}
