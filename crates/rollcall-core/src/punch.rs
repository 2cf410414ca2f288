//! Punch events reported by the terminal and the audit trail they leave.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::Action;

/// Device label recorded for operator-initiated transitions.
pub const MANUAL_DEVICE: &str = "manual";

/// A single timestamped presence event from the terminal. Transient: only the
/// transition it causes is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPunch {
  pub emp_code:   String,
  pub punch_time: DateTime<Utc>,
  pub device_sn:  Option<String>,
}

/// Outcome recorded for a punch in the audit trail.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogStatus {
  Success,
  Rejected,
}

/// An append-only audit row. Never updated once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionLog {
  pub id:         i64,
  pub emp_code:   String,
  pub punch_time: DateTime<Utc>,
  pub action:     Option<Action>,
  pub status:     LogStatus,
  pub reason:     Option<String>,
  pub device_sn:  String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::AttendanceStore::append_transaction_log`].
#[derive(Debug, Clone)]
pub struct NewTransactionLog {
  pub emp_code:   String,
  pub punch_time: DateTime<Utc>,
  pub action:     Option<Action>,
  pub status:     LogStatus,
  pub reason:     Option<String>,
  /// Falls back to `"unknown"` when the terminal did not report one.
  pub device_sn:  Option<String>,
}
