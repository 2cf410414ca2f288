//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings with a fixed millisecond
//! precision so that lexical ordering in SQL matches chronological ordering.
//! Values handed back from a write go through [`stored_dt`] so they equal what
//! a later read returns.
//! Enums are stored as their lowercase / kebab-case names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rollcall_core::{
  attendance::{AttendanceInterval, AttendanceRecord},
  device::DeviceConfig,
  person::Person,
  punch::TransactionLog,
};

use crate::{Error, Result};

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

/// `dt` at the precision it is stored with.
pub fn stored_dt(dt: DateTime<Utc>) -> DateTime<Utc> { dt.trunc_subsecs(3) }

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  stored_dt(dt).to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── LIKE patterns ───────────────────────────────────────────────────────────

/// A `LIKE ... ESCAPE '\'` pattern matching any value that contains `text`.
pub fn like_pattern(text: &str) -> String {
  let mut out = String::with_capacity(text.len() + 2);
  out.push('%');
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      out.push('\\');
    }
    out.push(c);
  }
  out.push('%');
  out
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const PERSON_COLUMNS: &str =
  "id, name, email, phone, role, guardian_phone, badge_number, created_at";

/// Raw values read directly from a `users` row.
pub struct RawPerson {
  pub id:             i64,
  pub name:           String,
  pub email:          String,
  pub phone:          Option<String>,
  pub role:           String,
  pub guardian_phone: Option<String>,
  pub badge_number:   Option<String>,
  pub created_at:     String,
}

impl RawPerson {
  /// Map a row selected with [`PERSON_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      email:          row.get(2)?,
      phone:          row.get(3)?,
      role:           row.get(4)?,
      guardian_phone: row.get(5)?,
      badge_number:   row.get(6)?,
      created_at:     row.get(7)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    Ok(Person {
      id:             self.id,
      name:           self.name,
      email:          self.email,
      phone:          self.phone,
      role:           decode_enum("role", &self.role)?,
      guardian_phone: self.guardian_phone,
      badge_number:   self.badge_number,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

pub const INTERVAL_COLUMNS: &str = "id, user_id, check_in, check_out, status";

/// Raw values read directly from an `attendance` row.
pub struct RawInterval {
  pub id:        i64,
  pub person_id: i64,
  pub check_in:  String,
  pub check_out: Option<String>,
  pub status:    String,
}

impl RawInterval {
  /// Map a row selected with [`INTERVAL_COLUMNS`], starting at `offset`.
  pub fn from_row(row: &rusqlite::Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(offset)?,
      person_id: row.get(offset + 1)?,
      check_in:  row.get(offset + 2)?,
      check_out: row.get(offset + 3)?,
      status:    row.get(offset + 4)?,
    })
  }

  pub fn into_interval(self) -> Result<AttendanceInterval> {
    Ok(AttendanceInterval {
      id:        self.id,
      person_id: self.person_id,
      check_in:  decode_dt(&self.check_in)?,
      check_out: self.check_out.as_deref().map(decode_dt).transpose()?,
      status:    decode_enum("status", &self.status)?,
    })
  }
}

/// An `attendance` row joined with its owner's name and role.
pub struct RawRecord {
  pub interval:  RawInterval,
  pub user_name: String,
  pub user_role: String,
}

impl RawRecord {
  pub fn into_record(self) -> Result<AttendanceRecord> {
    Ok(AttendanceRecord::new(
      self.interval.into_interval()?,
      self.user_name,
      decode_enum("role", &self.user_role)?,
    ))
  }
}

pub const LOG_COLUMNS: &str =
  "id, emp_code, punch_time, action, status, reason, device_sn, created_at";

/// Raw values read directly from a `transaction_logs` row.
pub struct RawLog {
  pub id:         i64,
  pub emp_code:   String,
  pub punch_time: String,
  pub action:     Option<String>,
  pub status:     String,
  pub reason:     Option<String>,
  pub device_sn:  String,
  pub created_at: String,
}

impl RawLog {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      emp_code:   row.get(1)?,
      punch_time: row.get(2)?,
      action:     row.get(3)?,
      status:     row.get(4)?,
      reason:     row.get(5)?,
      device_sn:  row.get(6)?,
      created_at: row.get(7)?,
    })
  }

  pub fn into_log(self) -> Result<TransactionLog> {
    Ok(TransactionLog {
      id:         self.id,
      emp_code:   self.emp_code,
      punch_time: decode_dt(&self.punch_time)?,
      action:     self
        .action
        .as_deref()
        .map(|a| decode_enum("action", a))
        .transpose()?,
      status:     decode_enum("status", &self.status)?,
      reason:     self.reason,
      device_sn:  self.device_sn,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `device_config` row.
pub struct RawDeviceConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

impl From<RawDeviceConfig> for DeviceConfig {
  fn from(raw: RawDeviceConfig) -> Self {
    DeviceConfig {
      base_url: raw.base_url,
      username: raw.username,
      password: raw.password,
    }
  }
}
