//! Request and response shapes of the BioTime REST API.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use rollcall_core::{DeviceError, punch::RawPunch};
use serde::{Deserialize, Serialize};

/// Body of `POST /jwt-api-token-auth/`.
#[derive(Debug, Serialize)]
pub struct TokenRequest<'a> {
  pub username: &'a str,
  pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
  pub token: Option<String>,
}

/// One page of `GET /iclock/api/transactions/`.
#[derive(Debug, Deserialize)]
pub struct TransactionPage {
  #[serde(default)]
  pub results: Vec<TransactionRow>,
}

#[derive(Debug, Deserialize)]
pub struct TransactionRow {
  pub emp_code:   String,
  pub punch_time: String,
  #[serde(default, alias = "terminal_sn")]
  pub device_sn:  Option<String>,
}

impl TransactionPage {
  pub fn into_latest(self) -> Result<Option<RawPunch>, DeviceError> {
    self
      .results
      .into_iter()
      .next()
      .map(TransactionRow::into_punch)
      .transpose()
  }
}

impl TransactionRow {
  pub fn into_punch(self) -> Result<RawPunch, DeviceError> {
    Ok(RawPunch {
      punch_time: parse_punch_time(&self.punch_time)?,
      emp_code:   self.emp_code,
      device_sn:  self.device_sn.filter(|sn| !sn.is_empty()),
    })
  }
}

/// The terminal reports either RFC 3339 or a zone-less `YYYY-MM-DD HH:MM:SS`
/// in its own (and our) local time.
pub fn parse_punch_time(s: &str) -> Result<DateTime<Utc>, DeviceError> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Ok(dt.with_timezone(&Utc));
  }

  let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
    .map_err(|e| DeviceError::Decode(format!("punch_time {s:?}: {e}")))?;

  Local
    .from_local_datetime(&naive)
    .earliest()
    .map(|dt| dt.with_timezone(&Utc))
    .ok_or_else(|| DeviceError::Decode(format!("punch_time {s:?} does not exist locally")))
}
