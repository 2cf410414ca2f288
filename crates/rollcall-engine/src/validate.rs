//! Timestamp plausibility check applied before a punch reaches the
//! reconciler.

use chrono::{DateTime, TimeDelta, Utc};
use rollcall_core::punch::RawPunch;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct Validator {
  max_time_diff: TimeDelta,
}

impl Validator {
  pub fn new(max_time_diff: TimeDelta) -> Self { Self { max_time_diff } }

  /// `false` for punches too far from `now` in either direction, and for any
  /// punch from the future. Rejections are logged, never raised.
  pub fn validate(&self, punch: &RawPunch, now: DateTime<Utc>) -> bool {
    let diff = now - punch.punch_time;

    if diff.abs() > self.max_time_diff {
      warn!(
        emp_code = %punch.emp_code,
        punch_time = %punch.punch_time,
        "punch timestamp outside accepted window"
      );
      return false;
    }

    if punch.punch_time > now {
      warn!(
        emp_code = %punch.emp_code,
        punch_time = %punch.punch_time,
        "punch timestamp is in the future"
      );
      return false;
    }

    true
  }
}
