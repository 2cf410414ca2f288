//! Tunables for the reconciliation engine.

use chrono::TimeDelta;
use serde::Deserialize;

/// Punches from the same person closer together than this are noise.
pub const DUPLICATE_WINDOW_SECS: u64 = 120;
/// Minimum gap between a check-out and the next check-in.
pub const GRACE_PERIOD_SECS: u64 = 120;
/// Punches further than this from the local clock are rejected.
pub const MAX_TIME_DIFF_SECS: u64 = 300;
/// Employee codes remembered by the duplicate guard before the oldest is evicted.
pub const CACHE_CAPACITY: usize = 4096;

/// Deserialised from the `[reconcile]` config section; every field is
/// optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileSettings {
  pub duplicate_window_secs: u64,
  pub grace_period_secs:     u64,
  pub max_time_diff_secs:    u64,
  pub cache_capacity:        usize,
}

impl Default for ReconcileSettings {
  fn default() -> Self {
    Self {
      duplicate_window_secs: DUPLICATE_WINDOW_SECS,
      grace_period_secs:     GRACE_PERIOD_SECS,
      max_time_diff_secs:    MAX_TIME_DIFF_SECS,
      cache_capacity:        CACHE_CAPACITY,
    }
  }
}

fn seconds(secs: u64) -> TimeDelta {
  TimeDelta::seconds(i64::try_from(secs).unwrap_or(i64::MAX).min(i64::MAX / 1000))
}

impl ReconcileSettings {
  pub fn duplicate_window(&self) -> TimeDelta { seconds(self.duplicate_window_secs) }

  pub fn grace_period(&self) -> TimeDelta { seconds(self.grace_period_secs) }

  pub fn max_time_diff(&self) -> TimeDelta { seconds(self.max_time_diff_secs) }
}
