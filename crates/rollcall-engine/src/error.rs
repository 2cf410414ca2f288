//! Error type for `rollcall-engine`.

use rollcall_core::DeviceError;
use thiserror::Error;

/// Failures that abort a reconciliation. Rejected punches are not errors;
/// they are reported as [`crate::Outcome::Rejected`].
#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Device(#[from] DeviceError),

  #[error("storage error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("person {0} not found")]
  PersonNotFound(i64),

  #[error("person {0} is already checked in")]
  AlreadyCheckedIn(i64),

  #[error("no active check-in found for person {0}")]
  NotCheckedIn(i64),
}

impl EngineError {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}
