//! Error types for the external boundaries of the engine.

use thiserror::Error;

/// Failure talking to the punch terminal.
#[derive(Debug, Error)]
pub enum DeviceError {
  /// Bad credentials, an unreachable host during authentication, or a token
  /// that is still rejected after re-authenticating.
  #[error("device authentication failed: {0}")]
  Auth(String),

  #[error("device transport error: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("device returned an unexpected status: {0}")]
  Status(u16),

  #[error("could not decode device response: {0}")]
  Decode(String),

  #[error("no device configuration available")]
  NotConfigured,
}

/// Failure delivering an outbound guardian message.
#[derive(Debug, Error)]
pub enum NotifyError {
  #[error("message transport error: {0}")]
  Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("gateway rejected message with status {0}")]
  Rejected(u16),
}
