//! The punch terminal boundary.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{DeviceError, punch::RawPunch};

/// Connection settings for the terminal's REST API.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
  /// Scheme, host and optional port, e.g. `http://10.0.0.5:8081`.
  #[serde(alias = "ip_address")]
  pub base_url: String,
  pub username: String,
  pub password: String,
}

impl std::fmt::Debug for DeviceConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DeviceConfig")
      .field("base_url", &self.base_url)
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// A source of punch events.
pub trait PunchSource: Send + Sync + 'static {
  /// The most recent punch the terminal knows about, if any.
  fn fetch_latest(
    &self,
  ) -> impl Future<Output = Result<Option<RawPunch>, DeviceError>> + Send + '_;

  /// Replace the connection settings. Any cached credentials are discarded.
  fn configure(&self, config: DeviceConfig) -> impl Future<Output = ()> + Send + '_;

  /// Check that `config` is able to authenticate, without adopting it.
  fn test_connection(
    &self,
    config: DeviceConfig,
  ) -> impl Future<Output = Result<(), DeviceError>> + Send + '_;
}
