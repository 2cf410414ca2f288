//! Server configuration, read from `config.toml` and `ROLLCALL__*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use rollcall_core::device::DeviceConfig;
use rollcall_engine::ReconcileSettings;
use rollcall_sms::SmsConfig;
use serde::Deserialize;

use crate::auth::AuthConfig;

// ─── Sections ────────────────────────────────────────────────────────────────

/// The `[poll]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollSettings {
  pub interval_secs:      u64,
  /// Cadence while the host is above `load_threshold`.
  pub busy_interval_secs: u64,
  pub load_check_secs:    u64,
  /// One-minute load average per CPU.
  pub load_threshold:     f64,
}

impl Default for PollSettings {
  fn default() -> Self {
    Self {
      interval_secs:      15,
      busy_interval_secs: 30,
      load_check_secs:    60,
      load_threshold:     0.8,
    }
  }
}

impl PollSettings {
  pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs.max(1)) }

  pub fn busy_interval(&self) -> Duration { Duration::from_secs(self.busy_interval_secs.max(1)) }

  pub fn load_check(&self) -> Duration { Duration::from_secs(self.load_check_secs.max(1)) }
}

fn default_device_timeout() -> u64 { 10 }

/// The optional `[device]` section. A configuration saved through the API
/// takes precedence.
#[derive(Clone, Deserialize)]
pub struct DeviceSettings {
  #[serde(alias = "ip_address")]
  pub base_url:     String,
  pub username:     String,
  pub password:     String,
  #[serde(default = "default_device_timeout")]
  pub timeout_secs: u64,
}

impl DeviceSettings {
  pub fn to_config(&self) -> DeviceConfig {
    DeviceConfig {
      base_url: self.base_url.clone(),
      username: self.username.clone(),
      password: self.password.clone(),
    }
  }
}

// ─── ServerConfig ────────────────────────────────────────────────────────────

/// Runtime server configuration. Every field has a default.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:               String,
  pub port:               u16,
  pub store_path:         PathBuf,
  pub static_dir:         PathBuf,
  pub auth_username:      Option<String>,
  pub auth_password_hash: Option<String>,
  pub poll:               PollSettings,
  pub reconcile:          ReconcileSettings,
  pub device:             Option<DeviceSettings>,
  pub sms:                Option<SmsConfig>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:               "0.0.0.0".to_string(),
      port:               3000,
      store_path:         PathBuf::from("rollcall.db"),
      static_dir:         PathBuf::from("public"),
      auth_username:      None,
      auth_password_hash: None,
      poll:               PollSettings::default(),
      reconcile:          ReconcileSettings::default(),
      device:             None,
      sms:                None,
    }
  }
}

impl ServerConfig {
  /// Layer `path` (if it exists) under the environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("ROLLCALL")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  /// Admin credentials, when both halves are configured.
  pub fn auth(&self) -> Option<AuthConfig> {
    match (&self.auth_username, &self.auth_password_hash) {
      (Some(username), Some(password_hash)) => Some(AuthConfig {
        username:      username.clone(),
        password_hash: password_hash.clone(),
      }),
      _ => None,
    }
  }

  pub fn device_timeout(&self) -> Duration {
    Duration::from_secs(
      self
        .device
        .as_ref()
        .map_or(default_device_timeout(), |d| d.timeout_secs),
    )
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
