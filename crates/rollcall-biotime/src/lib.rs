//! HTTP client for the BioTime punch terminal API.
//!
//! Authenticates with `POST /jwt-api-token-auth/`, caches the returned token
//! and reads the newest punch with
//! `GET /iclock/api/transactions/?limit=1&ordering=-punch_time`. A rejected
//! token triggers exactly one transparent re-authentication.

mod wire;

use std::time::Duration;

use reqwest::{Client, StatusCode, header::AUTHORIZATION};
use rollcall_core::{
  DeviceError,
  device::{DeviceConfig, PunchSource},
  punch::RawPunch,
};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

pub use wire::parse_punch_time;
use wire::{TokenRequest, TokenResponse, TransactionPage};

const TOKEN_PATH: &str = "/jwt-api-token-auth/";
const TRANSACTIONS_PATH: &str = "/iclock/api/transactions/";

/// Outcome of a single transactions request.
enum Fetched {
  Page(TransactionPage),
  Unauthorized,
}

/// Async client for one BioTime server.
///
/// The connection settings can be swapped at runtime with
/// [`PunchSource::configure`]; doing so drops the cached token.
pub struct BioTimeClient {
  http:   Client,
  config: RwLock<Option<DeviceConfig>>,
  /// Ready-to-send `Authorization` header value, e.g. `JWT eyJ...`.
  token:  Mutex<Option<String>>,
}

impl BioTimeClient {
  /// `timeout` bounds every request, so a hung terminal cannot stall a poll
  /// cycle indefinitely.
  pub fn new(config: Option<DeviceConfig>, timeout: Duration) -> Result<Self, DeviceError> {
    let http = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| DeviceError::Transport(Box::new(e)))?;
    Ok(Self {
      http,
      config: RwLock::new(config),
      token: Mutex::new(None),
    })
  }

  fn url(config: &DeviceConfig, path: &str) -> String {
    format!("{}{}", config.base_url.trim_end_matches('/'), path)
  }

  /// Exchange credentials for a token and return the header value to send.
  pub async fn authenticate(&self, config: &DeviceConfig) -> Result<String, DeviceError> {
    let resp = self
      .http
      .post(Self::url(config, TOKEN_PATH))
      .json(&TokenRequest {
        username: &config.username,
        password: &config.password,
      })
      .send()
      .await
      .map_err(|e| DeviceError::Auth(format!("cannot reach {}: {e}", config.base_url)))?;

    if !resp.status().is_success() {
      return Err(DeviceError::Auth(format!(
        "credentials rejected with status {}",
        resp.status().as_u16()
      )));
    }

    let body: TokenResponse = resp
      .json()
      .await
      .map_err(|e| DeviceError::Decode(e.to_string()))?;

    match body.token {
      Some(token) if !token.is_empty() => Ok(format!("JWT {token}")),
      _ => Err(DeviceError::Auth("invalid token response".into())),
    }
  }

  async fn current_config(&self) -> Result<DeviceConfig, DeviceError> {
    self
      .config
      .read()
      .await
      .clone()
      .ok_or(DeviceError::NotConfigured)
  }

  /// The cached token, authenticating first if there is none.
  async fn token(&self, config: &DeviceConfig) -> Result<String, DeviceError> {
    let mut cached = self.token.lock().await;
    if let Some(token) = cached.as_ref() {
      return Ok(token.clone());
    }
    let fresh = self.authenticate(config).await?;
    *cached = Some(fresh.clone());
    Ok(fresh)
  }

  async fn refresh_token(&self, config: &DeviceConfig) -> Result<String, DeviceError> {
    let mut cached = self.token.lock().await;
    *cached = None;
    let fresh = self.authenticate(config).await?;
    *cached = Some(fresh.clone());
    Ok(fresh)
  }

  async fn request_latest(
    &self,
    config: &DeviceConfig,
    token:  &str,
  ) -> Result<Fetched, DeviceError> {
    let resp = self
      .http
      .get(Self::url(config, TRANSACTIONS_PATH))
      .header(AUTHORIZATION, token)
      .query(&[("limit", "1"), ("ordering", "-punch_time")])
      .send()
      .await
      .map_err(|e| DeviceError::Transport(Box::new(e)))?;

    match resp.status() {
      StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(Fetched::Unauthorized),
      status if !status.is_success() => Err(DeviceError::Status(status.as_u16())),
      _ => {
        let page = resp
          .json()
          .await
          .map_err(|e| DeviceError::Decode(e.to_string()))?;
        Ok(Fetched::Page(page))
      }
    }
  }
}

impl PunchSource for BioTimeClient {
  async fn fetch_latest(&self) -> Result<Option<RawPunch>, DeviceError> {
    let config = self.current_config().await?;
    let token = self.token(&config).await?;

    let page = match self.request_latest(&config, &token).await? {
      Fetched::Page(page) => page,
      Fetched::Unauthorized => {
        debug!("device token rejected, re-authenticating");
        let token = self.refresh_token(&config).await?;
        match self.request_latest(&config, &token).await? {
          Fetched::Page(page) => page,
          Fetched::Unauthorized => {
            self.token.lock().await.take();
            return Err(DeviceError::Auth(
              "token rejected after re-authentication".into(),
            ));
          }
        }
      }
    };

    page.into_latest()
  }

  async fn configure(&self, config: DeviceConfig) {
    let mut token = self.token.lock().await;
    *self.config.write().await = Some(config);
    *token = None;
  }

  async fn test_connection(&self, config: DeviceConfig) -> Result<(), DeviceError> {
    self
      .authenticate(&config)
      .await
      .inspect_err(|e| warn!(base_url = %config.base_url, "device connection test failed: {e}"))
      .map(|_| ())
  }
}
