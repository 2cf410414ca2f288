//! Handlers for `/biotime` endpoints: device settings, connection checks,
//! on-demand processing and the audit trail.

use axum::{
  Json,
  extract::{Query, State},
};
use rollcall_core::{
  device::{DeviceConfig, PunchSource},
  notify::MessageSender,
  punch::TransactionLog,
  store::Store,
};
use rollcall_engine::Outcome;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::{ApiState, error::ApiError};

/// Default page size for `GET /biotime/logs`.
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// Device settings as shown to clients. The password never leaves the server.
#[derive(Debug, Serialize)]
pub struct PublicConfig {
  pub base_url: String,
  pub username: String,
}

impl From<DeviceConfig> for PublicConfig {
  fn from(c: DeviceConfig) -> Self { Self { base_url: c.base_url, username: c.username } }
}

fn check(config: &DeviceConfig) -> Result<(), ApiError> {
  if config.base_url.trim().is_empty() {
    return Err(ApiError::BadRequest("base_url is required".into()));
  }
  if config.username.is_empty() {
    return Err(ApiError::BadRequest("username is required".into()));
  }
  Ok(())
}

// ─── Config ──────────────────────────────────────────────────────────────────

/// `GET /biotime/config`; `{}` when nothing has been saved.
pub async fn get_config<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  let config = state.store.device_config().await.map_err(ApiError::store)?;
  let body = match config {
    Some(c) => json!(PublicConfig::from(c)),
    None => json!({}),
  };
  Ok(Json(body))
}

/// `POST /biotime/config`
///
/// Persists the settings and hands them to the running client, which drops
/// any token it holds.
pub async fn save_config<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Json(body): Json<DeviceConfig>,
) -> Result<Json<PublicConfig>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  check(&body)?;
  state
    .store
    .save_device_config(body.clone())
    .await
    .map_err(ApiError::store)?;
  info!(base_url = %body.base_url, "device configuration updated");
  state.pipeline.source().configure(body.clone()).await;
  Ok(Json(body.into()))
}

/// `POST /biotime/test`: authenticate with the supplied settings without
/// saving them.
pub async fn test_connection<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Json(body): Json<DeviceConfig>,
) -> Result<Json<Value>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  check(&body)?;
  state
    .pipeline
    .source()
    .test_connection(body)
    .await
    .map_err(|e| ApiError::Upstream(e.to_string()))?;
  Ok(Json(json!({ "success": true })))
}

// ─── Processing ──────────────────────────────────────────────────────────────

/// `POST /biotime/process`: run one pipeline cycle now.
pub async fn process<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
) -> Result<Json<Value>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  let body = match state.pipeline.run_once().await? {
    Outcome::Applied(transition) => json!(transition),
    Outcome::Idle => json!({ "message": "No new attendance to process" }),
    Outcome::Rejected(r) => json!({
      "message": "No new attendance to process",
      "reason":  r.describe(),
    }),
  };
  Ok(Json(body))
}

// ─── Logs ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LogParams {
  pub limit: Option<usize>,
}

/// `GET /biotime/logs[?limit=N]`, newest first.
pub async fn logs<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Query(params): Query<LogParams>,
) -> Result<Json<Vec<TransactionLog>>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT);
  let logs = state
    .store
    .list_transaction_logs(limit)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(logs))
}
