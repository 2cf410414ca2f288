//! SMS gateway client used to message guardians.
//!
//! Posts a `SendSms` JSON command to the configured gateway. Without a gateway
//! configuration the sender only logs what it would have sent.

use std::time::Duration;

use reqwest::Client;
use rollcall_core::{NotifyError, notify::MessageSender};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

fn default_sender_id() -> String { "Rollcall".to_owned() }

fn default_timeout_secs() -> u64 { 10 }

/// Gateway settings, deserialised from the `[sms]` config section.
#[derive(Clone, Deserialize)]
pub struct SmsConfig {
  pub api_url:      String,
  pub username:     String,
  pub password:     String,
  #[serde(default = "default_sender_id")]
  pub sender_id:    String,
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

impl std::fmt::Debug for SmsConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SmsConfig")
      .field("api_url", &self.api_url)
      .field("username", &self.username)
      .field("sender_id", &self.sender_id)
      .finish_non_exhaustive()
  }
}

// ─── Wire format ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct SendSms<'a> {
  method:   &'static str,
  userdata: UserData<'a>,
  msgdata:  [MsgData<'a>; 1],
}

#[derive(Serialize)]
struct UserData<'a> {
  username: &'a str,
  password: &'a str,
}

#[derive(Serialize)]
struct MsgData<'a> {
  number:   &'a str,
  message:  &'a str,
  senderid: &'a str,
  priority: &'static str,
}

// ─── Sender ──────────────────────────────────────────────────────────────────

pub struct SmsSender {
  http:   Client,
  config: Option<SmsConfig>,
}

impl SmsSender {
  pub fn new(config: Option<SmsConfig>) -> Result<Self, NotifyError> {
    let timeout = config.as_ref().map_or(default_timeout_secs(), |c| c.timeout_secs);
    let http = Client::builder()
      .timeout(Duration::from_secs(timeout))
      .build()
      .map_err(|e| NotifyError::Transport(Box::new(e)))?;
    Ok(Self { http, config })
  }

  /// A sender that only logs; used when no gateway is configured.
  pub fn disabled() -> Result<Self, NotifyError> { Self::new(None) }
}

impl MessageSender for SmsSender {
  async fn send_message(
    &self,
    destination: String,
    text: String,
  ) -> Result<serde_json::Value, NotifyError> {
    let Some(config) = &self.config else {
      info!(%destination, "sms gateway not configured, not sending: {text}");
      return Ok(serde_json::Value::Null);
    };

    let payload = SendSms {
      method:   "SendSms",
      userdata: UserData {
        username: &config.username,
        password: &config.password,
      },
      msgdata:  [MsgData {
        number:   &destination,
        message:  &text,
        senderid: &config.sender_id,
        priority: "0",
      }],
    };

    let resp = self
      .http
      .post(&config.api_url)
      .json(&payload)
      .send()
      .await
      .map_err(|e| NotifyError::Transport(Box::new(e)))?;

    let status = resp.status();
    if !status.is_success() {
      return Err(NotifyError::Rejected(status.as_u16()));
    }

    // Gateways are inconsistent about bodies; keep whatever came back.
    let body = resp
      .text()
      .await
      .map_err(|e| NotifyError::Transport(Box::new(e)))?;
    let value = serde_json::from_str(&body).unwrap_or(serde_json::Value::String(body));
    debug!(%destination, response = %value, "sms sent");
    Ok(value)
  }
}

#[cfg(test)]
mod tests {
  use httpmock::{Method::POST, MockServer};
  use serde_json::json;

  use super::*;

  fn sender(server: &MockServer) -> SmsSender {
    SmsSender::new(Some(SmsConfig {
      api_url:      server.url("/api/sms"),
      username:     "school".into(),
      password:     "pw".into(),
      sender_id:    "Lyee".into(),
      timeout_secs: 5,
    }))
    .unwrap()
  }

  #[tokio::test]
  async fn posts_send_sms_command() {
    let server = MockServer::start_async().await;
    let gateway = server
      .mock_async(|when, then| {
        when.method(POST).path("/api/sms").json_body(json!({
          "method": "SendSms",
          "userdata": { "username": "school", "password": "pw" },
          "msgdata": [{
            "number": "+255700000001",
            "message": "hello",
            "senderid": "Lyee",
            "priority": "0",
          }],
        }));
        then.status(200).json_body(json!({ "status": "ok", "id": 99 }));
      })
      .await;

    let resp = sender(&server)
      .send_message("+255700000001".into(), "hello".into())
      .await
      .unwrap();
    gateway.assert_async().await;
    assert_eq!(resp["id"], 99);
  }

  #[tokio::test]
  async fn gateway_failure_is_reported() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(POST).path("/api/sms");
        then.status(503);
      })
      .await;

    let err = sender(&server)
      .send_message("+255700000001".into(), "hello".into())
      .await
      .unwrap_err();
    assert!(matches!(err, NotifyError::Rejected(503)));
  }

  #[tokio::test]
  async fn disabled_sender_succeeds_without_network() {
    let resp = SmsSender::disabled()
      .unwrap()
      .send_message("+255700000001".into(), "hello".into())
      .await
      .unwrap();
    assert!(resp.is_null());
  }
}
