//! In-process tests driving the router with `tower::ServiceExt::oneshot`.

use std::sync::{Arc, Mutex};

use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{TimeDelta, Utc};
use rollcall_core::{
  DeviceError, NotifyError,
  device::{DeviceConfig, PunchSource},
  notify::MessageSender,
  punch::RawPunch,
};
use rollcall_engine::{Pipeline, ReconcileSettings};
use rollcall_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, api_router};

// ─── Fakes ───────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeDevice {
  next:       Mutex<Option<RawPunch>>,
  configured: Mutex<Vec<DeviceConfig>>,
}

impl PunchSource for FakeDevice {
  async fn fetch_latest(&self) -> Result<Option<RawPunch>, DeviceError> {
    let next = self.next.lock().unwrap().take();
    Ok(next)
  }

  async fn configure(&self, config: DeviceConfig) { self.configured.lock().unwrap().push(config); }

  async fn test_connection(&self, config: DeviceConfig) -> Result<(), DeviceError> {
    if config.password == "secret" {
      Ok(())
    } else {
      Err(DeviceError::Auth("bad credentials".into()))
    }
  }
}

struct NullSender;

impl MessageSender for NullSender {
  async fn send_message(&self, _: String, _: String) -> Result<Value, NotifyError> {
    Ok(Value::Null)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

struct App {
  router: Router,
  device: Arc<FakeDevice>,
}

async fn app() -> App {
  let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
  let device = Arc::new(FakeDevice::default());
  let pipeline = Arc::new(Pipeline::new(
    store.clone(),
    device.clone(),
    Arc::new(NullSender),
    &ReconcileSettings::default(),
  ));
  App { router: api_router(ApiState { store, pipeline }), device }
}

async fn call(app: &App, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };
  let resp = app
    .router
    .clone()
    .oneshot(builder.body(body).unwrap())
    .await
    .unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let json = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or_else(|_| {
      Value::String(String::from_utf8_lossy(&bytes).into_owned())
    })
  };
  (status, json)
}

async fn create_student(app: &App, name: &str) -> i64 {
  let (status, body) = call(
    app,
    "POST",
    "/users",
    Some(json!({
      "name": name,
      "email": format!("{}@example.com", name.to_lowercase()),
      "role": "student",
      "parent_phone": "+255700000001",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["id"].as_i64().unwrap()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn user_crud_round_trip() {
  let app = app().await;
  let id = create_student(&app, "Amani").await;

  let (status, body) = call(&app, "GET", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Amani");
  assert_eq!(body["role"], "student");
  assert_eq!(body["guardian_phone"], "+255700000001");

  let (status, body) = call(
    &app,
    "PUT",
    &format!("/users/{id}"),
    Some(json!({ "name": "Amani J", "email": "amani@example.com", "role": "student" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["name"], "Amani J");
  assert_eq!(body["guardian_phone"], Value::Null);

  let (_, list) = call(&app, "GET", "/users", None).await;
  assert_eq!(list.as_array().unwrap().len(), 1);

  let (status, _) = call(&app, "DELETE", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);

  let (status, body) = call(&app, "GET", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "User not found");

  let (status, _) = call(&app, "DELETE", &format!("/users/{id}"), None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_name_is_rejected() {
  let app = app().await;
  let (status, body) = call(
    &app,
    "POST",
    "/users",
    Some(json!({ "name": " ", "email": "x@example.com", "role": "staff" })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "name is required");
}

// ─── Attendance ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn manual_check_in_and_out() {
  let app = app().await;
  let id = create_student(&app, "Amani").await;

  let (status, body) = call(&app, "POST", &format!("/attendance/checkin/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["action"], "check-in");
  assert_eq!(body["user"]["id"], id);
  let record_id = body["recordId"].as_i64().unwrap();

  let (status, body) = call(&app, "POST", &format!("/attendance/checkin/{id}"), None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["error"], "User is already checked in");

  let (status, body) = call(&app, "POST", &format!("/attendance/checkout/{id}"), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["action"], "check-out");
  assert_eq!(body["recordId"], record_id);

  let (status, body) = call(&app, "POST", &format!("/attendance/checkout/{id}"), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["error"], "No active check-in found");

  let (status, _) = call(&app, "POST", "/attendance/checkin/9999", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attendance_list_joins_users_and_filters() {
  let app = app().await;
  let amani = create_student(&app, "Amani").await;
  let baraka = create_student(&app, "Baraka").await;
  call(&app, "POST", &format!("/attendance/checkin/{amani}"), None).await;
  call(&app, "POST", &format!("/attendance/checkout/{amani}"), None).await;
  call(&app, "POST", &format!("/attendance/checkin/{baraka}"), None).await;

  let (status, all) = call(&app, "GET", "/attendance", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(all.as_array().unwrap().len(), 2);

  let (_, mine) = call(&app, "GET", &format!("/attendance?user_id={amani}"), None).await;
  let mine = mine.as_array().unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0]["user_name"], "Amani");
  assert_eq!(mine[0]["user_role"], "student");
  assert_eq!(mine[0]["user_id"], amani);
  assert!(mine[0]["duration"].as_str().unwrap().ends_with('h'));

  let (_, limited) = call(&app, "GET", "/attendance?_limit=1", None).await;
  assert_eq!(limited.as_array().unwrap().len(), 1);

  let today = Utc::now().date_naive();
  let tomorrow = today + TimeDelta::days(1);
  let (_, future) = call(&app, "GET", &format!("/attendance?start_date={tomorrow}"), None).await;
  assert!(future.as_array().unwrap().is_empty());

  let (status, _) = call(
    &app,
    "GET",
    &format!("/attendance?start_date={tomorrow}&end_date={today}"),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Search ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn search_users_reports_attendance_counts() {
  let app = app().await;
  let amani = create_student(&app, "Amani").await;
  create_student(&app, "Baraka").await;
  call(&app, "POST", &format!("/attendance/checkin/{amani}"), None).await;

  let (status, body) = call(&app, "GET", "/search/users?q=AMA", None).await;
  assert_eq!(status, StatusCode::OK);
  let hits = body.as_array().unwrap();
  assert_eq!(hits.len(), 1);
  assert_eq!(hits[0]["id"], amani);
  assert_eq!(hits[0]["name"], "Amani");
  assert_eq!(hits[0]["attendance_count"], 1);

  let (_, all) = call(&app, "GET", "/search/users", None).await;
  assert_eq!(all.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn search_attendance_by_name_status_and_date() {
  let app = app().await;
  let amani = create_student(&app, "Amani").await;
  let baraka = create_student(&app, "Baraka").await;
  call(&app, "POST", &format!("/attendance/checkin/{amani}"), None).await;
  call(&app, "POST", &format!("/attendance/checkin/{baraka}"), None).await;

  let (status, body) = call(&app, "GET", "/search/attendance?q=baraka", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["user_id"], baraka);

  let (_, present) = call(&app, "GET", "/search/attendance?q=present", None).await;
  assert_eq!(present.as_array().unwrap().len(), 2);

  let today = Utc::now().date_naive();
  let (_, dated) = call(&app, "GET", &format!("/search/attendance?q={today}"), None).await;
  assert_eq!(dated.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn advanced_search_combines_filters() {
  let app = app().await;
  let amani = create_student(&app, "Amani").await;
  let baraka = create_student(&app, "Baraka").await;
  call(&app, "POST", &format!("/attendance/checkin/{amani}"), None).await;
  call(&app, "POST", &format!("/attendance/checkin/{baraka}"), None).await;
  let today = Utc::now().date_naive();

  let (status, body) = call(
    &app,
    "POST",
    "/search/advanced",
    Some(json!({ "user_id": amani, "start_date": today, "end_date": today, "status": "present" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["user_name"], "Amani");

  let (_, absent) = call(&app, "POST", "/search/advanced", Some(json!({ "status": "absent" }))).await;
  assert!(absent.as_array().unwrap().is_empty());

  let (_, everything) = call(&app, "POST", "/search/advanced", Some(json!({}))).await;
  assert_eq!(everything.as_array().unwrap().len(), 2);

  let (_, filtered) = call(&app, "GET", "/attendance?status=absent", None).await;
  assert!(filtered.as_array().unwrap().is_empty());

  let tomorrow = today + TimeDelta::days(1);
  let (status, _) = call(
    &app,
    "POST",
    "/search/advanced",
    Some(json!({ "start_date": tomorrow, "end_date": today })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ─── Device ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn device_config_is_saved_applied_and_redacted() {
  let app = app().await;

  let (status, body) = call(&app, "GET", "/biotime/config", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({}));

  let (status, body) = call(
    &app,
    "POST",
    "/biotime/config",
    Some(json!({
      "ip_address": "http://10.0.0.5:8081",
      "username": "admin",
      "password": "secret",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "base_url": "http://10.0.0.5:8081", "username": "admin" }));

  let configured = app.device.configured.lock().unwrap().clone();
  assert_eq!(configured.len(), 1);
  assert_eq!(configured[0].password, "secret");

  let (_, body) = call(&app, "GET", "/biotime/config", None).await;
  assert_eq!(body["base_url"], "http://10.0.0.5:8081");
  assert!(body.get("password").is_none());
}

#[tokio::test]
async fn connection_test_reports_device_errors() {
  let app = app().await;
  let config = |password: &str| {
    json!({ "base_url": "http://10.0.0.5", "username": "admin", "password": password })
  };

  let (status, body) = call(&app, "POST", "/biotime/test", Some(config("secret"))).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["success"], true);

  let (status, body) = call(&app, "POST", "/biotime/test", Some(config("wrong"))).await;
  assert_eq!(status, StatusCode::BAD_GATEWAY);
  assert_eq!(body["error"], "device authentication failed: bad credentials");
  assert!(app.device.configured.lock().unwrap().is_empty());
}

#[tokio::test]
async fn process_runs_one_cycle_and_logs_it() {
  let app = app().await;
  let id = create_student(&app, "Amani").await;

  let (status, body) = call(&app, "POST", "/biotime/process", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "message": "No new attendance to process" }));

  *app.device.next.lock().unwrap() = Some(RawPunch {
    emp_code:   id.to_string(),
    punch_time: Utc::now() - TimeDelta::seconds(10),
    device_sn:  Some("BT-1".into()),
  });
  let (status, body) = call(&app, "POST", "/biotime/process", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["action"], "check-in");
  assert_eq!(body["user"]["name"], "Amani");

  let (status, logs) = call(&app, "GET", "/biotime/logs?limit=10", None).await;
  assert_eq!(status, StatusCode::OK);
  let logs = logs.as_array().unwrap();
  assert_eq!(logs.len(), 1);
  assert_eq!(logs[0]["status"], "success");
  assert_eq!(logs[0]["device_sn"], "BT-1");
}
