//! Handlers for `/attendance` endpoints.
//!
//! Manual check-in/out go through the same reconciler as device punches, so
//! they can never open a second interval for a person. They skip the
//! timestamp, duplicate-window and grace-period checks.

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::NaiveDate;
use rollcall_core::{
  attendance::{AttendanceQuery, AttendanceRecord, AttendanceStatus},
  device::PunchSource,
  notify::MessageSender,
  store::Store,
};
use rollcall_engine::Transition;
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub user_id:    Option<i64>,
  pub status:     Option<AttendanceStatus>,
  #[serde(alias = "_limit")]
  pub limit:      Option<usize>,
}

impl From<ListParams> for AttendanceQuery {
  fn from(p: ListParams) -> Self {
    Self {
      start_date: p.start_date,
      end_date:   p.end_date,
      person_id:  p.user_id,
      status:     p.status,
      limit:      p.limit,
    }
  }
}

/// `GET /attendance[?start_date=&end_date=&user_id=&status=&limit=]`
///
/// Newest check-in first. Dates are inclusive and compare against the
/// check-in date.
pub async fn list<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  if let (Some(start), Some(end)) = (params.start_date, params.end_date)
    && start > end
  {
    return Err(ApiError::BadRequest("start_date is after end_date".into()));
  }

  let records = state
    .store
    .list_attendance(params.into())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

// ─── Manual transitions ──────────────────────────────────────────────────────

/// `POST /attendance/checkin/{user_id}`
pub async fn check_in<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Path(user_id): Path<i64>,
) -> Result<Json<Transition>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  Ok(Json(state.pipeline.check_in(user_id).await?))
}

/// `POST /attendance/checkout/{user_id}`
pub async fn check_out<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Path(user_id): Path<i64>,
) -> Result<Json<Transition>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  Ok(Json(state.pipeline.check_out(user_id).await?))
}
