//! Handlers for `/search` endpoints.
//!
//! The free-text searches match substrings case-insensitively; `%` and `_`
//! in the query are taken literally. A missing `q` matches everything.

use axum::{
  Json,
  extract::{Query, State},
};
use chrono::NaiveDate;
use rollcall_core::{
  attendance::{AttendanceQuery, AttendanceRecord, AttendanceStatus},
  device::PunchSource,
  notify::MessageSender,
  person::PersonMatch,
  store::Store,
};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

pub const USER_RESULTS: usize = 50;
pub const ATTENDANCE_RESULTS: usize = 100;
pub const ADVANCED_RESULTS: usize = 200;

#[derive(Debug, Default, Deserialize)]
pub struct TextParams {
  #[serde(default)]
  pub q: String,
}

/// `GET /search/users?q=`
///
/// Matches name, email or badge number. Each result carries the person's
/// total interval count as `attendance_count`.
pub async fn users<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Query(params): Query<TextParams>,
) -> Result<Json<Vec<PersonMatch>>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  let people = state
    .store
    .search_people(params.q.trim().to_owned(), USER_RESULTS)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(people))
}

/// `GET /search/attendance?q=`
///
/// Matches the person's name, the interval status, or a `YYYY-MM-DD`
/// check-in date.
pub async fn attendance<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Query(params): Query<TextParams>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  let records = state
    .store
    .search_attendance(params.q.trim().to_owned(), ATTENDANCE_RESULTS)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}

/// Body of `POST /search/advanced`. Every filter is optional and they
/// combine with AND.
#[derive(Debug, Default, Deserialize)]
pub struct AdvancedSearch {
  pub user_id:    Option<i64>,
  pub start_date: Option<NaiveDate>,
  pub end_date:   Option<NaiveDate>,
  pub status:     Option<AttendanceStatus>,
}

/// `POST /search/advanced`
pub async fn advanced<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Json(filters): Json<AdvancedSearch>,
) -> Result<Json<Vec<AttendanceRecord>>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  if let (Some(start), Some(end)) = (filters.start_date, filters.end_date)
    && start > end
  {
    return Err(ApiError::BadRequest("start_date is after end_date".into()));
  }

  let query = AttendanceQuery {
    start_date: filters.start_date,
    end_date:   filters.end_date,
    person_id:  filters.user_id,
    status:     filters.status,
    limit:      Some(ADVANCED_RESULTS),
  };
  let records = state
    .store
    .list_attendance(query)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(records))
}
