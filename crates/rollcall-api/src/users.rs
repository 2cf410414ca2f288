//! Handlers for `/users` endpoints.
//!
//! | Method   | Path          | Notes |
//! |----------|---------------|-------|
//! | `GET`    | `/users`      | Ordered by name |
//! | `POST`   | `/users`      | Body: `{"name","email","role",...}`; 201 |
//! | `GET`    | `/users/{id}` | 404 if not found |
//! | `PUT`    | `/users/{id}` | Replaces every editable field |
//! | `DELETE` | `/users/{id}` | Also deletes the user's attendance |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use rollcall_core::{
  device::PunchSource,
  notify::MessageSender,
  person::{NewPerson, Person},
  store::Store,
};
use serde_json::{Value, json};

use crate::{ApiState, error::ApiError};

fn not_found() -> ApiError { ApiError::NotFound("User not found".into()) }

fn check(input: &NewPerson) -> Result<(), ApiError> {
  if input.name.trim().is_empty() {
    return Err(ApiError::BadRequest("name is required".into()));
  }
  if input.email.trim().is_empty() {
    return Err(ApiError::BadRequest("email is required".into()));
  }
  Ok(())
}

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /users`
pub async fn list<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
) -> Result<Json<Vec<Person>>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  let people = state.store.list_people().await.map_err(ApiError::store)?;
  Ok(Json(people))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /users`
pub async fn create<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Json(body): Json<NewPerson>,
) -> Result<impl IntoResponse, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  check(&body)?;
  let person = state.store.add_person(body).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(person)))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /users/{id}`
pub async fn get_one<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Path(id): Path<i64>,
) -> Result<Json<Person>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  state
    .store
    .get_person(id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(not_found)
}

// ─── Replace ─────────────────────────────────────────────────────────────────

/// `PUT /users/{id}`
pub async fn replace<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Path(id): Path<i64>,
  Json(body): Json<NewPerson>,
) -> Result<Json<Person>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  check(&body)?;
  state
    .store
    .update_person(id, body)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(not_found)
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /users/{id}`
pub async fn delete_one<S, D, M>(
  State(state): State<ApiState<S, D, M>>,
  Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  if !state.store.delete_person(id).await.map_err(ApiError::store)? {
    return Err(not_found());
  }
  Ok(Json(json!({ "message": "User deleted successfully" })))
}
