//! JSON REST API for the rollcall attendance service.
//!
//! Exposes an axum [`Router`] backed by any [`rollcall_core::store::Store`]
//! and the engine's [`Pipeline`]. Auth, static files and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", rollcall_api::api_router(state))
//! ```

pub mod attendance;
pub mod biotime;
pub mod error;
pub mod search;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use rollcall_core::{device::PunchSource, notify::MessageSender, store::Store};
use rollcall_engine::Pipeline;

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S, D, M> {
  pub store:    Arc<S>,
  pub pipeline: Arc<Pipeline<S, D, M>>,
}

impl<S, D, M> Clone for ApiState<S, D, M> {
  fn clone(&self) -> Self {
    Self {
      store:    Arc::clone(&self.store),
      pipeline: Arc::clone(&self.pipeline),
    }
  }
}

/// Build a fully-materialised API router.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, D, M>(state: ApiState<S, D, M>) -> Router<()>
where
  S: Store,
  D: PunchSource,
  M: MessageSender,
{
  Router::new()
    // Users
    .route("/users", get(users::list::<S, D, M>).post(users::create::<S, D, M>))
    .route(
      "/users/{id}",
      get(users::get_one::<S, D, M>)
        .put(users::replace::<S, D, M>)
        .delete(users::delete_one::<S, D, M>),
    )
    // Attendance
    .route("/attendance", get(attendance::list::<S, D, M>))
    .route("/attendance/checkin/{user_id}", post(attendance::check_in::<S, D, M>))
    .route("/attendance/checkout/{user_id}", post(attendance::check_out::<S, D, M>))
    // Search
    .route("/search/users", get(search::users::<S, D, M>))
    .route("/search/attendance", get(search::attendance::<S, D, M>))
    .route("/search/advanced", post(search::advanced::<S, D, M>))
    // Device
    .route(
      "/biotime/config",
      get(biotime::get_config::<S, D, M>).post(biotime::save_config::<S, D, M>),
    )
    .route("/biotime/test", post(biotime::test_connection::<S, D, M>))
    .route("/biotime/process", post(biotime::process::<S, D, M>))
    .route("/biotime/logs", get(biotime::logs::<S, D, M>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
