//! HTTP front end for the rollcall attendance service.
//!
//! Wraps the JSON API with optional Basic auth, serves the dashboard's static
//! files, and adjusts the poller's cadence to the host's load.

pub mod auth;
pub mod load;
pub mod settings;

use std::{path::Path, sync::Arc};

use axum::{Router, middleware};
use tower_http::{
  cors::CorsLayer,
  services::{ServeDir, ServeFile},
  trace::TraceLayer,
};

use auth::{AuthConfig, require_auth};

pub use settings::{PollSettings, ServerConfig};

// ─── Router ───────────────────────────────────────────────────────────────────

/// Mount `api` under `/api` and serve `static_dir` for everything else.
///
/// Unknown non-API paths fall back to `index.html` so client-side routes
/// resolve. Only `/api` is guarded when `auth` is set.
pub fn router(api: Router, auth: Option<AuthConfig>, static_dir: &Path) -> Router {
  let api = match auth {
    Some(auth) => api.layer(middleware::from_fn_with_state(Arc::new(auth), require_auth)),
    None => api,
  };

  let assets =
    ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

  Router::new()
    .nest("/api", api)
    .fallback_service(assets)
    .layer(CorsLayer::permissive())
    .layer(TraceLayer::new_for_http())
}
