//! Attendance reconciliation engine.
//!
//! Turns punches from a terminal into check-in/check-out transitions:
//!
//! ```text
//! Poller ─▶ PunchSource::fetch_latest ─▶ Validator ─▶ Reconciler ─▶ store
//!                                                        └──────▶ Notifier
//! ```
//!
//! Durable storage is the authority on whether a person is checked in. The
//! reconciler's in-memory [`cache::PunchCache`] only suppresses duplicates and
//! starts empty after a restart.

pub mod cache;
pub mod error;
pub mod notifier;
pub mod pipeline;
pub mod poller;
pub mod reconcile;
pub mod resolve;
pub mod settings;
pub mod validate;

pub use error::EngineError;
pub use pipeline::Pipeline;
pub use poller::{PollEvent, PollListener, Poller, TracingListener};
pub use reconcile::{Outcome, Reconciler, Rejection, Transition};
pub use settings::ReconcileSettings;
