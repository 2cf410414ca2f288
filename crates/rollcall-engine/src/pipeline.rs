//! One fetch → validate → reconcile pass, plus the manual entry points that
//! share the same reconciler.

use std::sync::Arc;

use chrono::Utc;
use rollcall_core::{
  attendance::Action, device::PunchSource, notify::MessageSender, store::AttendanceStore,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
  error::EngineError,
  reconcile::{Outcome, Reconciler, Rejection, Transition},
  settings::ReconcileSettings,
  validate::Validator,
};

/// Owns the device source and the single reconciler for the process.
///
/// The reconciler sits behind an async mutex so the poller, on-demand
/// processing and manual actions never interleave on the same state.
pub struct Pipeline<S, D, M> {
  source:    Arc<D>,
  validator: Validator,
  engine:    Mutex<Reconciler<S, M>>,
}

impl<S, D, M> Pipeline<S, D, M>
where
  S: AttendanceStore,
  D: PunchSource,
  M: MessageSender,
{
  pub fn new(store: Arc<S>, source: Arc<D>, sender: Arc<M>, settings: &ReconcileSettings) -> Self {
    Self {
      source,
      validator: Validator::new(settings.max_time_diff()),
      engine: Mutex::new(Reconciler::new(store, sender, settings)),
    }
  }

  pub fn source(&self) -> &D { &self.source }

  /// Fetch the device's latest punch and decide it.
  pub async fn run_once(&self) -> Result<Outcome, EngineError> {
    let Some(punch) = self.source.fetch_latest().await? else {
      debug!("device reported no punches");
      return Ok(Outcome::Idle);
    };

    if !self.validator.validate(&punch, Utc::now()) {
      return Ok(Outcome::Rejected(Rejection::InvalidTimestamp));
    }

    self.engine.lock().await.process(&punch).await
  }

  pub async fn check_in(&self, person_id: i64) -> Result<Transition, EngineError> {
    self.manual(person_id, Action::CheckIn).await
  }

  pub async fn check_out(&self, person_id: i64) -> Result<Transition, EngineError> {
    self.manual(person_id, Action::CheckOut).await
  }

  async fn manual(&self, person_id: i64, action: Action) -> Result<Transition, EngineError> {
    let mut engine = self.engine.lock().await;
    engine.apply_manual(person_id, action, Utc::now()).await
  }
}
