//! The background loop that drives [`Pipeline::run_once`].
//!
//! A single task owns the schedule. The next wake-up is armed only after the
//! current cycle has finished, so cycles never overlap. Start, stop and
//! interval changes reach the task through a `watch` channel; dropping the
//! [`Poller`] ends the task once any in-flight cycle has finished.

use std::{sync::Arc, time::Duration};

use rollcall_core::{device::PunchSource, notify::MessageSender, store::AttendanceStore};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{error, info};

use crate::{
  error::EngineError,
  pipeline::Pipeline,
  reconcile::{Outcome, Transition},
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Emitted from inside the cycle that produced it, before the next wake-up is
/// scheduled.
#[derive(Debug, Clone, Copy)]
pub enum PollEvent<'a> {
  Processed(&'a Transition),
  Error(&'a EngineError),
}

pub trait PollListener: Send + Sync + 'static {
  fn on_event(&self, event: PollEvent<'_>);
}

impl<F> PollListener for F
where
  F: Fn(PollEvent<'_>) + Send + Sync + 'static,
{
  fn on_event(&self, event: PollEvent<'_>) { self(event) }
}

/// Logs every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl PollListener for TracingListener {
  fn on_event(&self, event: PollEvent<'_>) {
    match event {
      PollEvent::Processed(t) => info!(
        action = %t.action,
        person_id = t.person.id,
        record_id = t.record_id,
        "processed punch"
      ),
      PollEvent::Error(e) => error!("poll cycle failed: {e}"),
    }
  }
}

// ─── Poller ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct Control {
  active:   bool,
  interval: Duration,
  /// Bumped by every `start` so the task runs a cycle immediately.
  epoch:    u64,
}

/// Handle to the polling task.
pub struct Poller {
  control: watch::Sender<Control>,
  task:    JoinHandle<()>,
}

impl Poller {
  /// Spawn the task in the stopped state.
  pub fn spawn<S, D, M, L>(
    pipeline: Arc<Pipeline<S, D, M>>,
    listener: L,
    interval: Duration,
  ) -> Self
  where
    S: AttendanceStore,
    D: PunchSource,
    M: MessageSender,
    L: PollListener,
  {
    let (control, rx) = watch::channel(Control { active: false, interval, epoch: 0 });
    let task = tokio::spawn(run(pipeline, listener, rx));
    Self { control, task }
  }

  /// Run a cycle now and keep polling. No effect if already active.
  pub fn start(&self) {
    self.control.send_if_modified(|c| {
      if c.active {
        return false;
      }
      c.active = true;
      c.epoch += 1;
      true
    });
  }

  /// Stop scheduling cycles. A cycle in flight still completes.
  pub fn stop(&self) {
    self.control.send_if_modified(|c| {
      let was_active = c.active;
      c.active = false;
      was_active
    });
  }

  /// Change the cadence. While active, the pending wait is restarted so the
  /// next cycle runs one new interval from now.
  pub fn update_interval(&self, interval: Duration) {
    self.control.send_if_modified(|c| {
      if c.interval == interval {
        return false;
      }
      info!(?interval, "poll interval updated");
      c.interval = interval;
      true
    });
  }

  pub fn interval(&self) -> Duration { self.control.borrow().interval }

  pub fn is_active(&self) -> bool { self.control.borrow().active }

  /// Stop, let any in-flight cycle finish, and wait for the task to exit.
  pub async fn shutdown(self) {
    let Self { control, task } = self;
    control.send_modify(|c| c.active = false);
    drop(control);
    if let Err(e) = task.await {
      error!("poller task ended abnormally: {e}");
    }
  }
}

async fn run<S, D, M, L>(
  pipeline: Arc<Pipeline<S, D, M>>,
  listener: L,
  mut control: watch::Receiver<Control>,
) where
  S: AttendanceStore,
  D: PunchSource,
  M: MessageSender,
  L: PollListener,
{
  let mut seen_epoch = 0;

  loop {
    let current = *control.borrow_and_update();

    if !current.active {
      if control.changed().await.is_err() {
        return;
      }
      continue;
    }

    if current.epoch != seen_epoch {
      seen_epoch = current.epoch;
      cycle(&pipeline, &listener).await;
      continue;
    }

    tokio::select! {
      () = tokio::time::sleep(current.interval) => cycle(&pipeline, &listener).await,
      changed = control.changed() => {
        if changed.is_err() {
          return;
        }
      }
    }
  }
}

async fn cycle<S, D, M, L>(pipeline: &Pipeline<S, D, M>, listener: &L)
where
  S: AttendanceStore,
  D: PunchSource,
  M: MessageSender,
  L: PollListener,
{
  match pipeline.run_once().await {
    Ok(Outcome::Applied(transition)) => listener.on_event(PollEvent::Processed(&transition)),
    Ok(Outcome::Idle | Outcome::Rejected(_)) => {}
    Err(e) => listener.on_event(PollEvent::Error(&e)),
  }
}
