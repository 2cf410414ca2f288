//! The check-in/check-out state machine.
//!
//! For each punch, in order, short-circuiting at the first rejection:
//!
//! 1. a punch within the duplicate window of the person's last accepted punch
//!    is discarded;
//! 2. the code is resolved to a person;
//! 3. the person's state is re-derived from storage, and a punch that would
//!    repeat the last accepted action is discarded once, after which the
//!    stale cache entry is dropped;
//! 4. the transition implied by that state runs: check-in (subject to the
//!    grace period) or check-out (which needs an open interval).
//!
//! Storage is the authority. The [`PunchCache`] only absorbs bursts.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use rollcall_core::{
  attendance::{Action, NewInterval},
  notify::MessageSender,
  person::Person,
  punch::{LogStatus, MANUAL_DEVICE, NewTransactionLog, RawPunch},
  store::AttendanceStore,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::{
  cache::{CacheEntry, PunchCache},
  error::EngineError,
  notifier::Notifier,
  resolve,
  settings::ReconcileSettings,
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// A committed state change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transition {
  pub action:    Action,
  #[serde(rename = "user")]
  pub person:    Person,
  /// Id of the interval that was opened or closed.
  pub record_id: i64,
  pub at:        DateTime<Utc>,
}

/// Why a punch left no trace in attendance. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
  /// Stale or future-dated.
  InvalidTimestamp,
  /// The same punch was already decided on a previous cycle.
  AlreadyDecided,
  /// Within the duplicate window of the last accepted punch.
  Duplicate,
  UnknownPerson,
  /// Would repeat the last accepted action.
  DoubleTransition(Action),
  /// Check-in too soon after the last check-out.
  GracePeriod,
  /// Check-out with nothing to close.
  NoOpenInterval,
  /// Check-in while an interval is already open.
  AlreadyOpen,
}

impl Rejection {
  /// The transition that was refused, where one was attempted.
  pub fn action(self) -> Option<Action> {
    match self {
      Self::DoubleTransition(action) => Some(action),
      Self::GracePeriod | Self::AlreadyOpen => Some(Action::CheckIn),
      Self::NoOpenInterval => Some(Action::CheckOut),
      Self::InvalidTimestamp | Self::AlreadyDecided | Self::Duplicate | Self::UnknownPerson => {
        None
      }
    }
  }

  pub fn describe(self) -> String {
    match self {
      Self::InvalidTimestamp => "timestamp outside accepted window".into(),
      Self::AlreadyDecided => "punch already processed".into(),
      Self::Duplicate => "duplicate punch within window".into(),
      Self::UnknownPerson => "unknown employee code".into(),
      Self::DoubleTransition(action) => format!("double {action}"),
      Self::GracePeriod => "check-in within grace period of last check-out".into(),
      Self::NoOpenInterval => "no open interval to check out".into(),
      Self::AlreadyOpen => "interval already open".into(),
    }
  }
}

#[derive(Debug, Clone)]
pub enum Outcome {
  /// The device had nothing to report.
  Idle,
  Rejected(Rejection),
  Applied(Transition),
}

impl Outcome {
  pub fn transition(&self) -> Option<&Transition> {
    match self {
      Self::Applied(t) => Some(t),
      Self::Idle | Self::Rejected(_) => None,
    }
  }
}

// ─── Reconciler ──────────────────────────────────────────────────────────────

pub struct Reconciler<S, M> {
  store:            Arc<S>,
  notifier:         Notifier<M>,
  cache:            PunchCache,
  duplicate_window: TimeDelta,
  grace_period:     TimeDelta,
}

impl<S: AttendanceStore, M: MessageSender> Reconciler<S, M> {
  pub fn new(store: Arc<S>, sender: Arc<M>, settings: &ReconcileSettings) -> Self {
    Self {
      store,
      notifier: Notifier::new(sender),
      cache: PunchCache::new(settings.cache_capacity),
      duplicate_window: settings.duplicate_window(),
      grace_period: settings.grace_period(),
    }
  }

  pub fn cache(&self) -> &PunchCache { &self.cache }

  /// Decide a validated punch.
  ///
  /// A persistence failure is returned as an error and leaves the cache as it
  /// was, so the same punch is retried on the next cycle.
  pub async fn process(&mut self, punch: &RawPunch) -> Result<Outcome, EngineError> {
    if self.cache.is_decided(punch) {
      debug!(emp_code = %punch.emp_code, "punch already decided, skipping");
      return Ok(Outcome::Rejected(Rejection::AlreadyDecided));
    }

    let outcome = self.decide(punch).await?;
    self.cache.mark_decided(punch);

    match &outcome {
      Outcome::Applied(t) => {
        self.cache.record(&punch.emp_code, CacheEntry { time: punch.punch_time, action: t.action });
        info!(
          emp_code = %punch.emp_code,
          person_id = t.person.id,
          action = %t.action,
          record_id = t.record_id,
          "attendance recorded"
        );
        self
          .audit(NewTransactionLog {
            emp_code:   punch.emp_code.clone(),
            punch_time: punch.punch_time,
            action:     Some(t.action),
            status:     LogStatus::Success,
            reason:     None,
            device_sn:  punch.device_sn.clone(),
          })
          .await;
      }
      Outcome::Rejected(r) => {
        if matches!(r, Rejection::DoubleTransition(_)) {
          self.cache.forget(&punch.emp_code);
        }
        warn!(emp_code = %punch.emp_code, "punch rejected: {}", r.describe());
        self
          .audit(NewTransactionLog {
            emp_code:   punch.emp_code.clone(),
            punch_time: punch.punch_time,
            action:     r.action(),
            status:     LogStatus::Rejected,
            reason:     Some(r.describe()),
            device_sn:  punch.device_sn.clone(),
          })
          .await;
      }
      Outcome::Idle => {}
    }

    Ok(outcome)
  }

  async fn decide(&self, punch: &RawPunch) -> Result<Outcome, EngineError> {
    let cached = self.cache.get(&punch.emp_code);

    if cached.is_some_and(|last| punch.punch_time - last.time < self.duplicate_window) {
      return Ok(Outcome::Rejected(Rejection::Duplicate));
    }

    let Some(person) = self
      .store
      .find_person_by_code(punch.emp_code.clone())
      .await
      .map_err(EngineError::store)?
    else {
      return Ok(Outcome::Rejected(Rejection::UnknownPerson));
    };

    let next = resolve::current_state(self.store.as_ref(), person.id)
      .await
      .next_action();

    if cached.is_some_and(|last| last.action == next) {
      return Ok(Outcome::Rejected(Rejection::DoubleTransition(next)));
    }

    match next {
      Action::CheckIn => self.check_in(person, punch.punch_time, true).await,
      Action::CheckOut => self.check_out(person, punch.punch_time).await,
    }
  }

  /// Apply an operator-initiated transition. Skips the duplicate window and
  /// grace period, but still refuses to break the open-interval invariant.
  ///
  /// Cached punches for every code that resolves to the person are dropped,
  /// since they no longer describe the person's last action.
  pub async fn apply_manual(
    &mut self,
    person_id: i64,
    action: Action,
    at: DateTime<Utc>,
  ) -> Result<Transition, EngineError> {
    let person = self
      .store
      .get_person(person_id)
      .await
      .map_err(EngineError::store)?
      .ok_or(EngineError::PersonNotFound(person_id))?;

    let outcome = match action {
      Action::CheckIn => self.check_in(person, at, false).await?,
      Action::CheckOut => self.check_out(person, at).await?,
    };

    let Outcome::Applied(transition) = outcome else {
      return Err(match action {
        Action::CheckIn => EngineError::AlreadyCheckedIn(person_id),
        Action::CheckOut => EngineError::NotCheckedIn(person_id),
      });
    };

    self.cache.forget(&person_id.to_string());
    if let Some(badge) = &transition.person.badge_number {
      self.cache.forget(badge);
    }

    info!(person_id, %action, record_id = transition.record_id, "manual attendance recorded");
    self
      .audit(NewTransactionLog {
        emp_code:   person_id.to_string(),
        punch_time: at,
        action:     Some(action),
        status:     LogStatus::Success,
        reason:     None,
        device_sn:  Some(MANUAL_DEVICE.to_owned()),
      })
      .await;

    Ok(transition)
  }

  // ─── Transitions ──────────────────────────────────────────────────────────

  async fn check_in(
    &self,
    person: Person,
    at: DateTime<Utc>,
    enforce_grace: bool,
  ) -> Result<Outcome, EngineError> {
    if enforce_grace {
      let latest = self
        .store
        .latest_interval(person.id)
        .await
        .map_err(EngineError::store)?;
      let last_out = latest.and_then(|i| i.check_out);
      if last_out.is_some_and(|out| at - out < self.grace_period) {
        return Ok(Outcome::Rejected(Rejection::GracePeriod));
      }
    }

    let Some(interval) = self
      .store
      .begin_interval(NewInterval::present(person.id, at))
      .await
      .map_err(EngineError::store)?
    else {
      return Ok(Outcome::Rejected(Rejection::AlreadyOpen));
    };

    self.notifier.notify(&person, Action::CheckIn, at);
    Ok(Outcome::Applied(Transition {
      action: Action::CheckIn,
      person,
      record_id: interval.id,
      at,
    }))
  }

  async fn check_out(&self, person: Person, at: DateTime<Utc>) -> Result<Outcome, EngineError> {
    let Some(interval) = self
      .store
      .close_interval(person.id, at)
      .await
      .map_err(EngineError::store)?
    else {
      return Ok(Outcome::Rejected(Rejection::NoOpenInterval));
    };

    self.notifier.notify(&person, Action::CheckOut, at);
    Ok(Outcome::Applied(Transition {
      action: Action::CheckOut,
      person,
      record_id: interval.id,
      at,
    }))
  }

  // Audit rows are best effort once the transition has committed.
  async fn audit(&self, entry: NewTransactionLog) {
    let emp_code = entry.emp_code.clone();
    if let Err(e) = self.store.append_transaction_log(entry).await {
      error!(%emp_code, "failed to append transaction log: {e}");
    }
  }
}
