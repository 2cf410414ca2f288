//! Derives a person's presence state from durable storage.

use rollcall_core::{attendance::PresenceState, store::AttendanceStore};
use tracing::error;

/// `CheckedIn` iff the person's latest interval is still open.
///
/// Never fails: a read error is logged and resolves to `CheckedOut`, so the
/// engine falls back to attempting a check-in.
pub async fn current_state<S: AttendanceStore>(store: &S, person_id: i64) -> PresenceState {
  match store.latest_interval(person_id).await {
    Ok(latest) => latest.map_or(PresenceState::CheckedOut, |i| i.state()),
    Err(e) => {
      error!(person_id, "could not read attendance state, assuming checked out: {e}");
      PresenceState::CheckedOut
    }
  }
}
