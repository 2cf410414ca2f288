//! Guardian notifications for student transitions.
//!
//! Sending happens on a detached task: a slow or failing gateway never holds
//! up reconciliation, and a failed send never undoes a transition.

use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use rollcall_core::{attendance::Action, notify::MessageSender, person::Person};
use tracing::{debug, info, warn};

pub struct Notifier<M> {
  sender: Arc<M>,
}

impl<M> Clone for Notifier<M> {
  fn clone(&self) -> Self { Self { sender: Arc::clone(&self.sender) } }
}

impl<M: MessageSender> Notifier<M> {
  pub fn new(sender: Arc<M>) -> Self { Self { sender } }

  /// Queue a message to `person`'s guardian. Returns immediately; does nothing
  /// for people without a guardian contact.
  pub fn notify(&self, person: &Person, action: Action, at: DateTime<Utc>) {
    let Some(destination) = person.guardian_contact() else {
      debug!(person_id = person.id, "no guardian contact, skipping notification");
      return;
    };

    let destination = destination.to_owned();
    let text = message_text(&person.name, action, at);
    let sender = Arc::clone(&self.sender);
    let person_id = person.id;

    tokio::spawn(async move {
      match sender.send_message(destination, text).await {
        Ok(_) => info!(person_id, %action, "guardian notified"),
        Err(e) => warn!(person_id, %action, "guardian notification failed: {e}"),
      }
    });
  }
}

/// The guardian-facing text, with the time in the server's local zone.
pub fn message_text(name: &str, action: Action, at: DateTime<Utc>) -> String {
  let time = at.with_timezone(&Local).format("%H:%M");
  match action {
    Action::CheckIn => format!("Dear parent, {name} has reached school at {time}"),
    Action::CheckOut => format!("Dear parent, {name} has left school at {time}"),
  }
}
