//! The outbound message boundary used to reach guardians.

use std::future::Future;

use crate::NotifyError;

/// Delivers a text message to a destination (a phone number for SMS).
pub trait MessageSender: Send + Sync + 'static {
  /// Returns the gateway's delivery response.
  fn send_message(
    &self,
    destination: String,
    text: String,
  ) -> impl Future<Output = Result<serde_json::Value, NotifyError>> + Send + '_;
}
