//! Routes the carrier's inbound callbacks to waiting conversations.
//!
//! The HTTP layer that actually receives the callback POST lives outside
//! this crate; it hands the parsed notification (or the raw form body) to
//! [`Dispatcher::handle_inbound`]. Notifications that cannot be routed
//! (missing sender, no registered conversation, fetch failure) are dropped
//! with a log line, never surfaced as errors: the carrier's callback volume
//! is not under our control.

use crate::message::Address;
use crate::registry::Registry;
use crate::util::preview;

/// The two fields a carrier callback must carry: who sent the message and
/// the id to fetch its content by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundNotification {
    pub sender: String,
    pub message_id: String,
}

impl InboundNotification {
    /// Parse a form-encoded callback body (`From=...&MessageSid=...`).
    ///
    /// Returns `None` when either field is missing or empty; such callbacks
    /// are not actionable.
    pub fn from_form(body: &str) -> Option<Self> {
        let mut sender = None;
        let mut message_id = None;
        for pair in body.split('&') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            // Form encoding turns spaces into '+'; literal plus signs arrive
            // percent-encoded.
            let spaced = value.replace('+', " ");
            let Ok(value) = urlencoding::decode(&spaced) else {
                continue;
            };
            match key {
                "From" => sender = Some(value.into_owned()),
                "MessageSid" => message_id = Some(value.into_owned()),
                _ => {}
            }
        }
        match (sender, message_id) {
            (Some(sender), Some(message_id))
                if !sender.trim().is_empty() && !message_id.trim().is_empty() =>
            {
                Some(Self { sender, message_id })
            }
            _ => None,
        }
    }
}

/// Resolves inbound notifications against the registry and delivers the
/// fetched message to the matching conversation.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Registry,
}

impl Dispatcher {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Handle one inbound notification end to end: resolve the sender to a
    /// conversation, fetch the full message behind the notification's id,
    /// deliver it.
    pub async fn handle_inbound(&self, notification: &InboundNotification) {
        if notification.sender.trim().is_empty() {
            tracing::debug!("inbound notification without sender, dropping");
            return;
        }
        let sender = Address::new(&notification.sender);
        let Some(conversation) = self.registry.lookup(&sender) else {
            tracing::debug!(%sender, "no active conversation for sender, dropping notification");
            return;
        };

        match self
            .registry
            .transport()
            .fetch_by_id(&notification.message_id)
            .await
        {
            Ok(message) => {
                tracing::info!(from = %sender, id = %message.id, "received {}", preview(&message.body, 50));
                conversation.deliver(message);
            }
            Err(err) => {
                tracing::warn!(
                    from = %sender,
                    message_id = %notification.message_id,
                    error = %err,
                    "failed to fetch inbound message, dropping notification"
                );
            }
        }
    }

    /// Convenience wrapper for callers holding the raw callback body.
    pub async fn handle_form_body(&self, body: &str) {
        match InboundNotification::from_form(body) {
            Some(notification) => self.handle_inbound(&notification).await,
            None => tracing::debug!("malformed callback body, dropping"),
        }
    }
}
