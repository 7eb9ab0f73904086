//! Scripted in-memory carrier for tests.
//!
//! Records every outbound send, serves staged inbound messages to
//! `fetch_by_id`, and can be told to fail the next send or fetch. Public
//! because this crate is itself test tooling: integration tests (ours and
//! downstream users') drive whole conversations against it without a live
//! carrier account.

use super::Transport;
use crate::dispatcher::InboundNotification;
use crate::message::{Address, Direction, Message};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Default)]
struct MockState {
    sent: Vec<Message>,
    fetchable: HashMap<String, Message>,
    fail_next_send: Option<String>,
    fail_next_fetch: Option<String>,
}

#[derive(Default)]
pub struct MockCarrier {
    state: Mutex<MockState>,
}

impl MockCarrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message accepted by `send`, in call order.
    pub fn sent(&self) -> Vec<Message> {
        self.state.lock().sent.clone()
    }

    /// Stage an inbound message as if the remote party had texted us: the
    /// message becomes fetchable by id, and the returned notification is
    /// ready to hand to `Dispatcher::handle_inbound`.
    pub fn stage_inbound(&self, from: &Address, to: &Address, body: &str) -> InboundNotification {
        let message = Message {
            id: Uuid::new_v4().to_string(),
            from: from.clone(),
            to: to.clone(),
            body: body.to_string(),
            direction: Direction::Inbound,
        };
        let notification = InboundNotification {
            sender: from.as_str().to_string(),
            message_id: message.id.clone(),
        };
        self.state
            .lock()
            .fetchable
            .insert(message.id.clone(), message);
        notification
    }

    /// Make the next `send` call fail with `reason`.
    pub fn fail_next_send(&self, reason: &str) {
        self.state.lock().fail_next_send = Some(reason.to_string());
    }

    /// Make the next `fetch_by_id` call fail with `reason`.
    pub fn fail_next_fetch(&self, reason: &str) {
        self.state.lock().fail_next_fetch = Some(reason.to_string());
    }
}

#[async_trait]
impl Transport for MockCarrier {
    async fn send(&self, to: &Address, from: &Address, body: &str) -> anyhow::Result<Message> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_send.take() {
            anyhow::bail!("{reason}");
        }
        let message = Message {
            id: Uuid::new_v4().to_string(),
            from: from.clone(),
            to: to.clone(),
            body: body.to_string(),
            direction: Direction::Outbound,
        };
        state.sent.push(message.clone());
        Ok(message)
    }

    async fn fetch_by_id(&self, id: &str) -> anyhow::Result<Message> {
        let mut state = self.state.lock();
        if let Some(reason) = state.fail_next_fetch.take() {
            anyhow::bail!("{reason}");
        }
        state
            .fetchable
            .get(id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no message with id {id}"))
    }
}
