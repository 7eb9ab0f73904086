//! The carrier boundary: send a message, fetch a message record by id.
//!
//! Everything behind this trait is an opaque remote call. The production
//! implementation is [`carrier::HttpCarrier`]; tests script the boundary with
//! [`mock::MockCarrier`].

pub mod carrier;
pub mod mock;

use crate::message::{Address, Message};
use async_trait::async_trait;

/// Remote carrier operations used by conversations and the dispatcher.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Submit an outbound message and return the record the carrier assigned
    /// to it (including its unique id).
    async fn send(&self, to: &Address, from: &Address, body: &str) -> anyhow::Result<Message>;

    /// Fetch the full message record behind a callback's message id. Inbound
    /// notifications carry only an id and a sender, not the body.
    async fn fetch_by_id(&self, id: &str) -> anyhow::Result<Message>;
}
