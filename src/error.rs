//! Error taxonomy for the conversation API.
//!
//! Timeouts, superseded waits, duplicate registrations and carrier failures
//! are distinct types so test code can assert on exactly what went wrong.

use crate::message::Address;
use std::time::Duration;
use thiserror::Error;

/// Why a `wait_for` call did not return messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline elapsed before enough inbound messages arrived.
    #[error("no matching reply arrived within {waited:?}")]
    Timeout { waited: Duration },

    /// A later `wait_for` on the same conversation took over the waiter slot.
    #[error("wait superseded by a newer wait on the same conversation")]
    Superseded,
}

/// Registry lifecycle errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A conversation for this destination is already registered. Overwriting
    /// it would orphan the earlier conversation's future notifications, so
    /// the caller must dispose the old one first.
    #[error("a conversation with `{destination}` is already active")]
    AlreadyActive { destination: Address },
}

/// A remote carrier call (send or fetch) failed.
#[derive(Debug, Error)]
#[error("carrier transport call failed: {0}")]
pub struct TransportError(pub anyhow::Error);

impl From<anyhow::Error> for TransportError {
    fn from(err: anyhow::Error) -> Self {
        Self(err)
    }
}
