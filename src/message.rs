//! Message and address types shared across the crate.

use std::fmt;

/// Which side of the conversation produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Sent by us through the carrier API.
    Outbound,
    /// Pushed to us by the carrier callback.
    Inbound,
}

/// One message exchanged with the system under test.
///
/// Immutable once constructed; `id` is assigned by the carrier and unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub from: Address,
    pub to: Address,
    pub body: String,
    pub direction: Direction,
}

/// A normalized phone number, used as the correlation key between inbound
/// notifications and active conversations.
///
/// Normalization keeps digits only and re-adds the leading `+`, so
/// `"+1 (555) 123-0000"`, `"15551230000"` and `"+15551230000"` all compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    pub fn new(raw: &str) -> Self {
        let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            Self(String::new())
        } else {
            Self(format!("+{digits}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when normalization left nothing usable (no digits in the input).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
