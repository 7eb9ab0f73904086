#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod config;
pub mod conversation;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod registry;
pub mod transport;
pub(crate) mod util;

pub use config::CarrierConfig;
pub use conversation::Conversation;
pub use dispatcher::{Dispatcher, InboundNotification};
pub use error::{RegistryError, TransportError, WaitError};
pub use message::{Address, Direction, Message};
pub use registry::Registry;
pub use transport::{carrier::HttpCarrier, mock::MockCarrier, Transport};
