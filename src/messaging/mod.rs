//! # Messaging
//!
//! Wire message types and the broker contract. The engine assumes an
//! at-least-once transport: a delivery that is never acked comes back, and
//! the broker-side read count is surfaced on each [`Delivery`] as the
//! transport-level attempts counter.

pub mod broker;
pub mod errors;
pub mod message;

pub use broker::{Delivery, MessageBroker, PgmqBroker};
pub use errors::{MessagingError, MessagingResult};
pub use message::TaskMessage;
