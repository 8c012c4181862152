//! Emberchat Client - the protocol session engine.
//!
//! One [`Session`] is bound to one character identity on one connection. It
//! decodes inbound command frames, mutates the local [`EntityStore`] model of
//! the chat world, formats human-facing [`Message`] values, and encodes user
//! actions into outbound frames.
//!
//! The embedding application supplies the collaborators the engine does not
//! own: the frame [`Transport`], the [`MarkupParser`] that turns chat markup
//! into display text, and the [`SessionObserver`] that receives one-way UI
//! notifications. The engine is single-threaded and synchronous: each
//! transport event is fully processed before the next is accepted.

pub mod config;
pub mod error;
pub mod message;
pub mod ports;
pub mod session;
pub mod store;

pub use config::SessionConfig;
pub use error::Inconsistency;
pub use message::{Message, MessageBuilder, SenderRef};
pub use ports::{MarkupParser, PlainMarkup, SessionObserver, Transport};
pub use session::{ConnectionState, Session};
pub use store::EntityStore;
