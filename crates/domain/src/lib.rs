//! Emberchat Domain - Core chat entities, value objects, and invariants
//!
//! This crate contains the session-scoped entity model shared by the client
//! engine: characters, channels, and the enums that describe them. It holds
//! no protocol or transport knowledge.
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde and thiserror
//! 2. **No orchestration** - Entities enforce their own invariants; the
//!    session engine decides when to mutate them
//! 3. **Wire-string aware** - Enums parse from the exact strings the chat
//!    protocol uses, but unknown values are a normal parse error, never a
//!    panic

pub mod channel;
pub mod character;
pub mod error;
pub mod types;

pub use channel::{Channel, ChannelMember, ADHOC_PREFIX};
pub use character::{profile_url, Character};
pub use error::DomainError;
pub use types::{
    ChannelKind, ChannelMode, ChannelSummary, CharacterStatus, Gender, MessageKind, TypingStatus,
};
