//! Emberchat Protocol - wire-format concerns for the chat protocol.
//!
//! A frame is a 3-letter ASCII command code optionally followed by one space
//! and a compact JSON object. This crate owns encoding and decoding of that
//! shape plus [`FieldMap`], the defensive accessor the session uses to read
//! decoded payloads.
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - serde, serde_json, thiserror only
//! 2. **No session knowledge** - per-command semantics live in the client
//! 3. **Absence is a value** - a missing payload field is a named outcome
//!    ([`FieldError::Missing`]), never a panic or an exception

pub mod codec;
pub mod fields;

pub use codec::{decode, encode, CodecError};
pub use fields::{FieldError, FieldMap};
