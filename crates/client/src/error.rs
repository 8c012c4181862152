//! Protocol inconsistencies.
//!
//! An [`Inconsistency`] is raised when an inbound frame references state the
//! session does not have, usually a server-side ordering bug or a frame for
//! an entity we were never told about. Handlers return it instead of logging
//! inline; the dispatcher logs every inconsistency once, with the raw frame
//! attached, and carries on with the connection intact.

use emberchat_protocol::FieldError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Inconsistency {
    /// Frame references a channel the session has never seen.
    #[error("unknown channel '{0}'")]
    UnknownChannel(String),

    /// Frame references a character that is not online in our model.
    #[error("unknown character '{0}'")]
    UnknownCharacter(String),

    /// Frame assumes we are a member of a channel we have not joined.
    #[error("not joined to channel '{0}'")]
    NotJoined(String),

    /// Frame assumes a character is in a channel they are not a member of.
    #[error("character '{0}' is not present in channel '{1}'")]
    NotPresent(String, String),

    /// Payload is missing a field the command requires, or the field has the
    /// wrong type.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// Anything else worth a diagnostic (unknown sub-protocol action, ...).
    #[error("{0}")]
    Other(String),
}

impl Inconsistency {
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
