//! Value types shared across the client engine.
//!
//! The enums here parse from the literal strings the chat protocol uses on
//! the wire. Parsing is strict (`FromStr` returns [`DomainError::Parse`]);
//! callers that want the protocol's lenient fallback behavior handle the
//! error themselves and log it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// A character's gender, as advertised by the server.
///
/// Each gender maps to a display color used when decorating the character's
/// name in formatted messages. `OfflineUnknown` is never sent by the server;
/// it is the local fallback for characters we have no entity for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Herm,
    Shemale,
    Cuntboy,
    MaleHerm,
    Transgender,
    None,
    OfflineUnknown,
}

impl Gender {
    /// CSS color used for the character-name link in formatted messages.
    pub fn color(self) -> &'static str {
        match self {
            Gender::Male => "#6699ff",
            Gender::Female => "#ff6699",
            Gender::Herm => "#9b30ff",
            Gender::Shemale => "#cc66ff",
            Gender::Cuntboy => "#00cc66",
            Gender::MaleHerm => "#007fff",
            Gender::Transgender => "#ee8822",
            Gender::None => "#ffffbb",
            Gender::OfflineUnknown => "#c0c0c0",
        }
    }
}

impl FromStr for Gender {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            "Herm" => Ok(Gender::Herm),
            "Shemale" => Ok(Gender::Shemale),
            "Cunt-boy" => Ok(Gender::Cuntboy),
            "Male-Herm" => Ok(Gender::MaleHerm),
            "Transgender" => Ok(Gender::Transgender),
            "None" => Ok(Gender::None),
            _ => Err(DomainError::parse(format!("unknown gender '{s}'"))),
        }
    }
}

/// A character's presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharacterStatus {
    Online,
    Looking,
    Busy,
    Away,
    DoNotDisturb,
    Idle,
    Offline,
    /// Awarded by a moderator ("crown" reward); carries no status message.
    Crown,
}

impl CharacterStatus {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            CharacterStatus::Online => "online",
            CharacterStatus::Looking => "looking",
            CharacterStatus::Busy => "busy",
            CharacterStatus::Away => "away",
            CharacterStatus::DoNotDisturb => "dnd",
            CharacterStatus::Idle => "idle",
            CharacterStatus::Offline => "offline",
            CharacterStatus::Crown => "crown",
        }
    }
}

impl FromStr for CharacterStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(CharacterStatus::Online),
            "looking" => Ok(CharacterStatus::Looking),
            "busy" => Ok(CharacterStatus::Busy),
            "away" => Ok(CharacterStatus::Away),
            "dnd" => Ok(CharacterStatus::DoNotDisturb),
            "idle" => Ok(CharacterStatus::Idle),
            "offline" => Ok(CharacterStatus::Offline),
            "crown" => Ok(CharacterStatus::Crown),
            _ => Err(DomainError::parse(format!("unknown status '{s}'"))),
        }
    }
}

impl fmt::Display for CharacterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str())
    }
}

/// What kind of traffic a channel accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Chat messages only
    Chat,
    /// Roleplay advertisements only
    Ads,
    /// Both chat and ads
    Both,
    /// Server sent a mode string we do not recognize
    Unknown,
}

impl ChannelMode {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            ChannelMode::Chat => "chat",
            ChannelMode::Ads => "ads",
            ChannelMode::Both => "both",
            ChannelMode::Unknown => "unknown",
        }
    }

    /// Human-readable description used in mode-change notices.
    pub fn describe(self) -> &'static str {
        match self {
            ChannelMode::Chat => "chat only",
            ChannelMode::Ads => "ads only",
            ChannelMode::Both => "chat and ads",
            ChannelMode::Unknown => "unknown",
        }
    }
}

impl FromStr for ChannelMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat" => Ok(ChannelMode::Chat),
            "ads" => Ok(ChannelMode::Ads),
            "both" => Ok(ChannelMode::Both),
            _ => Err(DomainError::parse(format!("unknown channel mode '{s}'"))),
        }
    }
}

/// Typing indicator state for a private-message partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypingStatus {
    Typing,
    Paused,
    Clear,
}

impl TypingStatus {
    pub fn as_wire_str(self) -> &'static str {
        match self {
            TypingStatus::Typing => "typing",
            TypingStatus::Paused => "paused",
            TypingStatus::Clear => "clear",
        }
    }
}

impl FromStr for TypingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "typing" => Ok(TypingStatus::Typing),
            "paused" => Ok(TypingStatus::Paused),
            "clear" => Ok(TypingStatus::Clear),
            _ => Err(DomainError::parse(format!("unknown typing status '{s}'"))),
        }
    }
}

/// Classifies a formatted message for routing and presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    Chat,
    RpAd,
    System,
    Report,
    Error,
    Roll,
    Note,
    Bookmark,
    Friend,
    Kick,
    KickBan,
    Timeout,
    ChannelMode,
    ChannelInvite,
    Login,
    /// Local rejection of a user action (not connected, wrong mode, ...)
    Feedback,
    Broadcast,
}

/// Whether a known-channel summary came from the public list or the
/// user-created open room list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelKind {
    Public,
    Private,
}

/// One row of the server's channel listing (CHA / ORS).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub kind: ChannelKind,
    pub name: String,
    pub title: String,
    pub members: u32,
}

impl ChannelSummary {
    pub fn public(name: impl Into<String>, members: u32) -> Self {
        let name = name.into();
        Self {
            kind: ChannelKind::Public,
            title: name.clone(),
            name,
            members,
        }
    }

    pub fn private(name: impl Into<String>, title: impl Into<String>, members: u32) -> Self {
        Self {
            kind: ChannelKind::Private,
            name: name.into(),
            title: title.into(),
            members,
        }
    }
}
