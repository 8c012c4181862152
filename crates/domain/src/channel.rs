//! Channel entity - a chat room the session knows about.
//!
//! Channels hold member and operator sets as character *names*; the
//! character entities themselves live in the session's registry. A channel
//! is never removed from the registry when the local identity leaves it -
//! only `joined` is cleared, so rejoin keeps title/mode/description.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::ChannelMode;

/// Prefix the server uses for ad-hoc (user-created) channel names.
pub const ADHOC_PREFIX: &str = "ADH-";

/// Per-member state tracked by a channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMember {
    /// Set when the member entered via a join notification rather than the
    /// initial room roster; cleared semantics are up to the presentation
    /// layer (the server never updates it).
    pub joined_via_invite: bool,
}

/// A chat room with title, mode, membership, and operator set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    /// Unique channel name (the wire identifier).
    pub name: String,
    /// Display title; differs from `name` for ad-hoc channels.
    pub title: String,
    pub mode: ChannelMode,
    pub description: String,
    joined: bool,
    members: HashMap<String, ChannelMember>,
    operators: Vec<String>,
}

impl Channel {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            mode: ChannelMode::Unknown,
            description: String::new(),
            joined: false,
            members: HashMap::new(),
            operators: Vec::new(),
        }
    }

    /// Ad-hoc channels have server-generated names distinct from their
    /// display titles.
    pub fn is_ad_hoc(&self) -> bool {
        self.name.starts_with(ADHOC_PREFIX)
    }

    /// Whether the local identity is currently a member.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Mark the local identity as a member.
    pub fn join(&mut self) {
        self.joined = true;
    }

    /// Mark the local identity as no longer a member. The channel entity is
    /// retained as a rejoin cache.
    pub fn leave(&mut self) {
        self.joined = false;
    }

    pub fn add_member(&mut self, name: impl Into<String>, joined_via_invite: bool) {
        self.members
            .insert(name.into(), ChannelMember { joined_via_invite });
    }

    pub fn remove_member(&mut self, name: &str) -> bool {
        self.members.remove(name).is_some()
    }

    pub fn is_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.keys().map(String::as_str)
    }

    pub fn add_operator(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.operators.contains(&name) {
            self.operators.push(name);
        }
    }

    pub fn remove_operator(&mut self, name: &str) {
        self.operators.retain(|op| op != name);
    }

    /// Replace the whole operator set (COL gives an authoritative list).
    pub fn set_operators(&mut self, names: Vec<String>) {
        self.operators = names;
        self.operators.dedup();
    }

    pub fn is_operator(&self, name: &str) -> bool {
        self.operators.iter().any(|op| op == name)
    }

    pub fn operators(&self) -> &[String] {
        &self.operators
    }
}
