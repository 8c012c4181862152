//! Character entity - one online character in the session's world view.
//!
//! Characters are owned exclusively by the session's entity store; channels
//! refer to them by name only. The operator flag is a cache of global
//! operator-list membership and is kept in sync by the session whenever that
//! list changes.

use serde::{Deserialize, Serialize};

use crate::types::{CharacterStatus, Gender};

/// An online character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    /// Unique, case-sensitive name.
    pub name: String,
    pub gender: Gender,
    pub status: CharacterStatus,
    pub status_message: String,
    /// Whether this character is on the session's friends list.
    pub is_friend: bool,
    /// Cached global operator flag; derived from the operator list.
    pub is_chat_op: bool,
    /// Custom kink entries streamed via the KID sub-protocol, in arrival order.
    custom_kinks: Vec<(String, String)>,
    /// Profile entries streamed via the PRD sub-protocol, in arrival order.
    profile_data: Vec<(String, String)>,
}

impl Character {
    pub fn new(name: impl Into<String>, is_friend: bool) -> Self {
        Self {
            name: name.into(),
            gender: Gender::OfflineUnknown,
            status: CharacterStatus::Online,
            status_message: String::new(),
            is_friend,
            is_chat_op: false,
            custom_kinks: Vec::new(),
            profile_data: Vec::new(),
        }
    }

    /// Color for the character's name link, derived from gender.
    pub fn name_color(&self) -> &'static str {
        self.gender.color()
    }

    /// Client-internal hyperlink target for this character's profile.
    pub fn profile_url(&self) -> String {
        profile_url(&self.name)
    }

    // Profile data streams (KID / PRD) arrive as start / entries / end;
    // `clear` is called on start so a re-request replaces stale data.

    pub fn clear_custom_kinks(&mut self) {
        self.custom_kinks.clear();
    }

    pub fn add_custom_kink(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.custom_kinks.push((key.into(), value.into()));
    }

    pub fn custom_kinks(&self) -> &[(String, String)] {
        &self.custom_kinks
    }

    pub fn clear_profile_data(&mut self) {
        self.profile_data.clear();
    }

    pub fn add_profile_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.profile_data.push((key.into(), value.into()));
    }

    pub fn profile_data(&self) -> &[(String, String)] {
        &self.profile_data
    }
}

/// Link target for a character name, usable even when the character entity
/// is unknown (offline senders, staff reports).
pub fn profile_url(name: &str) -> String {
    format!("#/profile/{name}")
}
