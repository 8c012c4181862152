//! Entity store - the session's in-memory model of the chat world.
//!
//! Holds every character and channel the session currently knows about,
//! plus the auxiliary lists the server pushes: global operators, friends,
//! ignores, server variables, and the two channel listings.
//!
//! Case rules differ by list and are enforced here so handlers never have
//! to remember them: operator and ignore lookups are case-insensitive
//! (keyed on the lowercased name), while character and friend lookups use
//! the exact name the server sent.

use std::collections::HashMap;

use emberchat_domain::{Channel, ChannelSummary, Character};

#[derive(Debug, Default)]
pub struct EntityStore {
    characters: HashMap<String, Character>,
    channels: HashMap<String, Channel>,
    /// Global operators, lowercased name -> display name.
    operators: HashMap<String, String>,
    friends: Vec<String>,
    /// Ignored characters, stored lowercased.
    ignores: Vec<String>,
    server_variables: HashMap<String, String>,
    known_channels: Vec<ChannelSummary>,
    open_rooms: Vec<ChannelSummary>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------------------------------------------------------------------
    // Characters
    // -------------------------------------------------------------------------

    /// Get or create the character entity for `name`.
    ///
    /// New entities are seeded with the friend flag and the cached global
    /// operator flag, so list state established before the character came
    /// online is reflected immediately.
    pub fn add_character(&mut self, name: &str) -> &mut Character {
        let is_friend = self.friends.iter().any(|f| f == name);
        let is_operator = self.operators.contains_key(&name.to_lowercase());
        self.characters.entry(name.to_string()).or_insert_with(|| {
            let mut character = Character::new(name, is_friend);
            character.is_chat_op = is_operator;
            character
        })
    }

    /// Drop a character that went offline, removing them from every channel
    /// roster first.
    pub fn remove_character(&mut self, name: &str) -> bool {
        for channel in self.channels.values_mut() {
            channel.remove_member(name);
        }
        self.characters.remove(name).is_some()
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    pub fn character_mut(&mut self, name: &str) -> Option<&mut Character> {
        self.characters.get_mut(name)
    }

    pub fn is_character_online(&self, name: &str) -> bool {
        self.characters.contains_key(name)
    }

    pub fn character_count(&self) -> usize {
        self.characters.len()
    }

    // -------------------------------------------------------------------------
    // Channels
    // -------------------------------------------------------------------------

    /// Get or create the channel entity for `name`. An existing entity gets
    /// its title refreshed; everything else (mode, description, members) is
    /// kept, which is what makes leave-then-rejoin cheap.
    pub fn add_channel(&mut self, name: &str, title: &str) -> &mut Channel {
        let channel = self
            .channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(name, title));
        channel.title = title.to_string();
        channel
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(name)
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    // -------------------------------------------------------------------------
    // Global operators
    // -------------------------------------------------------------------------

    /// Replace the whole global operator list, resyncing the cached flag on
    /// every online character.
    pub fn replace_operators(&mut self, names: Vec<String>) {
        for display in self.operators.values() {
            if let Some(character) = self.characters.get_mut(display) {
                character.is_chat_op = false;
            }
        }
        self.operators.clear();
        for name in names {
            self.add_operator(&name);
        }
    }

    pub fn add_operator(&mut self, name: &str) {
        self.operators.insert(name.to_lowercase(), name.to_string());
        if let Some(character) = self.characters.get_mut(name) {
            character.is_chat_op = true;
        }
    }

    pub fn remove_operator(&mut self, name: &str) {
        self.operators.remove(&name.to_lowercase());
        if let Some(character) = self.characters.get_mut(name) {
            character.is_chat_op = false;
        }
    }

    pub fn is_character_operator(&self, name: &str) -> bool {
        self.operators.contains_key(&name.to_lowercase())
    }

    // -------------------------------------------------------------------------
    // Friends
    // -------------------------------------------------------------------------

    /// Record a friend, keeping the name exactly as given. Duplicate adds
    /// are ignored; an already-online character gets its flag set.
    pub fn add_friend(&mut self, name: &str) {
        if !self.friends.iter().any(|f| f == name) {
            self.friends.push(name.to_string());
        }
        if let Some(character) = self.characters.get_mut(name) {
            character.is_friend = true;
        }
    }

    pub fn is_friend(&self, name: &str) -> bool {
        self.friends.iter().any(|f| f == name)
    }

    pub fn friends(&self) -> &[String] {
        &self.friends
    }

    // -------------------------------------------------------------------------
    // Ignores
    // -------------------------------------------------------------------------

    /// Replace the ignore list wholesale (initial sync).
    pub fn set_ignore_list(&mut self, names: Vec<String>) {
        self.ignores = names.into_iter().map(|n| n.to_lowercase()).collect();
    }

    /// Returns `false` when the character was already ignored.
    pub fn add_ignore(&mut self, name: &str) -> bool {
        let lower = name.to_lowercase();
        if self.ignores.contains(&lower) {
            return false;
        }
        self.ignores.push(lower);
        true
    }

    /// Returns `false` when the character was not on the list.
    pub fn remove_ignore(&mut self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let before = self.ignores.len();
        self.ignores.retain(|entry| entry != &lower);
        self.ignores.len() != before
    }

    pub fn is_character_ignored(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.ignores.contains(&lower)
    }

    pub fn ignore_list(&self) -> &[String] {
        &self.ignores
    }

    // -------------------------------------------------------------------------
    // Server variables and channel listings
    // -------------------------------------------------------------------------

    pub fn set_server_variable(&mut self, key: &str, value: String) {
        self.server_variables.insert(key.to_string(), value);
    }

    pub fn server_variable(&self, key: &str) -> Option<&str> {
        self.server_variables.get(key).map(String::as_str)
    }

    pub fn replace_known_channels(&mut self, channels: Vec<ChannelSummary>) {
        self.known_channels = channels;
    }

    pub fn known_channels(&self) -> &[ChannelSummary] {
        &self.known_channels
    }

    pub fn replace_open_rooms(&mut self, channels: Vec<ChannelSummary>) {
        self.open_rooms = channels;
    }

    pub fn open_rooms(&self) -> &[ChannelSummary] {
        &self.open_rooms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_character_seeds_friend_and_operator_flags() {
        let mut store = EntityStore::new();
        store.add_friend("Alice");
        store.add_operator("Bob");

        assert!(store.add_character("Alice").is_friend);
        assert!(store.add_character("Bob").is_chat_op);
        assert!(!store.add_character("Carol").is_friend);
    }

    #[test]
    fn test_remove_character_strips_channel_rosters() {
        let mut store = EntityStore::new();
        store.add_character("Alice");
        store.add_channel("Frontpage", "Frontpage").add_member("Alice", false);

        assert!(store.remove_character("Alice"));
        assert!(!store
            .channel("Frontpage")
            .expect("channel")
            .is_member("Alice"));
        assert!(!store.is_character_online("Alice"));
    }

    #[test]
    fn test_add_channel_refreshes_title_only() {
        let mut store = EntityStore::new();
        store.add_channel("ADH-1a2b", "Tea Room").join();
        let channel = store.add_channel("ADH-1a2b", "Tea Room II");
        assert_eq!(channel.title, "Tea Room II");
        assert!(channel.is_joined());
    }

    #[test]
    fn test_operator_lookup_is_case_insensitive() {
        let mut store = EntityStore::new();
        store.add_operator("Moderator");
        assert!(store.is_character_operator("moderator"));
        assert!(store.is_character_operator("MODERATOR"));

        store.remove_operator("Moderator");
        assert!(!store.is_character_operator("moderator"));
    }

    #[test]
    fn test_replace_operators_clears_stale_flags() {
        let mut store = EntityStore::new();
        store.add_character("Alice");
        store.add_operator("Alice");
        assert!(store.character("Alice").expect("alice").is_chat_op);

        store.replace_operators(vec!["Bob".to_string()]);
        assert!(!store.character("Alice").expect("alice").is_chat_op);
        assert!(store.is_character_operator("Bob"));
    }

    #[test]
    fn test_ignore_list_is_case_insensitive_and_deduplicated() {
        let mut store = EntityStore::new();
        assert!(store.add_ignore("Pest"));
        assert!(!store.add_ignore("PEST"));
        assert!(store.is_character_ignored("pEsT"));
        assert!(store.remove_ignore("PeSt"));
        assert!(!store.is_character_ignored("Pest"));
        assert!(!store.remove_ignore("Pest"));
    }

    #[test]
    fn test_friend_names_are_case_sensitive() {
        let mut store = EntityStore::new();
        store.add_friend("Alice");
        assert!(store.is_friend("Alice"));
        assert!(!store.is_friend("alice"));
    }
}
