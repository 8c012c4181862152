//! Inbound frame dispatch.
//!
//! One handler per server command. Handlers return `Err(Inconsistency)` when
//! a frame references state the session does not have; the dispatcher logs
//! every inconsistency with the raw frame attached and keeps the connection
//! alive. Lenient fallbacks (unrecognized genders, statuses, modes) are
//! logged inline and degrade to a neutral value instead of dropping the
//! frame.

use serde_json::Value;
use tracing::{debug, warn};

use emberchat_domain::{
    ChannelMode, ChannelSummary, CharacterStatus, Gender, MessageKind, TypingStatus, ADHOC_PREFIX,
};
use emberchat_protocol::{decode, FieldError, FieldMap};

use crate::error::Inconsistency;
use crate::message::{character_link, Message};
use crate::session::{Session, AD_PREFIX, INVITE_PREFIX};

impl Session {
    /// Entry point for one inbound frame.
    pub fn on_frame(&mut self, frame: &str) {
        let (code, fields) = match decode(frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                warn!(%err, frame, "dropping undecodable frame");
                return;
            }
        };
        let result = match code.as_str() {
            "ADL" => self.handle_operator_list(&fields),
            "AOP" => self.handle_operator_add(&fields),
            "DOP" => self.handle_operator_remove(&fields),
            "BRO" => self.handle_broadcast(&fields),
            "CBU" => self.handle_channel_removal(&fields, MessageKind::KickBan),
            "CKU" => self.handle_channel_removal(&fields, MessageKind::Kick),
            "CTU" => self.handle_channel_removal(&fields, MessageKind::Timeout),
            "CDS" => self.handle_channel_description(&fields),
            "CHA" => self.handle_public_channel_list(&fields),
            "CIU" => self.handle_channel_invite(&fields),
            "COL" => self.handle_channel_operator_list(&fields),
            "COA" => self.handle_channel_operator_add(&fields),
            "COR" => self.handle_channel_operator_remove(&fields),
            "CON" => self.handle_user_count(&fields),
            "CSO" => self.handle_channel_owner_change(&fields),
            "ERR" => self.handle_server_error(&fields),
            "FLN" => self.handle_character_offline(&fields),
            "FRL" => self.handle_friends_list(&fields),
            "HLO" => self.handle_greeting(&fields),
            "ICH" => self.handle_channel_roster(&fields),
            "IDN" => self.handle_identified(&fields),
            "IGN" => self.handle_ignore_update(&fields),
            "JCH" => self.handle_channel_join(&fields),
            "KID" => self.handle_kink_data(&fields),
            "LCH" => self.handle_channel_leave(&fields),
            "LIS" => self.handle_character_batch(&fields),
            "LRP" => self.handle_channel_advertisement(&fields),
            "MSG" => self.handle_channel_message(&fields),
            "NLN" => self.handle_character_online(&fields),
            "ORS" => self.handle_open_room_list(&fields),
            "PIN" => self.handle_ping(),
            "PRD" => self.handle_profile_data(&fields),
            "PRI" => self.handle_private_message(&fields),
            "RLL" => self.handle_roll_result(&fields),
            "RMO" => self.handle_channel_mode_change(&fields),
            "RTB" => self.handle_bridge_event(&fields),
            "SFC" => self.handle_staff_alert(&fields),
            "STA" => self.handle_status_change(&fields),
            "SYS" => self.handle_system_notice(&fields),
            "TPN" => self.handle_typing_status(&fields),
            "UPT" => self.handle_uptime(&fields),
            "VAR" => self.handle_server_variable(&fields),
            "ZZZ" => self.handle_debug_reply(&fields),
            _ => {
                debug!(code = code.as_str(), frame, "unhandled command");
                Ok(())
            }
        };
        if let Err(inconsistency) = result {
            warn!(
                code = code.as_str(),
                frame,
                %inconsistency,
                "inbound frame inconsistent with session state"
            );
        }
    }

    // =============================================================================
    // Operators, friends, ignores
    // =============================================================================

    fn handle_operator_list(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let ops = fields.string_list("ops")?;
        self.store.replace_operators(ops.clone());
        for op in &ops {
            self.observer
                .set_chat_operator(&self.config.character, op, true);
        }
        Ok(())
    }

    fn handle_operator_add(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        self.store.add_operator(character);
        self.observer
            .set_chat_operator(&self.config.character, character, true);
        Ok(())
    }

    fn handle_operator_remove(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        self.store.remove_operator(character);
        self.observer
            .set_chat_operator(&self.config.character, character, false);
        Ok(())
    }

    fn handle_friends_list(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        // Idempotent: the server may resend the list, and bookmark updates
        // arrive through the bridge as well.
        for name in fields.string_list("characters")? {
            self.store.add_friend(&name);
        }
        Ok(())
    }

    fn handle_ignore_update(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let action = fields.string("action")?;
        match action {
            "init" => {
                let characters = fields.string_list("characters")?;
                self.store.set_ignore_list(characters);
                self.observer
                    .notify_ignore_list(&self.config.character, self.store.ignore_list());
            }
            "add" => {
                let character = fields.string("character")?;
                if !self.store.add_ignore(character) {
                    warn!(character, "ignore add for already ignored character");
                }
                self.observer
                    .notify_ignore_add(&self.config.character, character);
            }
            "delete" => {
                let character = fields.string("character")?;
                if !self.store.remove_ignore(character) {
                    warn!(character, "ignore delete for character not on the list");
                }
                self.observer
                    .notify_ignore_remove(&self.config.character, character);
            }
            _ => return Err(Inconsistency::other(format!("unknown ignore action '{action}'"))),
        }
        Ok(())
    }

    // =============================================================================
    // Presence
    // =============================================================================

    fn handle_character_online(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let name = fields.string("identity")?;
        let gender = parse_gender(fields.string("gender")?, name);
        let status = parse_status(fields.string("status")?, name);
        let character = self.store.add_character(name);
        character.gender = gender;
        character.status = status;
        self.observer
            .notify_character_online(&self.config.character, name, true);
        Ok(())
    }

    fn handle_character_batch(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        for row in fields.list("characters")? {
            let Some(entry) = row.as_array() else {
                warn!("character batch row is not an array");
                continue;
            };
            let Some(name) = entry.first().and_then(Value::as_str) else {
                warn!("character batch row has no name");
                continue;
            };
            let gender = parse_gender(entry.get(1).and_then(Value::as_str).unwrap_or("None"), name);
            let status =
                parse_status(entry.get(2).and_then(Value::as_str).unwrap_or("online"), name);
            let status_message = entry.get(3).and_then(Value::as_str).unwrap_or("");
            let character = self.store.add_character(name);
            character.gender = gender;
            character.status = status;
            character.status_message = status_message.to_string();
            self.observer
                .notify_character_online(&self.config.character, name, true);
        }
        Ok(())
    }

    fn handle_character_offline(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        if !self.store.is_character_online(character) {
            return Err(Inconsistency::UnknownCharacter(character.to_string()));
        }
        let rooms: Vec<String> = self
            .store
            .channels()
            .filter(|channel| channel.is_member(character))
            .map(|channel| channel.name.clone())
            .collect();
        for room in &rooms {
            self.observer
                .notify_channel_member_left(&self.config.character, room, character);
        }
        self.observer
            .notify_character_online(&self.config.character, character, false);
        self.store.remove_character(character);
        Ok(())
    }

    fn handle_status_change(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let name = fields.string("character")?;
        let status = parse_status(fields.string("status")?, name);
        // Crown rewards arrive without a status message; keep the old one.
        let status_message = fields.opt_string("statusmsg").map(str::to_string);
        let character = self
            .store
            .character_mut(name)
            .ok_or_else(|| Inconsistency::UnknownCharacter(name.to_string()))?;
        character.status = status;
        if let Some(message) = status_message {
            character.status_message = message;
        }
        self.observer
            .notify_character_status_update(&self.config.character, name);
        Ok(())
    }

    fn handle_typing_status(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let name = fields.string("character")?;
        let status_str = fields.string("status")?;
        if !self.store.is_character_online(name) {
            return Err(Inconsistency::UnknownCharacter(name.to_string()));
        }
        let status = status_str.parse::<TypingStatus>().unwrap_or_else(|err| {
            warn!(%err, character = name, "unrecognized typing status");
            TypingStatus::Clear
        });
        self.observer
            .set_character_typing_status(&self.config.character, name, status);
        Ok(())
    }

    // =============================================================================
    // Channel membership
    // =============================================================================

    fn handle_channel_roster(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?.to_string();
        let users = fields.object_list("users")?;
        let mode_str = fields.string("mode")?;
        let title = if channel_name.starts_with(ADHOC_PREFIX) {
            fields.string_or("title", &channel_name).to_string()
        } else {
            channel_name.clone()
        };
        let mode = mode_str.parse::<ChannelMode>().unwrap_or_else(|err| {
            warn!(%err, channel = %channel_name, "unrecognized channel mode");
            ChannelMode::Unknown
        });

        self.store.add_channel(&channel_name, &title).mode = mode;
        self.observer
            .add_channel(&self.config.character, &channel_name, &title);
        self.observer
            .set_channel_mode(&self.config.character, &channel_name, mode);

        for user in &users {
            let name = match user.string("identity") {
                Ok(name) => name,
                Err(err) => {
                    warn!(%err, channel = %channel_name, "skipping malformed roster entry");
                    continue;
                }
            };
            // One bad entry never discards the rest of the roster.
            if !self.store.is_character_online(name) {
                warn!(character = name, channel = %channel_name, "roster lists unknown character");
                continue;
            }
            if let Some(channel) = self.store.channel_mut(&channel_name) {
                channel.add_member(name, false);
            }
        }
        self.observer
            .notify_channel_ready(&self.config.character, &channel_name);
        Ok(())
    }

    fn handle_channel_join(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?.to_string();
        let identity = fields
            .raw("character")
            .and_then(Value::as_object)
            .and_then(|obj| obj.get("identity"))
            .and_then(Value::as_str)
            .ok_or_else(|| FieldError::Missing("character.identity".to_string()))?
            .to_string();
        let title = if channel_name.starts_with(ADHOC_PREFIX) {
            fields.string_or("title", &channel_name).to_string()
        } else {
            channel_name.clone()
        };

        let is_self = identity == self.config.character;
        let channel = self.store.add_channel(&channel_name, &title);
        channel.add_member(&identity, true);
        if is_self {
            channel.join();
        }
        self.observer
            .add_channel(&self.config.character, &channel_name, &title);
        self.observer
            .notify_channel_member_joined(&self.config.character, &channel_name, &identity);
        Ok(())
    }

    fn handle_channel_leave(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        let character = fields.string("character")?;
        let channel = self
            .store
            .channel_mut(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        channel.remove_member(character);
        if character == self.config.character {
            // Entity retained: rejoin keeps title, mode, and description.
            channel.leave();
        }
        self.observer
            .notify_channel_member_left(&self.config.character, channel_name, character);
        Ok(())
    }

    /// CKU, CBU, and CTU share shape: a moderator removes a member.
    fn handle_channel_removal(
        &mut self,
        fields: &FieldMap,
        kind: MessageKind,
    ) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        let operator = fields.string("operator")?;
        let character = fields.string("character")?;
        let channel = self
            .store
            .channel(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        if !channel.is_joined() {
            return Err(Inconsistency::NotJoined(channel_name.to_string()));
        }
        if !channel.is_member(character) {
            return Err(Inconsistency::NotPresent(
                character.to_string(),
                channel_name.to_string(),
            ));
        }
        if !channel.is_operator(operator) && !self.store.is_character_operator(operator) {
            // The server is authoritative; note the oddity and proceed.
            warn!(operator, channel = channel_name, "removal by non-operator");
        }
        let text = match kind {
            MessageKind::Timeout => {
                let length = fields.int("length")?;
                format!(
                    "<b>{operator}</b> has timed out <b>{character}</b> from {} for {length} seconds.",
                    channel.title
                )
            }
            MessageKind::KickBan => format!(
                "<b>{operator}</b> has kicked and banned <b>{character}</b> from {}.",
                channel.title
            ),
            _ => format!(
                "<b>{operator}</b> has kicked <b>{character}</b> from {}.",
                channel.title
            ),
        };

        let is_self = character == self.config.character;
        // The moderator flag reflects our own standing in the room; being
        // the target always counts.
        let is_moderator = is_self || channel.is_operator(&self.config.character);
        self.observer.message_channel(
            &self.config.character,
            channel_name,
            &text,
            kind,
            is_moderator,
            is_self,
        );
        if let Some(channel) = self.store.channel_mut(channel_name) {
            channel.remove_member(character);
            if is_self {
                channel.leave();
            }
        }
        if !is_self {
            self.observer
                .notify_channel_member_left(&self.config.character, channel_name, character);
        }
        Ok(())
    }

    // =============================================================================
    // Channel metadata
    // =============================================================================

    fn handle_channel_description(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        let description = fields.string("description")?;
        let channel = self
            .store
            .channel_mut(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        channel.description = description.to_string();
        self.observer
            .set_channel_description(&self.config.character, channel_name, description);
        Ok(())
    }

    fn handle_channel_mode_change(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        let mode_str = fields.string("mode")?;
        let mode = mode_str
            .parse::<ChannelMode>()
            .map_err(|_| Inconsistency::other(format!("unknown channel mode '{mode_str}'")))?;
        let channel = self
            .store
            .channel_mut(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        channel.mode = mode;
        let title = channel.title.clone();
        self.observer
            .set_channel_mode(&self.config.character, channel_name, mode);
        let notice = self.markup.to_html(&format!(
            "[session={title}]{channel_name}[/session] now allows: {}.",
            mode.describe()
        ));
        self.observer.message_channel(
            &self.config.character,
            channel_name,
            &notice,
            MessageKind::ChannelMode,
            true,
            false,
        );
        Ok(())
    }

    fn handle_channel_operator_list(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        // First entry is the channel owner.
        let operators = fields.string_list("oplist")?;
        let channel = self
            .store
            .channel_mut(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        channel.set_operators(operators);
        Ok(())
    }

    fn handle_channel_operator_add(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        let character = fields.string("character")?;
        let channel = self
            .store
            .channel_mut(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        channel.add_operator(character);
        self.observer.message_channel(
            &self.config.character,
            channel_name,
            &format!("<b>{character}</b> is now a channel operator."),
            MessageKind::System,
            true,
            false,
        );
        Ok(())
    }

    fn handle_channel_operator_remove(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let channel_name = fields.string("channel")?;
        let character = fields.string("character")?;
        let channel = self
            .store
            .channel_mut(channel_name)
            .ok_or_else(|| Inconsistency::UnknownChannel(channel_name.to_string()))?;
        channel.remove_operator(character);
        self.observer.message_channel(
            &self.config.character,
            channel_name,
            &format!("<b>{character}</b> is no longer a channel operator."),
            MessageKind::System,
            true,
            false,
        );
        Ok(())
    }

    fn handle_channel_owner_change(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        let channel_name = fields.string("channel")?.to_string();
        if self.store.channel(&channel_name).is_none() {
            return Err(Inconsistency::UnknownChannel(channel_name));
        }
        self.observer.message_channel(
            &self.config.character,
            &channel_name,
            &format!("<b>{character}</b> is now the channel owner."),
            MessageKind::System,
            true,
            false,
        );
        // The owner sits at the head of the operator list; re-fetch it.
        self.request_channel_operator_list(&channel_name);
        Ok(())
    }

    fn handle_channel_invite(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let sender = fields.string("sender")?;
        let title = fields.string("title")?;
        let name = fields.string("name")?;
        if !self.store.is_character_online(sender) {
            return Err(Inconsistency::UnknownCharacter(sender.to_string()));
        }
        let raw = format!("/me has invited you to [session={title}]{name}[/session].");
        let line = self.build_line(&raw, sender, None, INVITE_PREFIX);
        self.observer
            .message_system(&self.config.character, &line, MessageKind::ChannelInvite);
        Ok(())
    }

    // =============================================================================
    // Channel listings
    // =============================================================================

    fn handle_public_channel_list(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let mut channels = Vec::new();
        for row in fields.object_list("channels")? {
            let name = row.string("name")?.to_string();
            let members = row.int("characters").unwrap_or(0).max(0) as u32;
            channels.push(ChannelSummary::public(name, members));
        }
        self.store.replace_known_channels(channels);
        self.observer
            .update_known_channel_list(&self.config.character, self.store.known_channels());
        Ok(())
    }

    fn handle_open_room_list(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let mut channels = Vec::new();
        for row in fields.object_list("channels")? {
            let name = row.string("name")?.to_string();
            let title = row.string_or("title", &name).to_string();
            let members = row.int("characters").unwrap_or(0).max(0) as u32;
            channels.push(ChannelSummary::private(name, title, members));
        }
        self.store.replace_open_rooms(channels);
        self.observer
            .update_open_room_list(&self.config.character, self.store.open_rooms());
        Ok(())
    }

    // =============================================================================
    // Chat traffic
    // =============================================================================

    fn handle_channel_message(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        self.deliver_channel_line(fields, MessageKind::Chat, "")
    }

    fn handle_channel_advertisement(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        self.deliver_channel_line(fields, MessageKind::RpAd, AD_PREFIX)
    }

    fn deliver_channel_line(
        &mut self,
        fields: &FieldMap,
        kind: MessageKind,
        prefix: &str,
    ) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        let channel_name = fields.string("channel")?;
        let raw = fields.string("message")?;
        if self.store.channel(channel_name).is_none() {
            return Err(Inconsistency::UnknownChannel(channel_name.to_string()));
        }
        if !self.store.is_character_online(character) {
            return Err(Inconsistency::UnknownCharacter(character.to_string()));
        }
        if self.store.is_character_ignored(character) {
            return Ok(());
        }
        let body = self.build_line(raw, character, Some(channel_name), prefix);
        let message = Message::new(kind, body)
            .from_session(self.config.character.as_str())
            .from_channel(channel_name)
            .from_character(character)
            .to_channel(channel_name);
        self.observer.message(&message);
        Ok(())
    }

    fn handle_private_message(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        let raw = fields.string("message")?;
        if !self.store.is_character_online(character) {
            return Err(Inconsistency::UnknownCharacter(character.to_string()));
        }
        if self.store.is_character_ignored(character) {
            return Ok(());
        }
        self.observer
            .add_character_chat(&self.config.character, character);
        let body = self.build_line(raw, character, None, "");
        let message = Message::new(MessageKind::Chat, body)
            .from_session(self.config.character.as_str())
            .from_character(character)
            .to_character(character)
            .to_notify();
        self.observer.message(&message);
        Ok(())
    }

    fn handle_roll_result(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let text = fields.string("message")?.to_string();
        let character = fields.string("character")?;
        match fields.opt_string("channel") {
            Some(channel_name) if !channel_name.is_empty() => {
                if self.store.channel(channel_name).is_none() {
                    return Err(Inconsistency::UnknownChannel(channel_name.to_string()));
                }
                if self.store.is_character_ignored(character) {
                    return Ok(());
                }
                let rendered = self.markup.to_html(&text);
                self.observer.message_channel(
                    &self.config.character,
                    channel_name,
                    &rendered,
                    MessageKind::Roll,
                    false,
                    character == self.config.character,
                );
            }
            _ => {
                // Private roll: the conversation partner is the roller,
                // unless we rolled, in which case it is the recipient.
                let partner = if character == self.config.character {
                    fields.string("recipient")?
                } else {
                    character
                };
                if self.store.is_character_ignored(partner) {
                    return Ok(());
                }
                self.observer
                    .add_character_chat(&self.config.character, partner);
                let rendered = self.markup.to_html(&text);
                let message = Message::new(MessageKind::Roll, rendered)
                    .from_session(self.config.character.as_str())
                    .from_character(character)
                    .to_character(partner)
                    .to_notify();
                self.observer.message(&message);
            }
        }
        Ok(())
    }

    // =============================================================================
    // Server notices
    // =============================================================================

    fn handle_broadcast(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let message = fields.string("message")?;
        let rendered = format!("<b>Broadcast message:</b> {}", self.markup.to_html(message));
        self.observer
            .message_all(&self.config.character, &rendered, MessageKind::Broadcast);
        Ok(())
    }

    fn handle_system_notice(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let message = fields.string("message")?;
        let rendered = format!("<b>System message:</b> {}", self.markup.to_html(message));
        self.observer
            .message_system(&self.config.character, &rendered, MessageKind::System);
        Ok(())
    }

    fn handle_user_count(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let count = fields.int("count")?;
        self.observer.message_system(
            &self.config.character,
            &format!("{count} users are currently connected."),
            MessageKind::Login,
        );
        Ok(())
    }

    fn handle_greeting(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let message = fields.string("message")?;
        self.observer.message_system(
            &self.config.character,
            &format!("<b>{message}</b>"),
            MessageKind::Login,
        );
        for channel in self.config.autojoin_channels.clone() {
            self.join_channel(&channel);
        }
        Ok(())
    }

    fn handle_identified(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let character = fields.string("character")?;
        if character != self.config.character {
            warn!(
                expected = %self.config.character,
                received = character,
                "identified as a different character"
            );
        }
        self.observer.message_system(
            &self.config.character,
            &format!("<b>{character}</b> connected."),
            MessageKind::Login,
        );
        self.request_server_uptime();
        Ok(())
    }

    fn handle_server_error(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let number = fields.int("number")?;
        let message = fields.string("message")?;
        self.observer.message_system(
            &self.config.character,
            &format!("<b>Error {number}:</b> {message}"),
            MessageKind::Error,
        );
        // Error 34: identity in limbo after a dirty disconnect; identifying
        // again reclaims it.
        if number == 34 {
            self.send_identify();
        }
        Ok(())
    }

    fn handle_uptime(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let start = fields.int("starttime")?;
        let users = fields.int("users")?;
        let max_users = fields.int("maxusers")?;
        let channels = fields.int("channels")?;
        let accepted = fields.int("accepted")?;
        let started = chrono::DateTime::from_timestamp(start, 0)
            .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| start.to_string());
        self.observer.message_system(
            &self.config.character,
            &format!(
                "<b>Server status:</b> up since {started}, {users} users online (peak {max_users}), \
                 {channels} channels, {accepted} connections accepted."
            ),
            MessageKind::System,
        );
        Ok(())
    }

    fn handle_server_variable(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let variable = fields.string("variable")?;
        let value = fields
            .raw("value")
            .ok_or_else(|| FieldError::Missing("value".to_string()))?;
        let rendered = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        debug!(variable, value = %rendered, "server variable");
        self.store.set_server_variable(variable, rendered);
        Ok(())
    }

    fn handle_ping(&mut self) -> Result<(), Inconsistency> {
        self.send("PIN", FieldMap::new());
        Ok(())
    }

    fn handle_debug_reply(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let message = fields.string("message")?;
        self.observer.message_system(
            &self.config.character,
            &format!("<b>Debug reply:</b> {message}"),
            MessageKind::System,
        );
        Ok(())
    }

    // =============================================================================
    // Staff alerts
    // =============================================================================

    fn handle_staff_alert(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let action = fields.string("action")?;
        match action {
            "report" => {
                let callid = fields.int("callid")?;
                let character = fields.string("character")?;
                let report = fields.string("report")?;
                let mut text = format!(
                    "<b>Staff alert</b> from {}: {}",
                    character_link(character, self.store.character(character)),
                    self.markup.to_html(report)
                );
                if let Ok(logid) = fields.int("logid") {
                    text.push_str(&format!(" <a href=\"#/log/{logid}\">[view log]</a>"));
                }
                text.push_str(&format!(" <a href=\"#/confirm/{callid}\">[confirm]</a>"));
                self.observer
                    .message_system(&self.config.character, &text, MessageKind::Report);
            }
            "confirm" => {
                let moderator = fields.string("moderator")?;
                let character = fields.string("character")?;
                self.observer.message_system(
                    &self.config.character,
                    &format!("<b>{moderator}</b> is handling <b>{character}</b>'s report."),
                    MessageKind::Report,
                );
            }
            _ => {
                return Err(Inconsistency::other(format!(
                    "unknown staff alert action '{action}'"
                )))
            }
        }
        Ok(())
    }

    // =============================================================================
    // Profile data streams
    // =============================================================================

    fn handle_kink_data(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let kind = fields.string("type")?;
        let name = fields.string("character")?;
        match kind {
            "start" => {
                self.store
                    .character_mut(name)
                    .ok_or_else(|| Inconsistency::UnknownCharacter(name.to_string()))?
                    .clear_custom_kinks();
            }
            "custom" => {
                let key = fields.string("key")?;
                let value = fields.string("value")?;
                self.store
                    .character_mut(name)
                    .ok_or_else(|| Inconsistency::UnknownCharacter(name.to_string()))?
                    .add_custom_kink(key, value);
            }
            "end" => {
                if !self.store.is_character_online(name) {
                    return Err(Inconsistency::UnknownCharacter(name.to_string()));
                }
                self.observer
                    .notify_character_custom_kinks_updated(&self.config.character, name);
            }
            _ => {
                return Err(Inconsistency::other(format!(
                    "unknown kink data type '{kind}'"
                )))
            }
        }
        Ok(())
    }

    fn handle_profile_data(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let kind = fields.string("type")?;
        let name = fields.string("character")?;
        match kind {
            "start" => {
                self.store
                    .character_mut(name)
                    .ok_or_else(|| Inconsistency::UnknownCharacter(name.to_string()))?
                    .clear_profile_data();
            }
            "info" => {
                let key = fields.string("key")?;
                let value = fields.string("value")?;
                self.store
                    .character_mut(name)
                    .ok_or_else(|| Inconsistency::UnknownCharacter(name.to_string()))?
                    .add_profile_data(key, value);
            }
            "select" => {}
            "end" => {
                if !self.store.is_character_online(name) {
                    return Err(Inconsistency::UnknownCharacter(name.to_string()));
                }
                self.observer
                    .notify_character_profile_updated(&self.config.character, name);
            }
            _ => {
                return Err(Inconsistency::other(format!(
                    "unknown profile data type '{kind}'"
                )))
            }
        }
        Ok(())
    }

    // =============================================================================
    // Bridge events
    // =============================================================================

    /// Account-level events relayed from the website (notes, bookmarks,
    /// friendship changes). Names arrive exactly as stored server-side.
    fn handle_bridge_event(&mut self, fields: &FieldMap) -> Result<(), Inconsistency> {
        let kind = fields.string("type")?;
        match kind {
            "note" => {
                let sender = fields.string("sender")?;
                let subject = fields.string("subject")?;
                let id = fields.int("id")?;
                let text = format!(
                    "Note received from {}: <a href=\"#/note/{id}\">{subject}</a>",
                    character_link(sender, self.store.character(sender))
                );
                let message = Message::new(MessageKind::Note, text)
                    .from_session(self.config.character.as_str())
                    .from_character(sender)
                    .to_character(sender)
                    .to_notify();
                self.observer.message(&message);
            }
            "trackadd" => {
                let name = fields.string("name")?;
                self.store.add_friend(name);
                self.bridge_notice(name, "has been added to your bookmarks", MessageKind::Bookmark);
            }
            "trackrem" => {
                let name = fields.string("name")?;
                self.bridge_notice(
                    name,
                    "has been removed from your bookmarks",
                    MessageKind::Bookmark,
                );
            }
            "friendrequest" => {
                let name = fields.string("name")?;
                self.bridge_notice(name, "has sent you a friend request", MessageKind::Friend);
            }
            "friendadd" => {
                let name = fields.string("name")?;
                self.store.add_friend(name);
                self.bridge_notice(name, "is now your friend", MessageKind::Friend);
            }
            "friendremove" => {
                let name = fields.string("name")?;
                self.bridge_notice(name, "is no longer your friend", MessageKind::Friend);
            }
            _ => {
                self.observer.message_system(
                    &self.config.character,
                    &format!("Unknown bridge event type: '{kind}'."),
                    MessageKind::Error,
                );
            }
        }
        Ok(())
    }

    /// Bridge notices are routed to the character's conversation view as
    /// well as the console, so they land where the user last spoke to them.
    fn bridge_notice(&self, name: &str, what: &str, kind: MessageKind) {
        let text = format!("{} {what}.", character_link(name, self.store.character(name)));
        let message = Message::new(kind, text)
            .from_session(self.config.character.as_str())
            .from_character(name)
            .to_character(name)
            .to_console()
            .to_notify();
        self.observer.message(&message);
    }
}

// Lenient wire-value parsing: the server is authoritative, so unrecognized
// values degrade to a neutral default instead of discarding the frame.

fn parse_gender(raw: &str, character: &str) -> Gender {
    raw.parse::<Gender>().unwrap_or_else(|err| {
        warn!(%err, character, "unrecognized gender");
        Gender::OfflineUnknown
    })
}

fn parse_status(raw: &str, character: &str) -> CharacterStatus {
    raw.parse::<CharacterStatus>().unwrap_or_else(|err| {
        warn!(%err, character, "unrecognized status");
        CharacterStatus::Online
    })
}
