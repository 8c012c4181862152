//! The session engine.
//!
//! A [`Session`] binds one character identity to one server connection. This
//! module owns the connection lifecycle and the outbound command surface;
//! inbound dispatch lives in [`handlers`].

mod handlers;

use std::sync::Arc;

use tracing::{debug, trace, warn};

use emberchat_domain::{ChannelMode, CharacterStatus, MessageKind, TypingStatus};
use emberchat_protocol::{encode, FieldMap};

use crate::config::SessionConfig;
use crate::message::{escape_html, Message, MessageBuilder, SenderRef};
use crate::ports::{MarkupParser, SessionObserver, Transport};
use crate::store::EntityStore;

/// Banner prepended to roleplay advertisements.
pub(crate) const AD_PREFIX: &str = "<font color=\"green\"><b>Roleplay ad by</b></font> ";

/// Banner prepended to channel invitations.
pub(crate) const INVITE_PREFIX: &str = "<font color=\"yellow\"><b>Channel invite:</b></font> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// One character's live connection to the chat server.
pub struct Session {
    config: SessionConfig,
    state: ConnectionState,
    store: EntityStore,
    transport: Box<dyn Transport>,
    observer: Arc<dyn SessionObserver>,
    markup: Arc<dyn MarkupParser>,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        transport: Box<dyn Transport>,
        observer: Arc<dyn SessionObserver>,
        markup: Arc<dyn MarkupParser>,
    ) -> Self {
        Self {
            config,
            state: ConnectionState::Disconnected,
            store: EntityStore::new(),
            transport,
            observer,
            markup,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Read access to the session's world model.
    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    /// The character this session speaks as; doubles as the session id in
    /// observer notifications.
    pub fn character(&self) -> &str {
        &self.config.character
    }

    // =============================================================================
    // Connection lifecycle
    // =============================================================================

    /// Begin a connection attempt. A no-op while one is already underway.
    pub fn connect(&mut self) {
        if self.state != ConnectionState::Disconnected {
            debug!(state = ?self.state, "connect ignored");
            return;
        }
        self.state = ConnectionState::Connecting;
        self.transport.connect();
    }

    /// The transport reports an open connection; identify immediately.
    pub fn on_connected(&mut self) {
        self.state = ConnectionState::Connected;
        self.send_identify();
    }

    /// The transport reports a failure or closure. Surfaced to the user
    /// once; subsequent outbound traffic is dropped with a debug log only.
    pub fn on_transport_error(&mut self, reason: &str) {
        let was_active = self.state != ConnectionState::Disconnected;
        self.state = ConnectionState::Disconnected;
        warn!(reason, "transport error");
        if was_active {
            self.observer.message_system(
                &self.config.character,
                &format!("Connection error: {reason}"),
                MessageKind::Error,
            );
        }
    }

    fn send(&mut self, code: &str, fields: FieldMap) {
        if self.state != ConnectionState::Connected {
            debug!(code, "dropping outbound frame while not connected");
            return;
        }
        let frame = encode(code, &fields);
        trace!(%frame, "send");
        self.transport.send(&frame);
    }

    fn send_identify(&mut self) {
        let fields = FieldMap::new()
            .with("method", "ticket")
            .with("account", self.config.account.as_str())
            .with("ticket", self.config.ticket.as_str())
            .with("character", self.config.character.as_str())
            .with("cname", self.config.client_name.as_str())
            .with("cversion", self.config.client_version.as_str());
        self.send("IDN", fields);
    }

    /// Local rejection of a user action, delivered as a console line.
    fn feedback(&self, text: &str) {
        self.observer
            .message_system(&self.config.character, text, MessageKind::Feedback);
    }

    /// Decorate one raw chat line as spoken by `sender_name`, resolving the
    /// sender's entity and channel-operator standing from the store.
    fn build_line(&self, raw: &str, sender_name: &str, channel: Option<&str>, prefix: &str) -> String {
        let sender = SenderRef {
            name: sender_name,
            character: self.store.character(sender_name),
            channel: channel.and_then(|name| self.store.channel(name)),
            is_global_operator: self.store.is_character_operator(sender_name),
        };
        MessageBuilder::new(self.markup.as_ref())
            .prefix(prefix)
            .build(raw, &sender)
    }

    // =============================================================================
    // Outbound: channels
    // =============================================================================

    pub fn join_channel(&mut self, channel: &str) {
        self.send("JCH", FieldMap::new().with("channel", channel));
    }

    pub fn leave_channel(&mut self, channel: &str) {
        self.send("LCH", FieldMap::new().with("channel", channel));
    }

    /// Create an invite-only room; the server replies with its ADH- name.
    pub fn create_private_channel(&mut self, title: &str) {
        self.send("CCR", FieldMap::new().with("channel", title));
    }

    /// Create an official public channel (global operators only).
    pub fn create_public_channel(&mut self, name: &str) {
        self.send("CRC", FieldMap::new().with("channel", name));
    }

    /// Destroy a channel (global operators only).
    pub fn kill_channel(&mut self, channel: &str) {
        self.send("KIC", FieldMap::new().with("channel", channel));
    }

    /// Ask for both channel listings; replies arrive as CHA and ORS.
    pub fn request_channel_lists(&mut self) {
        self.send("CHA", FieldMap::new());
        self.send("ORS", FieldMap::new());
    }

    pub fn set_channel_description(&mut self, channel: &str, description: &str) {
        self.send(
            "CDS",
            FieldMap::new()
                .with("channel", channel)
                .with("description", description),
        );
    }

    pub fn set_channel_mode(&mut self, channel: &str, mode: ChannelMode) {
        self.send(
            "RMO",
            FieldMap::new()
                .with("channel", channel)
                .with("mode", mode.as_wire_str()),
        );
    }

    pub fn set_channel_owner(&mut self, channel: &str, character: &str) {
        self.send(
            "CSO",
            FieldMap::new()
                .with("character", character)
                .with("channel", channel),
        );
    }

    /// Toggle an ad-hoc room between open and invite-only.
    pub fn set_room_visibility(&mut self, channel: &str, public: bool) {
        let status = if public { "public" } else { "private" };
        self.send(
            "RST",
            FieldMap::new().with("channel", channel).with("status", status),
        );
    }

    pub fn invite_to_channel(&mut self, channel: &str, character: &str) {
        self.send(
            "CIU",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character),
        );
    }

    pub fn request_channel_ban_list(&mut self, channel: &str) {
        self.send("CBL", FieldMap::new().with("channel", channel));
    }

    pub fn request_channel_operator_list(&mut self, channel: &str) {
        self.send("COL", FieldMap::new().with("channel", channel));
    }

    // =============================================================================
    // Outbound: messaging
    // =============================================================================

    /// Send a chat message to a joined channel, echoing it locally.
    ///
    /// Rejections (unknown channel, not joined, ads-only room) never reach
    /// the wire; they come back as `Feedback` console lines.
    pub fn send_channel_message(&mut self, channel_name: &str, message: &str) {
        if self.state != ConnectionState::Connected {
            self.feedback("Not connected to the server.");
            return;
        }
        let Some(channel) = self.store.channel(channel_name) else {
            self.feedback(&format!("No such channel: '{channel_name}'."));
            return;
        };
        if !channel.is_joined() {
            self.feedback(&format!("You are not in '{}'.", channel.title));
            return;
        }
        if channel.mode == ChannelMode::Ads {
            self.feedback(&format!(
                "'{}' only allows roleplay advertisements.",
                channel.title
            ));
            return;
        }
        self.send(
            "MSG",
            FieldMap::new()
                .with("channel", channel_name)
                .with("message", message),
        );
        let body = self.build_line(
            &escape_html(message),
            &self.config.character.clone(),
            Some(channel_name),
            "",
        );
        let echo = Message::new(MessageKind::Chat, body)
            .from_session(self.config.character.as_str())
            .from_character(self.config.character.as_str())
            .from_channel(channel_name)
            .to_channel(channel_name);
        self.observer.message(&echo);
    }

    /// Send a roleplay advertisement to a joined channel, echoing it locally.
    pub fn send_channel_advertisement(&mut self, channel_name: &str, message: &str) {
        if self.state != ConnectionState::Connected {
            self.feedback("Not connected to the server.");
            return;
        }
        let Some(channel) = self.store.channel(channel_name) else {
            self.feedback(&format!("No such channel: '{channel_name}'."));
            return;
        };
        if !channel.is_joined() {
            self.feedback(&format!("You are not in '{}'.", channel.title));
            return;
        }
        if channel.mode == ChannelMode::Chat {
            self.feedback(&format!(
                "'{}' does not allow roleplay advertisements.",
                channel.title
            ));
            return;
        }
        self.send(
            "LRP",
            FieldMap::new()
                .with("channel", channel_name)
                .with("message", message),
        );
        let body = self.build_line(
            &escape_html(message),
            &self.config.character.clone(),
            Some(channel_name),
            AD_PREFIX,
        );
        let echo = Message::new(MessageKind::RpAd, body)
            .from_session(self.config.character.as_str())
            .from_character(self.config.character.as_str())
            .from_channel(channel_name)
            .to_channel(channel_name);
        self.observer.message(&echo);
    }

    /// Send a private message, echoing it locally. Rejected with `Feedback`
    /// when the recipient is offline or on the ignore list.
    pub fn send_private_message(&mut self, recipient: &str, message: &str) {
        if self.state != ConnectionState::Connected {
            self.feedback("Not connected to the server.");
            return;
        }
        if !self.store.is_character_online(recipient) {
            self.feedback(&format!("'{recipient}' is not online."));
            return;
        }
        if self.store.is_character_ignored(recipient) {
            self.feedback(&format!("'{recipient}' is on your ignore list."));
            return;
        }
        self.send(
            "PRI",
            FieldMap::new()
                .with("recipient", recipient)
                .with("message", message),
        );
        let body = self.build_line(&escape_html(message), &self.config.character.clone(), None, "");
        let echo = Message::new(MessageKind::Chat, body)
            .from_session(self.config.character.as_str())
            .from_character(self.config.character.as_str())
            .to_character(recipient);
        self.observer.message(&echo);
    }

    /// Roll dice in a channel, e.g. `"1d20"`. The result comes back as RLL.
    pub fn roll_dice_in_channel(&mut self, channel: &str, dice: &str) {
        self.send(
            "RLL",
            FieldMap::new().with("channel", channel).with("dice", dice),
        );
    }

    pub fn roll_dice_with_character(&mut self, recipient: &str, dice: &str) {
        self.send(
            "RLL",
            FieldMap::new().with("recipient", recipient).with("dice", dice),
        );
    }

    pub fn spin_bottle(&mut self, channel: &str) {
        self.send(
            "RLL",
            FieldMap::new().with("channel", channel).with("dice", "bottle"),
        );
    }

    pub fn broadcast(&mut self, message: &str) {
        self.send("BRO", FieldMap::new().with("message", message));
    }

    pub fn set_status(&mut self, status: CharacterStatus, message: &str) {
        self.send(
            "STA",
            FieldMap::new()
                .with("status", status.as_wire_str())
                .with("statusmsg", message),
        );
    }

    pub fn send_typing_status(&mut self, character: &str, status: TypingStatus) {
        self.send(
            "TPN",
            FieldMap::new()
                .with("character", character)
                .with("status", status.as_wire_str()),
        );
    }

    // =============================================================================
    // Outbound: lists and queries
    // =============================================================================

    /// Ignore-list entries are lowercased on the wire, matching how the
    /// server keys the list.
    pub fn ignore_character(&mut self, character: &str) {
        self.send(
            "IGN",
            FieldMap::new()
                .with("action", "add")
                .with("character", character.to_lowercase()),
        );
    }

    pub fn unignore_character(&mut self, character: &str) {
        self.send(
            "IGN",
            FieldMap::new()
                .with("action", "delete")
                .with("character", character.to_lowercase()),
        );
    }

    /// Ask for a character's profile and custom kinks; data streams back
    /// through the PRD and KID sub-protocols.
    pub fn request_profile_data(&mut self, character: &str) {
        self.send("PRO", FieldMap::new().with("character", character));
        self.send("KIN", FieldMap::new().with("character", character));
    }

    pub fn request_server_uptime(&mut self) {
        self.send("UPT", FieldMap::new());
    }

    /// Acknowledge a staff alert (global operators only).
    pub fn confirm_staff_report(&mut self, callid: i64) {
        let moderator = self.config.character.clone();
        self.send(
            "SFC",
            FieldMap::new()
                .with("action", "confirm")
                .with("moderator", moderator)
                .with("callid", callid),
        );
    }

    pub fn send_debug_command(&mut self, command: &str) {
        self.send("ZZZ", FieldMap::new().with("command", command));
    }

    // =============================================================================
    // Outbound: moderation
    // =============================================================================

    pub fn kick_from_channel(&mut self, channel: &str, character: &str) {
        self.send(
            "CKU",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character),
        );
    }

    pub fn ban_from_channel(&mut self, channel: &str, character: &str) {
        self.send(
            "CBU",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character),
        );
    }

    pub fn unban_from_channel(&mut self, channel: &str, character: &str) {
        self.send(
            "CUB",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character),
        );
    }

    pub fn timeout_from_channel(&mut self, channel: &str, character: &str, minutes: i64) {
        self.send(
            "CTU",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character)
                .with("length", minutes),
        );
    }

    pub fn kick_from_chat(&mut self, character: &str) {
        self.send("KIK", FieldMap::new().with("character", character));
    }

    pub fn ban_from_chat(&mut self, character: &str) {
        self.send("ACB", FieldMap::new().with("character", character));
    }

    pub fn unban_from_chat(&mut self, character: &str) {
        self.send("UNB", FieldMap::new().with("character", character));
    }

    pub fn timeout_from_chat(&mut self, character: &str, minutes: i64, reason: &str) {
        self.send(
            "TMO",
            FieldMap::new()
                .with("character", character)
                .with("time", minutes)
                .with("reason", reason),
        );
    }

    pub fn give_channel_operator(&mut self, channel: &str, character: &str) {
        self.send(
            "COA",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character),
        );
    }

    pub fn take_channel_operator(&mut self, channel: &str, character: &str) {
        self.send(
            "COR",
            FieldMap::new()
                .with("channel", channel)
                .with("character", character),
        );
    }

    pub fn give_global_operator(&mut self, character: &str) {
        self.send("AOP", FieldMap::new().with("character", character));
    }

    pub fn take_global_operator(&mut self, character: &str) {
        self.send("DOP", FieldMap::new().with("character", character));
    }

    /// Crown a character with the reward status (global operators only).
    pub fn give_reward(&mut self, character: &str) {
        self.send("RWD", FieldMap::new().with("character", character));
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::ports::{MockSessionObserver, MockTransport, PlainMarkup};

    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::new("account", "fct_ticket", "Alice")
    }

    fn session(transport: MockTransport, observer: MockSessionObserver) -> Session {
        Session::new(
            config(),
            Box::new(transport),
            Arc::new(observer),
            Arc::new(PlainMarkup),
        )
    }

    #[test]
    fn test_connect_then_greeting_identifies_with_ticket() {
        let mut transport = MockTransport::new();
        transport.expect_connect().times(1).returning(|| ());
        transport
            .expect_send()
            .withf(|frame: &str| {
                frame.starts_with("IDN ")
                    && frame.contains("\"method\":\"ticket\"")
                    && frame.contains("\"ticket\":\"fct_ticket\"")
                    && frame.contains("\"character\":\"Alice\"")
            })
            .times(1)
            .returning(|_| ());

        let mut session = session(transport, MockSessionObserver::new());
        session.connect();
        assert_eq!(session.state(), ConnectionState::Connecting);
        session.on_connected();
        assert_eq!(session.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_connect_is_idempotent_while_active() {
        let mut transport = MockTransport::new();
        transport.expect_connect().times(1).returning(|| ());

        let mut session = session(transport, MockSessionObserver::new());
        session.connect();
        session.connect();
        assert_eq!(session.state(), ConnectionState::Connecting);
    }

    #[test]
    fn test_outbound_dropped_while_disconnected() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);

        let mut session = session(transport, MockSessionObserver::new());
        session.join_channel("Frontpage");
    }

    #[test]
    fn test_channel_message_to_unknown_channel_is_feedback_only() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);
        let mut observer = MockSessionObserver::new();
        observer
            .expect_message_system()
            .withf(|_, _, kind| *kind == MessageKind::Feedback)
            .times(1)
            .returning(|_, _, _| ());

        let mut session = session(transport, observer);
        session.state = ConnectionState::Connected;
        session.send_channel_message("Nowhere", "hello");
    }

    #[test]
    fn test_channel_message_to_ads_only_room_is_rejected() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);
        let mut observer = MockSessionObserver::new();
        observer
            .expect_message_system()
            .withf(|_, text: &str, kind| {
                *kind == MessageKind::Feedback && text.contains("advertisements")
            })
            .times(1)
            .returning(|_, _, _| ());

        let mut session = session(transport, observer);
        session.state = ConnectionState::Connected;
        let channel = session.store.add_channel("Sales", "Sales");
        channel.join();
        channel.mode = ChannelMode::Ads;
        session.send_channel_message("Sales", "hello");
    }

    #[test]
    fn test_channel_message_sends_and_echoes() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|frame: &str| {
                frame == r#"MSG {"channel":"Frontpage","message":"a < b"}"#
            })
            .times(1)
            .returning(|_| ());
        let mut observer = MockSessionObserver::new();
        observer
            .expect_message()
            .withf(|message: &Message| {
                message.kind() == MessageKind::Chat
                    && message.destination_channels() == ["Frontpage"]
                    && message.body().contains("a &lt; b")
            })
            .times(1)
            .returning(|_| ());

        let mut session = session(transport, observer);
        session.state = ConnectionState::Connected;
        session.store.add_channel("Frontpage", "Frontpage").join();
        session.send_channel_message("Frontpage", "a < b");
    }

    #[test]
    fn test_private_message_to_offline_character_is_rejected() {
        let mut transport = MockTransport::new();
        transport.expect_send().times(0);
        let mut observer = MockSessionObserver::new();
        observer
            .expect_message_system()
            .withf(|_, text: &str, kind| {
                *kind == MessageKind::Feedback && text.contains("not online")
            })
            .times(1)
            .returning(|_, _, _| ());

        let mut session = session(transport, observer);
        session.state = ConnectionState::Connected;
        session.send_private_message("Ghost", "hello");
    }

    #[test]
    fn test_confirm_staff_report_names_the_moderator() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|frame: &str| {
                frame == r#"SFC {"action":"confirm","moderator":"Alice","callid":7}"#
            })
            .times(1)
            .returning(|_| ());

        let mut session = session(transport, MockSessionObserver::new());
        session.state = ConnectionState::Connected;
        session.confirm_staff_report(7);
    }

    #[test]
    fn test_ignore_updates_send_lowercased_names() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|frame: &str| frame == r#"IGN {"action":"add","character":"pest"}"#)
            .times(1)
            .returning(|_| ());
        transport
            .expect_send()
            .withf(|frame: &str| frame == r#"IGN {"action":"delete","character":"pest"}"#)
            .times(1)
            .returning(|_| ());

        let mut session = session(transport, MockSessionObserver::new());
        session.state = ConnectionState::Connected;
        session.ignore_character("Pest");
        session.unignore_character("PEST");
    }

    #[test]
    fn test_transport_error_is_surfaced_once() {
        let mut observer = MockSessionObserver::new();
        observer
            .expect_message_system()
            .withf(|_, _, kind| *kind == MessageKind::Error)
            .times(1)
            .returning(|_, _, _| ());

        let mut session = session(MockTransport::new(), observer);
        session.state = ConnectionState::Connected;
        session.on_transport_error("connection reset");
        assert_eq!(session.state(), ConnectionState::Disconnected);
        // Already disconnected: no further console line.
        session.on_transport_error("connection reset");
    }
}
