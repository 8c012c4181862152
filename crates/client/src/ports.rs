//! Ports the embedding application implements.
//!
//! The session engine is deliberately blind to sockets and screens: frames
//! go out through [`Transport`], display updates go out through
//! [`SessionObserver`], and chat markup is rendered by [`MarkupParser`].
//! All notifications are one-way; the observer never calls back into the
//! session while a notification is being delivered.

#[cfg(test)]
use mockall::automock;

use emberchat_domain::{ChannelMode, ChannelSummary, MessageKind, TypingStatus};

use crate::message::Message;

/// Frame transport owned by the session.
///
/// The session calls `connect` once per connection attempt and `send` for
/// each outbound frame. Connection results come back through the session's
/// `on_connected` / `on_transport_error` entry points, driven by whoever
/// pumps the transport.
#[cfg_attr(test, automock)]
pub trait Transport {
    fn connect(&mut self);
    fn send(&mut self, frame: &str);
}

/// Renders chat markup (e.g. `[b]...[/b]`, `[session=...]...[/session]`)
/// into display HTML.
#[cfg_attr(test, automock)]
pub trait MarkupParser {
    fn to_html(&self, raw: &str) -> String;
}

/// Markup renderer that passes text through untouched. Useful for headless
/// embeddings and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainMarkup;

impl MarkupParser for PlainMarkup {
    fn to_html(&self, raw: &str) -> String {
        raw.to_string()
    }
}

/// One-way notifications from the session to the presentation layer.
///
/// Every method carries the session's bound character name so a UI driving
/// several sessions can route updates to the right window.
#[cfg_attr(test, automock)]
pub trait SessionObserver {
    /// A fully built message routed by its own destination fields.
    fn message(&self, message: &Message);

    /// A console-level line addressed to the session itself.
    fn message_system(&self, session: &str, text: &str, kind: MessageKind);

    /// A line addressed to one channel's view.
    ///
    /// `is_moderator` is set when the event was performed by someone with
    /// moderation powers; `is_self` when the local identity is the subject.
    fn message_channel(
        &self,
        session: &str,
        channel: &str,
        text: &str,
        kind: MessageKind,
        is_moderator: bool,
        is_self: bool,
    );

    /// A line addressed to every open view (server broadcasts).
    fn message_all(&self, session: &str, text: &str, kind: MessageKind);

    /// A channel entity now exists (first join or roster arrival).
    fn add_channel(&self, session: &str, channel: &str, title: &str);

    /// The channel's initial roster is complete and it can be displayed.
    fn notify_channel_ready(&self, session: &str, channel: &str);

    fn set_channel_description(&self, session: &str, channel: &str, description: &str);

    fn set_channel_mode(&self, session: &str, channel: &str, mode: ChannelMode);

    fn notify_channel_member_joined(&self, session: &str, channel: &str, character: &str);

    fn notify_channel_member_left(&self, session: &str, channel: &str, character: &str);

    /// A character came online (`true`) or went offline (`false`).
    fn notify_character_online(&self, session: &str, character: &str, online: bool);

    /// Gender, status, or status message changed on a known character.
    fn notify_character_status_update(&self, session: &str, character: &str);

    fn set_character_typing_status(&self, session: &str, character: &str, status: TypingStatus);

    /// A character gained or lost global operator standing.
    fn set_chat_operator(&self, session: &str, character: &str, is_operator: bool);

    /// Ensure a private-message view exists for this character.
    fn add_character_chat(&self, session: &str, character: &str);

    /// The full ignore list was (re)established.
    fn notify_ignore_list(&self, session: &str, characters: &[String]);

    fn notify_ignore_add(&self, session: &str, character: &str);

    fn notify_ignore_remove(&self, session: &str, character: &str);

    /// The public channel listing was refreshed.
    fn update_known_channel_list(&self, session: &str, channels: &[ChannelSummary]);

    /// The user-created open room listing was refreshed.
    fn update_open_room_list(&self, session: &str, channels: &[ChannelSummary]);

    /// A character's streamed custom-kink data finished arriving.
    fn notify_character_custom_kinks_updated(&self, session: &str, character: &str);

    /// A character's streamed profile data finished arriving.
    fn notify_character_profile_updated(&self, session: &str, character: &str);
}
