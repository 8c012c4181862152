//! Message values and sender decoration.
//!
//! A [`Message`] is an immutable routing envelope around one formatted line:
//! where it came from, which views it goes to, and how it is classified.
//! [`MessageBuilder`] produces the formatted line itself, applying the
//! slash-prefix conventions (`/me`, `/me 's`, `/warn`) and decorating the
//! sender name with gender color and operator standing.

use chrono::{DateTime, Local};

use emberchat_domain::{profile_url, Character, Gender, MessageKind};

use crate::ports::MarkupParser;

/// Icon shown in front of operator names.
const OPERATOR_ICON: &str = "<img src=\":/images/auction-hammer.png\" />";

/// Escape the characters that would be read as markup in a formatted line.
/// Applied to user-entered text before local echo.
pub fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Reduce a formatted line to plain text: tags dropped, entities restored.
pub fn strip_tags(formatted: &str) -> String {
    let mut plain = String::with_capacity(formatted.len());
    let mut in_tag = false;
    for ch in formatted.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => plain.push(ch),
            _ => {}
        }
    }
    plain
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Bold, gender-colored hyperlink for a character name. Works for characters
/// we have no entity for; those fall back to the offline color.
pub fn character_link(name: &str, character: Option<&Character>) -> String {
    let color = character.map_or(Gender::OfflineUnknown.color(), Character::name_color);
    format!(
        "<b><a style=\"color: {color}\" href=\"{url}\">{name}</a></b>",
        url = profile_url(name)
    )
}

// =============================================================================
// Message
// =============================================================================

/// One formatted line plus its routing envelope.
///
/// Constructed fluently and never mutated afterwards; consumers read it
/// through accessors only.
#[derive(Debug, Clone)]
pub struct Message {
    timestamp: DateTime<Local>,
    kind: MessageKind,
    body: String,
    session: String,
    source_channel: Option<String>,
    source_character: Option<String>,
    destination_channels: Vec<String>,
    destination_characters: Vec<String>,
    to_console: bool,
    to_notify: bool,
    broadcast: bool,
}

impl Message {
    /// Start a message from an already formatted body. The timestamp is
    /// captured here, when the event happened, not when it is displayed.
    pub fn new(kind: MessageKind, body: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            kind,
            body: body.into(),
            session: String::new(),
            source_channel: None,
            source_character: None,
            destination_channels: Vec::new(),
            destination_characters: Vec::new(),
            to_console: false,
            to_notify: false,
            broadcast: false,
        }
    }

    pub fn at(mut self, timestamp: DateTime<Local>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn from_session(mut self, session: impl Into<String>) -> Self {
        self.session = session.into();
        self
    }

    pub fn from_channel(mut self, channel: impl Into<String>) -> Self {
        self.source_channel = Some(channel.into());
        self
    }

    pub fn from_character(mut self, character: impl Into<String>) -> Self {
        self.source_character = Some(character.into());
        self
    }

    pub fn to_channel(mut self, channel: impl Into<String>) -> Self {
        self.destination_channels.push(channel.into());
        self
    }

    pub fn to_character(mut self, character: impl Into<String>) -> Self {
        self.destination_characters.push(character.into());
        self
    }

    /// Route to the session console view.
    pub fn to_console(mut self) -> Self {
        self.to_console = true;
        self
    }

    /// Request an attention-grabbing notification.
    pub fn to_notify(mut self) -> Self {
        self.to_notify = true;
        self
    }

    /// Route to every open view.
    pub fn to_broadcast(mut self) -> Self {
        self.broadcast = true;
        self
    }

    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Formatted body without the timestamp prefix.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Full display line: `<small>[hh:mm:ss AM]</small> body`.
    pub fn formatted(&self) -> String {
        format!(
            "<small>[{}]</small> {}",
            self.timestamp.format("%I:%M:%S %p"),
            self.body
        )
    }

    /// Plain-text rendering of the full display line.
    pub fn plain(&self) -> String {
        strip_tags(&self.formatted())
    }

    pub fn session(&self) -> &str {
        &self.session
    }

    pub fn source_channel(&self) -> Option<&str> {
        self.source_channel.as_deref()
    }

    pub fn source_character(&self) -> Option<&str> {
        self.source_character.as_deref()
    }

    pub fn destination_channels(&self) -> &[String] {
        &self.destination_channels
    }

    pub fn destination_characters(&self) -> &[String] {
        &self.destination_characters
    }

    pub fn is_console(&self) -> bool {
        self.to_console
    }

    pub fn is_notify(&self) -> bool {
        self.to_notify
    }

    pub fn is_broadcast(&self) -> bool {
        self.broadcast
    }
}

// =============================================================================
// MessageBuilder
// =============================================================================

/// Sender identity as needed for decoration. The entity and channel are
/// optional; decoration degrades gracefully when either is unknown.
pub struct SenderRef<'a> {
    pub name: &'a str,
    pub character: Option<&'a Character>,
    pub channel: Option<&'a emberchat_domain::Channel>,
    pub is_global_operator: bool,
}

/// Formats one raw chat line into display HTML.
pub struct MessageBuilder<'a> {
    markup: &'a dyn MarkupParser,
    prefix: &'a str,
    postfix: &'a str,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(markup: &'a dyn MarkupParser) -> Self {
        Self {
            markup,
            prefix: "",
            postfix: "",
        }
    }

    /// HTML placed before the decorated line (e.g. an ad banner).
    pub fn prefix(mut self, prefix: &'a str) -> Self {
        self.prefix = prefix;
        self
    }

    pub fn postfix(mut self, postfix: &'a str) -> Self {
        self.postfix = postfix;
        self
    }

    /// Build the display line for `raw` as spoken by `sender`.
    ///
    /// Slash prefixes: `/me ` renders as an italic action line, `/me 's `
    /// additionally attaches the possessive to the sender name, and `/warn `
    /// renders the body as a bold red warning.
    pub fn build(&self, raw: &str, sender: &SenderRef<'_>) -> String {
        let mut possessive = "";
        let mut action = false;
        let mut warning = false;
        let body = if let Some(rest) = raw.strip_prefix("/me 's ") {
            possessive = "'s";
            action = true;
            rest
        } else if let Some(rest) = raw.strip_prefix("/me ") {
            action = true;
            rest
        } else if let Some(rest) = raw.strip_prefix("/warn ") {
            warning = true;
            rest
        } else {
            raw
        };

        let channel_operator = sender
            .channel
            .map_or(false, |channel| channel.is_operator(sender.name));
        let icon = if sender.is_global_operator || channel_operator {
            OPERATOR_ICON
        } else {
            ""
        };

        let color = sender
            .character
            .map_or(Gender::OfflineUnknown.color(), Character::name_color);
        let name_html = format!(
            "<b><a style=\"color: {color}\" href=\"{url}\">{icon}{name}{possessive}</a></b>",
            url = profile_url(sender.name),
            name = sender.name,
        );

        let mut rendered = self.markup.to_html(body);
        if warning {
            rendered = format!("<span style=\"color: #ff0000; font-weight: bold\">{rendered}</span>");
        }

        if action {
            format!(
                "{}<i>*{} {}</i>{}",
                self.prefix, name_html, rendered, self.postfix
            )
        } else {
            format!("{}{} {}{}", self.prefix, name_html, rendered, self.postfix)
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use emberchat_domain::{CharacterStatus, Channel};

    use crate::ports::PlainMarkup;

    use super::*;

    fn sender<'a>(
        name: &'a str,
        character: Option<&'a Character>,
        channel: Option<&'a Channel>,
    ) -> SenderRef<'a> {
        SenderRef {
            name,
            character,
            channel,
            is_global_operator: false,
        }
    }

    #[test]
    fn test_escape_html_order() {
        assert_eq!(escape_html("a < b & c > d"), "a &lt; b &amp; c &gt; d");
    }

    #[test]
    fn test_strip_tags_restores_entities() {
        assert_eq!(strip_tags("<b>a &amp; b</b> &lt;hi&gt;"), "a & b <hi>");
    }

    #[test]
    fn test_plain_chat_line() {
        let markup = PlainMarkup;
        let mut alice = Character::new("Alice", false);
        alice.gender = "Female".parse().expect("gender");
        alice.status = CharacterStatus::Online;
        let line = MessageBuilder::new(&markup).build("hello", &sender("Alice", Some(&alice), None));
        assert_eq!(
            line,
            "<b><a style=\"color: #ff6699\" href=\"#/profile/Alice\">Alice</a></b> hello"
        );
    }

    #[test]
    fn test_action_line_is_wrapped_in_italics() {
        let markup = PlainMarkup;
        let line = MessageBuilder::new(&markup).build("/me waves", &sender("Alice", None, None));
        assert!(line.starts_with("<i>*"));
        assert!(line.ends_with("waves</i>"));
        assert!(!line.contains("/me"));
    }

    #[test]
    fn test_possessive_action_attaches_to_name() {
        let markup = PlainMarkup;
        let line =
            MessageBuilder::new(&markup).build("/me 's tail twitches", &sender("Alice", None, None));
        assert!(line.contains("Alice's</a>"));
        assert!(line.contains("tail twitches"));
    }

    #[test]
    fn test_warn_line_is_highlighted() {
        let markup = PlainMarkup;
        let line =
            MessageBuilder::new(&markup).build("/warn settle down", &sender("Alice", None, None));
        assert!(line.contains("font-weight: bold"));
        assert!(line.contains("settle down"));
    }

    #[test]
    fn test_channel_operator_gets_icon() {
        let markup = PlainMarkup;
        let mut channel = Channel::new("Frontpage", "Frontpage");
        channel.add_operator("Alice");
        let line =
            MessageBuilder::new(&markup).build("hello", &sender("Alice", None, Some(&channel)));
        assert!(line.contains("auction-hammer"));
    }

    #[test]
    fn test_unknown_sender_uses_offline_color() {
        let markup = PlainMarkup;
        let line = MessageBuilder::new(&markup).build("hello", &sender("Ghost", None, None));
        assert!(line.contains("#c0c0c0"));
    }

    #[test]
    fn test_formatted_line_has_timestamp_prefix() {
        let timestamp = Local
            .with_ymd_and_hms(2026, 8, 30, 15, 4, 5)
            .single()
            .expect("valid time");
        let message = Message::new(MessageKind::Chat, "<b>Alice</b> hi").at(timestamp);
        assert_eq!(
            message.formatted(),
            "<small>[03:04:05 PM]</small> <b>Alice</b> hi"
        );
        assert_eq!(message.plain(), "[03:04:05 PM] Alice hi");
    }

    #[test]
    fn test_message_routing_fields() {
        let message = Message::new(MessageKind::Roll, "rolled 7")
            .from_session("Alice")
            .from_character("Bob")
            .to_channel("Frontpage")
            .to_notify();
        assert_eq!(message.session(), "Alice");
        assert_eq!(message.source_character(), Some("Bob"));
        assert_eq!(message.destination_channels(), ["Frontpage"]);
        assert!(message.is_notify());
        assert!(!message.is_console());
    }
}
