//! Session configuration.

use serde::{Deserialize, Serialize};

/// Everything a [`crate::Session`] needs to identify itself and greet the
/// server. One config binds one character; opening a second character means
/// constructing a second session with its own config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Account name presented during identification.
    pub account: String,
    /// Pre-fetched authentication ticket for the account.
    pub ticket: String,
    /// The character this session speaks as.
    pub character: String,
    /// Client name advertised in the identification frame.
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Client version advertised in the identification frame.
    #[serde(default = "default_client_version")]
    pub client_version: String,
    /// Channels to join automatically once the server greets us.
    #[serde(default)]
    pub autojoin_channels: Vec<String>,
}

impl SessionConfig {
    pub fn new(
        account: impl Into<String>,
        ticket: impl Into<String>,
        character: impl Into<String>,
    ) -> Self {
        Self {
            account: account.into(),
            ticket: ticket.into(),
            character: character.into(),
            client_name: default_client_name(),
            client_version: default_client_version(),
            autojoin_channels: Vec::new(),
        }
    }
}

fn default_client_name() -> String {
    "Emberchat".to_string()
}

fn default_client_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_fills_client_defaults() {
        let config: SessionConfig = serde_json::from_str(
            r#"{"account":"user","ticket":"fct_abc","character":"Alice"}"#,
        )
        .expect("valid config");
        assert_eq!(config.client_name, "Emberchat");
        assert!(!config.client_version.is_empty());
        assert!(config.autojoin_channels.is_empty());
    }
}
