//! JSON messages exchanged with page scripts.
//!
//! # Channels
//! ```md
//! primary window bridge -> BridgeMessage  (key events, context menu)
//! exit.html             -> QuitDecision   {"action": "cancel" | "quit"}
//! update.html           -> UpdateDecision {"action": "update-now" | "update-later"}
//! shell                 -> UpdaterMessage (pushed via window.postMessage)
//! ```
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::update::DownloadProgress;
use crate::input::{Key, KeyInput, KeyPhase};

/// Sent by the script injected into the primary window.
#[derive(Clone, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(
    tag = "kind",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
pub enum BridgeMessage {
    Key {
        key: String,
        phase: KeyPhase,
        is_repeat: bool,
    },
    ContextMenu,
}

impl BridgeMessage {
    pub fn key_input(&self) -> Option<KeyInput> {
        match self {
            BridgeMessage::Key {
                key,
                phase,
                is_repeat,
            } => Some(KeyInput {
                key: Key::from_dom_key(key),
                phase: *phase,
                is_repeat: *is_repeat,
            }),
            BridgeMessage::ContextMenu => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum QuitDecision {
    Cancel,
    Quit,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum UpdateDecision {
    UpdateNow,
    UpdateLater,
}

/// Pushed from the shell into the updater window.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum UpdaterMessage {
    DownloadProgress(DownloadProgress),
    UpdateDownloaded,
}

pub fn parse_message<T: DeserializeOwned>(message: &str) -> Result<T, String> {
    serde_json::from_str(message)
        .map_err(|err| format!("invalid message '{}': {}", message, err))
}

/// Script that delivers `message` to the page's `message` listeners.
pub fn post_message_script(message: &UpdaterMessage) -> Result<String, String> {
    let json = serde_json::to_string(message)
        .map_err(|err| format!("failed to serialize message: {}", err))?;
    Ok(format!("window.postMessage({}, '*');", json))
}
