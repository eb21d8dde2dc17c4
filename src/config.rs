//! Persisted configuration store and the runtime session built from it.
//!
//! The JSON document at [`CONFIG_FILE`] is the sole source of truth. The
//! in-memory [`Session`] is a disposable projection that is rebuilt wholesale
//! after every successful write, never patched incrementally.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, error, info};
use serde::{Deserialize, Serialize};

use crate::completion::{Completion, CompletionClient};
use crate::error::{BotError, Result};

/// Fixed path of the persisted configuration document.
pub const CONFIG_FILE: &str = "config.json";

/// Idle period while parked on an unrecoverable configuration failure.
const LOAD_FAILURE_IDLE: Duration = Duration::from_secs(100);

/// The persisted configuration document.
///
/// Every field defaults to empty/false when absent from the store, so a
/// sparse document parses without error. A document that fails to parse at
/// all is treated as broken operator intent and is never substituted with
/// defaults (see [`Store::load_or_wait`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Conversations monitored for direct messages, in insertion order.
    #[serde(default)]
    pub listen_list: Vec<String>,
    /// The single monitored group, or empty. Setting a new group replaces
    /// the old one.
    #[serde(default)]
    pub group: String,
    /// Whether group messages are processed at all.
    #[serde(default, with = "switch_token")]
    pub group_switch: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    /// Literal token that marks a mention of the bot inside group text.
    #[serde(default, rename = "AtMe")]
    pub at_me: String,
    /// Conversation authorized to issue administrative commands.
    #[serde(default)]
    pub cmd: String,
    /// Default completion model, active after every reload.
    #[serde(default)]
    pub model1: String,
    /// Alternate completion model.
    #[serde(default)]
    pub model2: String,
    /// Display name returned on identity queries.
    #[serde(default)]
    pub bot_name: String,
}

impl Configuration {
    /// Display name used for identity replies, falling back to the crate
    /// name when unset.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.bot_name.is_empty() {
            env!("CARGO_PKG_NAME")
        } else {
            &self.bot_name
        }
    }
}

/// Existing stores persist the group switch as the string tokens `"True"`
/// and `"False"`; the token stays at the serde boundary only.
mod switch_token {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &bool,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(if *value { "True" } else { "False" })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<bool, D::Error> {
        let token = String::deserialize(deserializer)?;
        Ok(token == "True")
    }
}

/// Owner of the persisted configuration document.
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read and parse the persisted configuration.
    pub fn load(&self) -> Result<Configuration> {
        debug!("Loading configuration from {}", self.path.display());
        let raw =
            fs::read_to_string(&self.path).map_err(|e| BotError::ConfigLoad(e.to_string()))?;
        let config =
            serde_json::from_str(&raw).map_err(|e| BotError::ConfigLoad(e.to_string()))?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Load the configuration, or park forever if the store is unreadable.
    ///
    /// The process idles until an operator repairs the file and restarts it;
    /// it never proceeds on a partial or default configuration.
    pub async fn load_or_wait(&self) -> Configuration {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                error!(
                    "Cannot load configuration from {}, please check the file: {e}",
                    self.path.display()
                );
                loop {
                    tokio::time::sleep(LOAD_FAILURE_IDLE).await;
                }
            }
        }
    }

    /// Overwrite the persisted store with the full configuration document,
    /// pretty-printed UTF-8.
    pub fn save(&self, config: &Configuration) -> Result<()> {
        let raw = serde_json::to_string_pretty(config)
            .map_err(|e| BotError::ConfigSave(e.to_string()))?;
        fs::write(&self.path, raw).map_err(|e| BotError::ConfigSave(e.to_string()))?;
        debug!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}

/// Runtime projection of the configuration.
pub struct Session {
    /// Model id used for generated replies. Rebuilding resets this to
    /// `model1`, discarding any in-memory model switch.
    pub active_model: String,
    pub completion: Box<dyn Completion>,
}

impl Session {
    /// Build a fresh session: default model and a completion client bound
    /// to the current credentials.
    #[must_use]
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            active_model: config.model1.clone(),
            completion: Box::new(CompletionClient::new(
                config.api_key.clone(),
                config.base_url.clone(),
            )),
        }
    }
}
