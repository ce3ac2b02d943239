//! Persisted guild and admin-channel settings.
//!
//! The document is a flat JSON object. Keys other than `guild_id` and
//! `admin_channel_id` are carried through untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Guild {0} is already registered")]
    GuildAlreadyRegistered(i64),

    #[error("Guild is not registered")]
    GuildNotRegistered,

    #[error("Guild {requested} is not the registered guild")]
    WrongGuild { requested: i64 },

    #[error("Failed to access settings file: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guild_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_channel_id: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Settings document bound to its file. Every mutation is written through.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
}

impl SettingsStore {
    /// Open the settings file, creating an empty document if it does not exist
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(&path, "{}")?;
        }

        let content = std::fs::read_to_string(&path)?;
        let settings = serde_json::from_str(&content)?;
        Ok(Self { path, settings })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn guild_id(&self) -> Option<i64> {
        self.settings.guild_id
    }

    pub fn admin_channel_id(&self) -> Option<i64> {
        self.settings.admin_channel_id
    }

    pub fn register_guild(&mut self, guild_id: i64) -> Result<(), SettingsError> {
        if let Some(existing) = self.settings.guild_id {
            return Err(SettingsError::GuildAlreadyRegistered(existing));
        }
        let mut updated = self.settings.clone();
        updated.guild_id = Some(guild_id);
        self.commit(updated)
    }

    /// Bind the admin channel. Only allowed from the registered guild.
    pub fn register_admin_channel(
        &mut self,
        guild_id: i64,
        channel_id: i64,
    ) -> Result<(), SettingsError> {
        if self.settings.guild_id != Some(guild_id) {
            return Err(SettingsError::WrongGuild {
                requested: guild_id,
            });
        }
        let mut updated = self.settings.clone();
        updated.admin_channel_id = Some(channel_id);
        self.commit(updated)
    }

    /// Forget the guild together with its admin channel
    pub fn unregister_guild(&mut self, guild_id: i64) -> Result<(), SettingsError> {
        if self.settings.guild_id != Some(guild_id) {
            return Err(SettingsError::GuildNotRegistered);
        }
        let mut updated = self.settings.clone();
        updated.guild_id = None;
        updated.admin_channel_id = None;
        self.commit(updated)
    }

    /// Write `updated` to disk, then adopt it. A failed write leaves the store unchanged.
    fn commit(&mut self, updated: Settings) -> Result<(), SettingsError> {
        let content = serde_json::to_string(&updated)?;
        std::fs::write(&self.path, content)?;
        self.settings = updated;
        Ok(())
    }
}
