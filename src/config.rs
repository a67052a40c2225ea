//! Runtime configuration read from the environment (a `.env` file is loaded first by `main`).
use serenity::model::id::ChannelId;

pub const DISCORD_TOKEN_VAR: &str = "DISCORD_TOKEN";
pub const SOURCE_CHANNEL_VAR: &str = "ZKOUSKA_SOURCE_CHANNEL_ID";
pub const DESTINATION_CHANNEL_VAR: &str = "ZKOUSKA_DESTINATION_CHANNEL_ID";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("expected {0} in the environment")]
    Missing(&'static str),
    #[error("{name} must be a non-zero channel id, got {value:?}")]
    InvalidChannelId { name: &'static str, value: String },
}

/// Where announcements are posted and where their companion threads are opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZkouskaSettings {
    pub source_channel_id: ChannelId,
    pub destination_channel_id: ChannelId,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub discord_token: String,
    pub zkouska: ZkouskaSettings,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let discord_token = lookup(DISCORD_TOKEN_VAR)
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::Missing(DISCORD_TOKEN_VAR))?;
        Ok(Self {
            discord_token,
            zkouska: ZkouskaSettings {
                source_channel_id: channel_id(&lookup, SOURCE_CHANNEL_VAR)?,
                destination_channel_id: channel_id(&lookup, DESTINATION_CHANNEL_VAR)?,
            },
        })
    }
}

fn channel_id(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<ChannelId, ConfigError> {
    let raw = lookup(name).ok_or(ConfigError::Missing(name))?;
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| *v != 0)
        .map(ChannelId::new)
        .ok_or(ConfigError::InvalidChannelId { name, value: raw })
}
