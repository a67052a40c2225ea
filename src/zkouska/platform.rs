//! The chat-platform surface the zkouska core depends on.
//!
//! Everything the core does to Discord goes through [`ChatPlatform`]; the production
//! implementation lives in `serenity_platform`, tests use an in-memory fake.
use async_trait::async_trait;
use serenity::model::id::{ChannelId, MessageId, UserId};

use super::codec::RecordEmbed;
use super::model::Profile;

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("{what} {id} not found")]
    NotFound { what: &'static str, id: u64 },
    #[error("discord request failed: {0}")]
    Discord(#[from] serenity::Error),
    #[error("{0}")]
    Other(String),
}

impl PlatformError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, PlatformError::NotFound { .. })
    }
}

/// One message from a channel or thread history, reduced to what decoding needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryMessage {
    pub id: MessageId,
    pub author_id: UserId,
    pub content: String,
    pub embed_footers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub id: ChannelId,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Edited,
    /// The message no longer exists; the caller decides whether to recreate it.
    Missing,
}

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// The bot's own user id.
    fn current_user_id(&self) -> UserId;

    /// `NotFound` unless the channel exists and accepts messages.
    async fn ensure_text_channel(&self, channel: ChannelId) -> Result<(), PlatformError>;

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageId, PlatformError>;

    async fn send_embed(
        &self,
        channel: ChannelId,
        embed: &RecordEmbed,
    ) -> Result<MessageId, PlatformError>;

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &RecordEmbed,
    ) -> Result<EditOutcome, PlatformError>;

    /// Deleting a message that is already gone succeeds.
    async fn delete_message(&self, channel: ChannelId, message: MessageId)
    -> Result<(), PlatformError>;

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError>;

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<(), PlatformError>;

    /// Whole history, newest first.
    async fn fetch_history(&self, channel: ChannelId) -> Result<Vec<HistoryMessage>, PlatformError>;

    async fn create_thread(
        &self,
        channel: ChannelId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ThreadInfo, PlatformError>;

    /// Open (non-archived) threads whose parent is `channel`.
    async fn fetch_active_threads(&self, channel: ChannelId)
    -> Result<Vec<ThreadInfo>, PlatformError>;

    async fn archive_thread(&self, thread: ChannelId) -> Result<(), PlatformError>;

    /// Display data for `user` as seen in the guild owning `channel`.
    async fn fetch_profile(&self, channel: ChannelId, user: UserId)
    -> Result<Profile, PlatformError>;

    /// Moderator capability scoped to `channel`.
    async fn has_moderator_capability(
        &self,
        user: UserId,
        channel: ChannelId,
    ) -> Result<bool, PlatformError>;
}
