//! [`ChatPlatform`] backed by serenity's HTTP client and cache.
use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::{
    CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage, CreateThread, EditMessage,
    EditThread, GetMessages,
};
use serenity::cache::Cache;
use serenity::http::Http;
use serenity::model::Timestamp;
use serenity::model::channel::{
    AutoArchiveDuration, Channel, ChannelType, GuildChannel, Message, ReactionType,
};
use serenity::model::id::{ChannelId, MessageId, UserId};

use super::codec::RecordEmbed;
use super::model::Profile;
use super::platform::{ChatPlatform, EditOutcome, HistoryMessage, PlatformError, ThreadInfo};

/// Discord caps a single history page at 100 messages.
const HISTORY_PAGE_SIZE: u8 = 100;

#[derive(Clone)]
pub struct SerenityPlatform {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityPlatform {
    pub fn new(http: Arc<Http>, cache: Arc<Cache>) -> Self {
        Self { http, cache }
    }

    async fn guild_channel(&self, channel: ChannelId) -> Result<GuildChannel, PlatformError> {
        match channel.to_channel(&self.http).await {
            Ok(Channel::Guild(c)) => Ok(c),
            Ok(_) => Err(PlatformError::NotFound {
                what: "guild channel",
                id: channel.get(),
            }),
            Err(e) => Err(classify(e, "channel", channel.get())),
        }
    }
}

fn is_not_found(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(http_err) => http_err
            .status_code()
            .is_some_and(|status| status.as_u16() == 404),
        _ => false,
    }
}

fn classify(err: serenity::Error, what: &'static str, id: u64) -> PlatformError {
    if is_not_found(&err) {
        PlatformError::NotFound { what, id }
    } else {
        PlatformError::Discord(err)
    }
}

fn reaction_type(emoji: &str) -> Result<ReactionType, PlatformError> {
    ReactionType::try_from(emoji)
        .map_err(|e| PlatformError::Other(format!("invalid emoji {emoji:?}: {e}")))
}

fn archive_duration(minutes: u16) -> AutoArchiveDuration {
    match minutes {
        0..=60 => AutoArchiveDuration::OneHour,
        61..=1440 => AutoArchiveDuration::OneDay,
        1441..=4320 => AutoArchiveDuration::ThreeDays,
        _ => AutoArchiveDuration::OneWeek,
    }
}

fn build_embed(embed: &RecordEmbed) -> CreateEmbed {
    let mut author = CreateEmbedAuthor::new(embed.author_name.as_str());
    if !embed.author_icon_url.is_empty() {
        author = author.icon_url(embed.author_icon_url.as_str());
    }
    let mut out = CreateEmbed::new()
        .author(author)
        .description(embed.description.as_str())
        .colour(embed.colour)
        .timestamp(Timestamp::now());
    if let Some(footer) = &embed.footer {
        out = out.footer(CreateEmbedFooter::new(footer.as_str()));
    }
    out
}

fn to_history(message: Message) -> HistoryMessage {
    HistoryMessage {
        id: message.id,
        author_id: message.author.id,
        content: message.content,
        embed_footers: message
            .embeds
            .into_iter()
            .filter_map(|e| e.footer.map(|f| f.text))
            .collect(),
    }
}

#[async_trait]
impl ChatPlatform for SerenityPlatform {
    fn current_user_id(&self) -> UserId {
        self.cache.current_user().id
    }

    async fn ensure_text_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        let c = self.guild_channel(channel).await?;
        match c.kind {
            ChannelType::Text | ChannelType::News => Ok(()),
            _ => Err(PlatformError::NotFound {
                what: "text channel",
                id: channel.get(),
            }),
        }
    }

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageId, PlatformError> {
        let message = channel
            .say(&self.http, text)
            .await
            .map_err(|e| classify(e, "channel", channel.get()))?;
        Ok(message.id)
    }

    async fn send_embed(
        &self,
        channel: ChannelId,
        embed: &RecordEmbed,
    ) -> Result<MessageId, PlatformError> {
        let message = channel
            .send_message(&self.http, CreateMessage::new().embed(build_embed(embed)))
            .await
            .map_err(|e| classify(e, "channel", channel.get()))?;
        Ok(message.id)
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &RecordEmbed,
    ) -> Result<EditOutcome, PlatformError> {
        match channel
            .edit_message(&self.http, message, EditMessage::new().embed(build_embed(embed)))
            .await
        {
            Ok(_) => Ok(EditOutcome::Edited),
            Err(e) if is_not_found(&e) => Ok(EditOutcome::Missing),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        match channel.delete_message(&self.http, message).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        channel
            .create_reaction(&self.http, message, reaction_type(emoji)?)
            .await
            .map_err(|e| classify(e, "message", message.get()))
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        channel
            .delete_reaction(&self.http, message, Some(user), reaction_type(emoji)?)
            .await
            .map_err(|e| classify(e, "message", message.get()))
    }

    async fn fetch_history(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<HistoryMessage>, PlatformError> {
        let mut out = Vec::new();
        let mut before: Option<MessageId> = None;
        loop {
            let mut request = GetMessages::new().limit(HISTORY_PAGE_SIZE);
            if let Some(b) = before {
                request = request.before(b);
            }
            let page = channel
                .messages(&self.http, request)
                .await
                .map_err(|e| classify(e, "channel", channel.get()))?;
            let Some(last) = page.last() else {
                break;
            };
            before = Some(last.id);
            let full_page = page.len() == usize::from(HISTORY_PAGE_SIZE);
            out.extend(page.into_iter().map(to_history));
            if !full_page {
                break;
            }
        }
        Ok(out)
    }

    async fn create_thread(
        &self,
        channel: ChannelId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ThreadInfo, PlatformError> {
        let builder = CreateThread::new(name)
            .kind(ChannelType::PublicThread)
            .auto_archive_duration(archive_duration(auto_archive_minutes));
        let thread = channel
            .create_thread(&self.http, builder)
            .await
            .map_err(|e| classify(e, "channel", channel.get()))?;
        Ok(ThreadInfo {
            id: thread.id,
            name: thread.name,
        })
    }

    async fn fetch_active_threads(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<ThreadInfo>, PlatformError> {
        let parent = self.guild_channel(channel).await?;
        let data = parent
            .guild_id
            .get_active_threads(&self.http)
            .await
            .map_err(|e| classify(e, "guild", parent.guild_id.get()))?;
        Ok(data
            .threads
            .into_iter()
            .filter(|t| t.parent_id == Some(channel))
            .map(|t| ThreadInfo {
                id: t.id,
                name: t.name,
            })
            .collect())
    }

    async fn archive_thread(&self, thread: ChannelId) -> Result<(), PlatformError> {
        thread
            .edit_thread(&self.http, EditThread::new().archived(true))
            .await
            .map_err(|e| classify(e, "thread", thread.get()))?;
        Ok(())
    }

    async fn fetch_profile(
        &self,
        channel: ChannelId,
        user: UserId,
    ) -> Result<Profile, PlatformError> {
        let guild_channel = self.guild_channel(channel).await?;
        match guild_channel.guild_id.member(&self.http, user).await {
            Ok(member) => Ok(Profile {
                display_name: member.display_name().to_string(),
                avatar_url: member.face(),
            }),
            Err(e) if is_not_found(&e) => {
                let u = user
                    .to_user(&self.http)
                    .await
                    .map_err(|e| classify(e, "user", user.get()))?;
                Ok(Profile {
                    display_name: u.display_name().to_string(),
                    avatar_url: u.face(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn has_moderator_capability(
        &self,
        user: UserId,
        channel: ChannelId,
    ) -> Result<bool, PlatformError> {
        let guild_channel = self.guild_channel(channel).await?;
        let member = match guild_channel.guild_id.member(&self.http, user).await {
            Ok(m) => m,
            // Not a member of the guild, so certainly not a moderator there.
            Err(e) if is_not_found(&e) => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let permissions = {
            let Some(guild) = self.cache.guild(guild_channel.guild_id) else {
                return Err(PlatformError::NotFound {
                    what: "guild",
                    id: guild_channel.guild_id.get(),
                });
            };
            guild.user_permissions_in(&guild_channel, &member)
        };
        Ok(permissions.manage_messages())
    }
}
