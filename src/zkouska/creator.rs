//! `!zkouska <description>`: posts the announcement, opens its companion thread and
//! starts tracking it.
use std::sync::Arc;

use serenity::model::id::{ChannelId, MessageId, UserId};
use tracing::{error, info, instrument, warn};

use super::codec;
use super::constants::{ABSENCE_EMOJI, CLOSE_EMOJI, COMMAND_NAME, THREAD_AUTO_ARCHIVE_MINUTES};
use super::model::{Announcement, Profile, ZkouskaId};
use super::platform::ChatPlatform;
use super::store::ZkouskaStore;
use crate::error::ZkouskaError;

/// Returns the raw description if `content` is the creation command, `None` otherwise.
/// A bare `!zkouska` yields an empty description so the caller can explain the usage.
pub fn parse_command(content: &str) -> Option<&str> {
    let rest = content.strip_prefix(COMMAND_NAME)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.strip_prefix(char::is_whitespace)
}

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub channel_id: ChannelId,
    pub command_message_id: MessageId,
    pub author_id: UserId,
    pub raw_description: String,
}

pub struct ZkouskaCreator {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<ZkouskaStore>,
    destination_channel_id: ChannelId,
}

impl ZkouskaCreator {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<ZkouskaStore>,
        destination_channel_id: ChannelId,
    ) -> Self {
        Self {
            platform,
            store,
            destination_channel_id,
        }
    }

    #[instrument(level = "debug", skip(self, request), fields(author = %request.author_id, channel = %request.channel_id))]
    pub async fn create(&self, request: &CreateRequest) -> Result<Announcement, ZkouskaError> {
        // The startup rebuild swaps the whole store; anything registered before it
        // finishes would be lost.
        if !self.store.is_ready() {
            warn!(target = "zkouska.create", user_id = %request.author_id, "creation refused: state not rebuilt yet");
            return Err(ZkouskaError::NotReady);
        }

        if !self
            .platform
            .has_moderator_capability(request.author_id, request.channel_id)
            .await?
        {
            warn!(target = "zkouska.create", user_id = %request.author_id, "creation refused: not a moderator");
            return Err(ZkouskaError::PermissionDenied);
        }

        let description = request.raw_description.trim();
        if description.is_empty() {
            return Err(ZkouskaError::Validation("empty description".into()));
        }

        self.platform
            .ensure_text_channel(self.destination_channel_id)
            .await
            .inspect_err(|e| {
                error!(target = "zkouska.create", channel = %self.destination_channel_id, error = %e, "destination channel unavailable");
            })?;

        let id = ZkouskaId::generate();
        let message_id = self
            .platform
            .send_text(request.channel_id, &codec::encode_announcement(&id, description))
            .await?;

        // From here on a failure leaves a posted message behind; it is logged, not tracked.
        let thread = match self
            .attach_thread(request.channel_id, message_id, &id, description)
            .await
        {
            Ok(t) => t,
            Err(e) => {
                error!(target = "zkouska.create", zkouska_id = %id, message_id = %message_id, error = %e, "announcement posted without companion thread");
                return Err(e);
            }
        };

        let announcement = Announcement {
            id: id.clone(),
            description: description.to_string(),
            source_channel_id: request.channel_id,
            message_id,
            thread_id: thread,
        };
        self.store.register(announcement.clone()).await;

        let profile = self
            .platform
            .fetch_profile(request.channel_id, request.author_id)
            .await
            .unwrap_or_else(|e| {
                warn!(target = "zkouska.create", user_id = %request.author_id, error = %e, "profile lookup failed");
                Profile::fallback(request.author_id)
            });
        let creator = codec::creator_record(&profile, description, &id, request.author_id);
        if let Err(e) = self.platform.send_embed(thread, &creator).await {
            warn!(target = "zkouska.create", zkouska_id = %id, thread_id = %thread, error = %e, "creator record not posted");
        }

        if let Err(e) = self
            .platform
            .delete_message(request.channel_id, request.command_message_id)
            .await
        {
            warn!(target = "zkouska.create", message_id = %request.command_message_id, error = %e, "command message not deleted");
        }

        info!(target = "zkouska.create", zkouska_id = %id, thread_id = %thread, author = %profile.display_name, description = %description, "zkouska created");
        Ok(announcement)
    }

    async fn attach_thread(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        id: &ZkouskaId,
        description: &str,
    ) -> Result<ChannelId, ZkouskaError> {
        self.platform
            .add_reaction(channel, message_id, ABSENCE_EMOJI)
            .await?;
        self.platform
            .add_reaction(channel, message_id, CLOSE_EMOJI)
            .await?;
        let thread = self
            .platform
            .create_thread(
                self.destination_channel_id,
                &codec::thread_name(description, id),
                THREAD_AUTO_ARCHIVE_MINUTES,
            )
            .await?;
        info!(target = "zkouska.create", thread_name = %thread.name, thread_id = %thread.id, "thread created");
        Ok(thread.id)
    }
}
