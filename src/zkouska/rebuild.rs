//! Startup reconstruction of the store from Discord history.
//!
//! Announcements are found in the source channel by their prefix and `#id` token,
//! paired with the open thread whose name ends in ` #id`, and the thread's record
//! footers give back the responder set. Anything that does not decode is skipped with
//! a warning; nothing here aborts startup.
use std::sync::Arc;

use serenity::model::id::{ChannelId, MessageId, UserId};
use tracing::{error, info, instrument, warn};

use super::codec;
use super::model::{Announcement, ResponseStatus};
use super::platform::{ChatPlatform, HistoryMessage, ThreadInfo};
use super::store::{CompanionRecord, StoreTables, ZkouskaStore};
use crate::error::ZkouskaError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RebuildReport {
    /// Bot-authored messages carrying the announcement prefix.
    pub candidates: usize,
    pub rebuilt: usize,
    pub skipped_no_id: usize,
    pub skipped_no_thread: usize,
    pub responders: usize,
}

pub struct StateRebuilder {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<ZkouskaStore>,
    source_channel_id: ChannelId,
    destination_channel_id: ChannelId,
}

impl StateRebuilder {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        store: Arc<ZkouskaStore>,
        source_channel_id: ChannelId,
        destination_channel_id: ChannelId,
    ) -> Self {
        Self {
            platform,
            store,
            source_channel_id,
            destination_channel_id,
        }
    }

    /// Rebuild, log the outcome and open the runtime path regardless of success.
    pub async fn run_startup(&self) -> Option<RebuildReport> {
        let report = match self.rebuild().await {
            Ok(report) => Some(report),
            Err(e) => {
                error!(target = "zkouska.rebuild", error = %e, "rebuilding zkouska state failed; starting empty");
                None
            }
        };
        self.store.mark_ready();
        report
    }

    #[instrument(level = "info", skip(self), fields(source = %self.source_channel_id, destination = %self.destination_channel_id))]
    pub async fn rebuild(&self) -> Result<RebuildReport, ZkouskaError> {
        info!(target = "zkouska.rebuild", "rebuilding zkouska state from Discord");
        let me = self.platform.current_user_id();

        let candidates: Vec<HistoryMessage> = self
            .platform
            .fetch_history(self.source_channel_id)
            .await?
            .into_iter()
            .filter(|m| m.author_id == me && codec::is_announcement(&m.content))
            .collect();
        let threads = self
            .platform
            .fetch_active_threads(self.destination_channel_id)
            .await?;
        info!(target = "zkouska.rebuild", announcements = candidates.len(), threads = threads.len(), "history fetched");

        let mut report = RebuildReport {
            candidates: candidates.len(),
            ..RebuildReport::default()
        };
        let mut tables = StoreTables::default();

        for message in &candidates {
            let Some(decoded) = codec::decode_announcement(&message.content) else {
                warn!(target = "zkouska.rebuild", message_id = %message.id, "could not extract zkouska id");
                report.skipped_no_id += 1;
                continue;
            };
            let Some(thread) = find_thread(&threads, &codec::thread_suffix(&decoded.id)) else {
                warn!(target = "zkouska.rebuild", zkouska_id = %decoded.id, "no open thread for zkouska; dropping");
                report.skipped_no_thread += 1;
                continue;
            };

            tables.insert_announcement(Announcement {
                id: decoded.id.clone(),
                description: decoded.description,
                source_channel_id: self.source_channel_id,
                message_id: message.id,
                thread_id: thread.id,
            });
            let restored = self.restore_responses(&mut tables, message.id, thread, me).await;
            report.rebuilt += 1;
            report.responders += restored;
            info!(target = "zkouska.rebuild", zkouska_id = %decoded.id, thread = %thread.name, responders = restored, "zkouska rebuilt");
        }

        self.store.replace_all(tables).await;
        info!(target = "zkouska.rebuild", rebuilt = report.rebuilt, skipped_no_id = report.skipped_no_id, skipped_no_thread = report.skipped_no_thread, responders = report.responders, "zkouska state rebuilt");
        Ok(report)
    }

    /// Newest record per user wins; history arrives newest first.
    async fn restore_responses(
        &self,
        tables: &mut StoreTables,
        announcement: MessageId,
        thread: &ThreadInfo,
        me: UserId,
    ) -> usize {
        let history = match self.platform.fetch_history(thread.id).await {
            Ok(h) => h,
            Err(e) => {
                warn!(target = "zkouska.rebuild", thread = %thread.name, error = %e, "could not fetch thread messages");
                return 0;
            }
        };

        let mut restored = 0;
        for record in history.iter().filter(|m| m.author_id == me) {
            for user_id in record
                .embed_footers
                .iter()
                .filter_map(|f| codec::decode_response_user(f))
            {
                if tables.companion(announcement, user_id).is_some() {
                    continue;
                }
                let inserted = tables.insert_response(
                    announcement,
                    user_id,
                    CompanionRecord {
                        message_id: record.id,
                        status: ResponseStatus::Unrecovered,
                    },
                );
                if inserted {
                    restored += 1;
                }
            }
        }
        restored
    }
}

/// First thread whose name ends with the literal suffix. Duplicates are not resolved.
fn find_thread<'a>(threads: &'a [ThreadInfo], suffix: &str) -> Option<&'a ThreadInfo> {
    threads.iter().find(|t| t.name.ends_with(suffix))
}
