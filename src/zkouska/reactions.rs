//! Reaction-driven response state machine and moderator closure.
//!
//! Per (announcement, user) the state is none, absence, late (or unrecovered after a
//! rebuild). Every status transition ends by removing the triggering reaction so counts
//! never accumulate; if the effect itself fails the reaction stays for a later retry.
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::codec;
use super::model::{Announcement, Profile, ResponseStatus, SignalKind, ToggleSignal};
use super::platform::{ChatPlatform, EditOutcome, PlatformError};
use super::store::{CompanionRecord, ZkouskaStore};
use crate::error::ZkouskaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionOutcome {
    /// Not a tracked announcement, the bot's own reaction, or the store is not ready.
    Ignored,
    /// Companion record created, edited or recreated with this status.
    Recorded(ResponseStatus),
    /// Attending: any previous record removed.
    Cleared,
    Closed,
    /// Close attempted without moderator capability; only the reaction was removed.
    CloseDenied,
    /// Unrelated emoji removed.
    Discarded,
}

pub struct ReactionProcessor {
    platform: Arc<dyn ChatPlatform>,
    store: Arc<ZkouskaStore>,
}

impl ReactionProcessor {
    pub fn new(platform: Arc<dyn ChatPlatform>, store: Arc<ZkouskaStore>) -> Self {
        Self { platform, store }
    }

    #[instrument(level = "debug", skip(self, signal), fields(message_id = %signal.message_id, user_id = %signal.user_id, emoji = %signal.emoji))]
    pub async fn handle(&self, signal: &ToggleSignal) -> Result<ReactionOutcome, ZkouskaError> {
        if !self.store.is_ready() {
            debug!(target = "zkouska.reaction", "store not rebuilt yet; ignoring");
            return Ok(ReactionOutcome::Ignored);
        }
        if signal.user_id == self.platform.current_user_id() {
            return Ok(ReactionOutcome::Ignored);
        }
        let Some(announcement) = self.store.announcement(signal.message_id).await else {
            return Ok(ReactionOutcome::Ignored);
        };

        match signal.kind() {
            SignalKind::Close => self.close(&announcement, signal).await,
            SignalKind::Attending => self.clear_status(signal).await,
            SignalKind::Absence => self.apply_status(signal, ResponseStatus::Absence).await,
            SignalKind::Late => self.apply_status(signal, ResponseStatus::Late).await,
            SignalKind::Other => {
                self.clear_signal(signal).await;
                Ok(ReactionOutcome::Discarded)
            }
        }
    }

    async fn apply_status(
        &self,
        signal: &ToggleSignal,
        status: ResponseStatus,
    ) -> Result<ReactionOutcome, ZkouskaError> {
        let _gate = self.store.enter_announcement(signal.message_id).await;
        let _guard = self.store.lock_key(signal.message_id, signal.user_id).await;
        // Closure may have happened while waiting.
        let Some(announcement) = self.store.announcement(signal.message_id).await else {
            return Ok(ReactionOutcome::Ignored);
        };

        let profile = self.profile(&announcement, signal).await;
        let embed = codec::response_record(&profile, signal.user_id, status);
        let thread = announcement.thread_id;

        let message_id = match self
            .store
            .companion(signal.message_id, signal.user_id)
            .await
        {
            Some(existing) => match self
                .platform
                .edit_embed(thread, existing.message_id, &embed)
                .await?
            {
                EditOutcome::Edited => {
                    info!(target = "zkouska.reaction", user = %profile.display_name, zkouska_id = %announcement.id, from = existing.status.label(), to = status.label(), "response updated");
                    existing.message_id
                }
                EditOutcome::Missing => {
                    let id = self.platform.send_embed(thread, &embed).await?;
                    info!(target = "zkouska.reaction", user = %profile.display_name, zkouska_id = %announcement.id, status = status.label(), "response record recreated");
                    id
                }
            },
            None => {
                let id = self.platform.send_embed(thread, &embed).await?;
                info!(target = "zkouska.reaction", user = %profile.display_name, zkouska_id = %announcement.id, status = status.label(), "response recorded");
                id
            }
        };

        let committed = self
            .store
            .record_response(
                signal.message_id,
                signal.user_id,
                CompanionRecord { message_id, status },
            )
            .await;
        if !committed {
            debug!(target = "zkouska.reaction", zkouska_id = %announcement.id, "announcement replaced mid-update; record not cached");
        }

        self.clear_signal(signal).await;
        Ok(ReactionOutcome::Recorded(status))
    }

    async fn clear_status(&self, signal: &ToggleSignal) -> Result<ReactionOutcome, ZkouskaError> {
        let _gate = self.store.enter_announcement(signal.message_id).await;
        let guard = self.store.lock_key(signal.message_id, signal.user_id).await;
        let outcome = self.clear_status_locked(signal).await;
        // Attending leaves no response behind, so the key lock is pruned.
        self.store.release_key(signal.message_id, signal.user_id, guard);
        outcome
    }

    async fn clear_status_locked(
        &self,
        signal: &ToggleSignal,
    ) -> Result<ReactionOutcome, ZkouskaError> {
        let Some(announcement) = self.store.announcement(signal.message_id).await else {
            return Ok(ReactionOutcome::Ignored);
        };

        if let Some(existing) = self
            .store
            .companion(signal.message_id, signal.user_id)
            .await
        {
            self.platform
                .delete_message(announcement.thread_id, existing.message_id)
                .await?;
            self.store
                .clear_response(signal.message_id, signal.user_id)
                .await;
            info!(target = "zkouska.reaction", user_id = %signal.user_id, zkouska_id = %announcement.id, previous = existing.status.label(), "attendance confirmed; record removed");
        } else {
            debug!(target = "zkouska.reaction", user_id = %signal.user_id, zkouska_id = %announcement.id, "attendance confirmed; nothing to remove");
        }

        self.clear_signal(signal).await;
        Ok(ReactionOutcome::Cleared)
    }

    async fn close(
        &self,
        announcement: &Announcement,
        signal: &ToggleSignal,
    ) -> Result<ReactionOutcome, ZkouskaError> {
        let allowed = self
            .platform
            .has_moderator_capability(signal.user_id, announcement.source_channel_id)
            .await?;
        if !allowed {
            warn!(target = "zkouska.close", user_id = %signal.user_id, zkouska_id = %announcement.id, "close attempted without moderator permission");
            self.clear_signal(signal).await;
            return Ok(ReactionOutcome::CloseDenied);
        }

        // Waits for in-flight status updates so none of them writes after the archive.
        let _gate = self.store.lock_announcement(announcement.message_id).await;
        if self.store.announcement(announcement.message_id).await.is_none() {
            return Ok(ReactionOutcome::Ignored);
        }

        info!(target = "zkouska.close", user_id = %signal.user_id, zkouska_id = %announcement.id, "closing zkouska");
        let profile = self.profile(announcement, signal).await;
        tolerate_missing(
            self.platform
                .send_embed(announcement.thread_id, &codec::closing_record(&profile))
                .await
                .map(|_| ()),
            announcement,
        )?;
        tolerate_missing(
            self.platform.archive_thread(announcement.thread_id).await,
            announcement,
        )?;
        self.platform
            .delete_message(announcement.source_channel_id, announcement.message_id)
            .await?;
        self.store.close(announcement.message_id).await;

        info!(target = "zkouska.close", zkouska_id = %announcement.id, thread_id = %announcement.thread_id, "zkouska closed and thread archived");
        Ok(ReactionOutcome::Closed)
    }

    async fn profile(&self, announcement: &Announcement, signal: &ToggleSignal) -> Profile {
        self.platform
            .fetch_profile(announcement.source_channel_id, signal.user_id)
            .await
            .unwrap_or_else(|e| {
                warn!(target = "zkouska.reaction", user_id = %signal.user_id, error = %e, "profile lookup failed");
                Profile::fallback(signal.user_id)
            })
    }

    /// Failure here is only logged; whatever the transition did stays applied.
    async fn clear_signal(&self, signal: &ToggleSignal) {
        if let Err(e) = self
            .platform
            .remove_reaction(
                signal.channel_id,
                signal.message_id,
                signal.user_id,
                &signal.emoji,
            )
            .await
        {
            warn!(target = "zkouska.reaction", message_id = %signal.message_id, user_id = %signal.user_id, error = %e, "could not remove reaction");
        }
    }
}

/// A thread deleted out from under a closing announcement does not block the close.
fn tolerate_missing(
    result: Result<(), PlatformError>,
    announcement: &Announcement,
) -> Result<(), PlatformError> {
    match result {
        Err(e) if e.is_not_found() => {
            warn!(target = "zkouska.close", zkouska_id = %announcement.id, thread_id = %announcement.thread_id, error = %e, "companion thread missing");
            Ok(())
        }
        other => other,
    }
}
