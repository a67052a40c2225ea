//! In-memory `ChatPlatform` used by the integration tests. Records every mutation so tests
//! can assert on what would have been sent to Discord.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use serenity::model::id::{ChannelId, MessageId, UserId};
use zkouska_bot::zkouska::codec::RecordEmbed;
use zkouska_bot::zkouska::model::{Profile, ToggleSignal};
use zkouska_bot::zkouska::platform::{
    ChatPlatform, EditOutcome, HistoryMessage, PlatformError, ThreadInfo,
};
use zkouska_bot::zkouska::{ZkouskaStore, ZkouskaId};

pub const BOT: u64 = 1;
pub const SOURCE: u64 = 10;
pub const DESTINATION: u64 = 20;
pub const MODERATOR: u64 = 500;

#[derive(Debug, Clone)]
pub struct FakeMessage {
    pub id: MessageId,
    pub author: UserId,
    pub content: String,
    pub embeds: Vec<RecordEmbed>,
    pub edits: usize,
}

#[derive(Debug, Clone)]
pub struct FakeThread {
    pub id: ChannelId,
    pub parent: ChannelId,
    pub name: String,
    pub auto_archive_minutes: u16,
    pub archived: bool,
}

#[derive(Default)]
struct State {
    next_id: u64,
    text_channels: HashSet<ChannelId>,
    moderators: HashSet<UserId>,
    messages: HashMap<ChannelId, Vec<FakeMessage>>,
    threads: Vec<FakeThread>,
    reactions: Vec<(ChannelId, MessageId, UserId, String)>,
    failures: HashSet<String>,
    unreadable: HashSet<ChannelId>,
    holds: HashMap<String, Hold>,
    calls: Vec<String>,
}

/// A one-shot pause: the call signals `entered`, then waits for `release`.
#[derive(Clone, Default)]
pub struct Hold {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

pub struct FakePlatform {
    bot: UserId,
    state: Mutex<State>,
}

impl FakePlatform {
    /// Bot user, source and destination text channels, one moderator.
    pub fn new() -> Arc<Self> {
        let fake = Self {
            bot: UserId::new(BOT),
            state: Mutex::new(State {
                next_id: 1_000,
                ..State::default()
            }),
        };
        fake.add_text_channel(ChannelId::new(SOURCE));
        fake.add_text_channel(ChannelId::new(DESTINATION));
        fake.make_moderator(UserId::new(MODERATOR));
        Arc::new(fake)
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    fn next_id(state: &mut State) -> u64 {
        state.next_id += 1;
        state.next_id
    }

    /// Makes the next call of `op` fail once with a generic error.
    pub fn fail_next(&self, op: &str) {
        self.with(|s| s.failures.insert(op.to_string()));
    }

    /// The next call of `op` stops until the returned hold is released.
    pub fn hold_next(&self, op: &str) -> Hold {
        let hold = Hold::default();
        self.with(|s| s.holds.insert(op.to_string(), hold.clone()));
        hold
    }

    async fn pause(&self, op: &str) {
        if let Some(hold) = self.with(|s| s.holds.remove(op)) {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
    }

    fn check(&self, op: &str) -> Result<(), PlatformError> {
        self.with(|s| {
            s.calls.push(op.to_string());
            if s.failures.remove(op) {
                Err(PlatformError::Other(format!("injected {op} failure")))
            } else {
                Ok(())
            }
        })
    }

    pub fn add_text_channel(&self, channel: ChannelId) {
        self.with(|s| s.text_channels.insert(channel));
    }

    pub fn remove_text_channel(&self, channel: ChannelId) {
        self.with(|s| s.text_channels.remove(&channel));
    }

    pub fn make_moderator(&self, user: UserId) {
        self.with(|s| s.moderators.insert(user));
    }

    pub fn make_unreadable(&self, channel: ChannelId) {
        self.with(|s| s.unreadable.insert(channel));
    }

    pub fn seed_message(
        &self,
        channel: ChannelId,
        author: UserId,
        content: &str,
        embeds: Vec<RecordEmbed>,
    ) -> MessageId {
        self.with(|s| {
            let id = MessageId::new(Self::next_id(s));
            s.messages.entry(channel).or_default().push(FakeMessage {
                id,
                author,
                content: content.to_string(),
                embeds,
                edits: 0,
            });
            id
        })
    }

    pub fn seed_thread(&self, parent: ChannelId, name: &str) -> ChannelId {
        self.with(|s| {
            let id = ChannelId::new(Self::next_id(s));
            s.threads.push(FakeThread {
                id,
                parent,
                name: name.to_string(),
                auto_archive_minutes: 10_080,
                archived: false,
            });
            id
        })
    }

    /// Simulates a user adding a reaction and returns the matching signal.
    pub fn user_reacts(&self, message: MessageId, user: u64, emoji: &str) -> ToggleSignal {
        let channel = ChannelId::new(SOURCE);
        let user = UserId::new(user);
        self.with(|s| {
            s.reactions
                .push((channel, message, user, emoji.to_string()))
        });
        ToggleSignal {
            channel_id: channel,
            message_id: message,
            user_id: user,
            emoji: emoji.to_string(),
        }
    }

    pub fn delete_externally(&self, channel: ChannelId, message: MessageId) {
        self.with(|s| {
            if let Some(list) = s.messages.get_mut(&channel) {
                list.retain(|m| m.id != message);
            }
        });
    }

    pub fn messages_in(&self, channel: ChannelId) -> Vec<FakeMessage> {
        self.with(|s| s.messages.get(&channel).cloned().unwrap_or_default())
    }

    pub fn message(&self, channel: ChannelId, id: MessageId) -> Option<FakeMessage> {
        self.messages_in(channel).into_iter().find(|m| m.id == id)
    }

    pub fn threads(&self) -> Vec<FakeThread> {
        self.with(|s| s.threads.clone())
    }

    pub fn thread(&self, id: ChannelId) -> Option<FakeThread> {
        self.threads().into_iter().find(|t| t.id == id)
    }

    pub fn reactions_on(&self, message: MessageId) -> Vec<(UserId, String)> {
        self.with(|s| {
            s.reactions
                .iter()
                .filter(|(_, m, _, _)| *m == message)
                .map(|(_, _, u, e)| (*u, e.clone()))
                .collect()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.with(|s| s.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with(|s| s.calls.clear());
    }
}

#[async_trait]
impl ChatPlatform for FakePlatform {
    fn current_user_id(&self) -> UserId {
        self.bot
    }

    async fn ensure_text_channel(&self, channel: ChannelId) -> Result<(), PlatformError> {
        self.check("ensure_text_channel")?;
        if self.with(|s| s.text_channels.contains(&channel)) {
            Ok(())
        } else {
            Err(PlatformError::NotFound {
                what: "text channel",
                id: channel.get(),
            })
        }
    }

    async fn send_text(&self, channel: ChannelId, text: &str) -> Result<MessageId, PlatformError> {
        self.check("send_text")?;
        Ok(self.seed_message(channel, self.bot, text, Vec::new()))
    }

    async fn send_embed(
        &self,
        channel: ChannelId,
        embed: &RecordEmbed,
    ) -> Result<MessageId, PlatformError> {
        self.check("send_embed")?;
        // Posting into an archived thread reopens it, as Discord does.
        let exists = self.with(|s| {
            let thread = s.threads.iter_mut().find(|t| t.id == channel);
            let is_thread = thread.is_some();
            if let Some(t) = thread {
                t.archived = false;
            }
            s.text_channels.contains(&channel) || is_thread
        });
        if !exists {
            return Err(PlatformError::NotFound {
                what: "channel",
                id: channel.get(),
            });
        }
        Ok(self.seed_message(channel, self.bot, "", vec![embed.clone()]))
    }

    async fn edit_embed(
        &self,
        channel: ChannelId,
        message: MessageId,
        embed: &RecordEmbed,
    ) -> Result<EditOutcome, PlatformError> {
        self.check("edit_embed")?;
        Ok(self.with(|s| {
            if let Some(t) = s.threads.iter_mut().find(|t| t.id == channel) {
                t.archived = false;
            }
            match s
                .messages
                .get_mut(&channel)
                .and_then(|list| list.iter_mut().find(|m| m.id == message))
            {
                Some(m) => {
                    m.embeds = vec![embed.clone()];
                    m.edits += 1;
                    EditOutcome::Edited
                }
                None => EditOutcome::Missing,
            }
        }))
    }

    async fn delete_message(
        &self,
        channel: ChannelId,
        message: MessageId,
    ) -> Result<(), PlatformError> {
        self.check("delete_message")?;
        self.delete_externally(channel, message);
        self.with(|s| s.reactions.retain(|(_, m, _, _)| *m != message));
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.check("add_reaction")?;
        self.with(|s| {
            s.reactions
                .push((channel, message, UserId::new(BOT), emoji.to_string()))
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel: ChannelId,
        message: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<(), PlatformError> {
        self.check("remove_reaction")?;
        self.with(|s| {
            s.reactions.retain(|(c, m, u, e)| {
                !(*c == channel && *m == message && *u == user && e == emoji)
            })
        });
        Ok(())
    }

    async fn fetch_history(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<HistoryMessage>, PlatformError> {
        self.check("fetch_history")?;
        if self.with(|s| s.unreadable.contains(&channel)) {
            return Err(PlatformError::Other("missing access".into()));
        }
        Ok(self
            .messages_in(channel)
            .into_iter()
            .rev()
            .map(|m| HistoryMessage {
                id: m.id,
                author_id: m.author,
                content: m.content,
                embed_footers: m.embeds.into_iter().filter_map(|e| e.footer).collect(),
            })
            .collect())
    }

    async fn create_thread(
        &self,
        channel: ChannelId,
        name: &str,
        auto_archive_minutes: u16,
    ) -> Result<ThreadInfo, PlatformError> {
        self.check("create_thread")?;
        let id = self.seed_thread(channel, name);
        self.with(|s| {
            if let Some(t) = s.threads.iter_mut().find(|t| t.id == id) {
                t.auto_archive_minutes = auto_archive_minutes;
            }
        });
        Ok(ThreadInfo {
            id,
            name: name.to_string(),
        })
    }

    async fn fetch_active_threads(
        &self,
        channel: ChannelId,
    ) -> Result<Vec<ThreadInfo>, PlatformError> {
        self.check("fetch_active_threads")?;
        Ok(self.with(|s| {
            s.threads
                .iter()
                .filter(|t| t.parent == channel && !t.archived)
                .map(|t| ThreadInfo {
                    id: t.id,
                    name: t.name.clone(),
                })
                .collect()
        }))
    }

    async fn archive_thread(&self, thread: ChannelId) -> Result<(), PlatformError> {
        self.check("archive_thread")?;
        self.with(|s| match s.threads.iter_mut().find(|t| t.id == thread) {
            Some(t) => {
                t.archived = true;
                Ok(())
            }
            None => Err(PlatformError::NotFound {
                what: "thread",
                id: thread.get(),
            }),
        })
    }

    async fn fetch_profile(
        &self,
        _channel: ChannelId,
        user: UserId,
    ) -> Result<Profile, PlatformError> {
        self.pause("fetch_profile").await;
        self.check("fetch_profile")?;
        Ok(Profile {
            display_name: format!("user-{user}"),
            avatar_url: format!("https://cdn.example/{user}.png"),
        })
    }

    async fn has_moderator_capability(
        &self,
        user: UserId,
        _channel: ChannelId,
    ) -> Result<bool, PlatformError> {
        self.check("has_moderator_capability")?;
        Ok(self.with(|s| s.moderators.contains(&user)))
    }
}

/// A store that has finished its (empty) startup rebuild.
pub fn ready_store() -> Arc<ZkouskaStore> {
    let store = Arc::new(ZkouskaStore::new());
    store.mark_ready();
    store
}

pub fn zid(raw: &str) -> ZkouskaId {
    ZkouskaId::parse(raw).expect("valid test id")
}

pub fn source() -> ChannelId {
    ChannelId::new(SOURCE)
}

pub fn destination() -> ChannelId {
    ChannelId::new(DESTINATION)
}
