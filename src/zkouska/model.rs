//! Domain types shared by the zkouska components.
use std::fmt;

use rand::Rng;
use serenity::model::id::{ChannelId, MessageId, UserId};

use super::constants::{ABSENCE_EMOJI, ATTENDING_EMOJI, CLOSE_EMOJI, LATE_EMOJI, ZKOUSKA_ID_LENGTH};

/// The 8-hex-digit token embedded in both the announcement text and the thread name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ZkouskaId(String);

impl ZkouskaId {
    /// Fresh random id, lowercase hex.
    pub fn generate() -> Self {
        let raw: u32 = rand::rng().random();
        Self(format!("{raw:08x}"))
    }

    /// Accepts exactly eight ASCII hex digits. Case is preserved so suffix matching
    /// against thread names sees the same text that was written.
    pub fn parse(raw: &str) -> Option<Self> {
        (raw.len() == ZKOUSKA_ID_LENGTH && raw.chars().all(|c| c.is_ascii_hexdigit()))
            .then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZkouskaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A tracked announcement. Keyed in the store by `message_id`, since that is what
/// reaction events carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub id: ZkouskaId,
    pub description: String,
    pub source_channel_id: ChannelId,
    pub message_id: MessageId,
    pub thread_id: ChannelId,
}

/// Status held by an active response. `Unrecovered` marks responders rebuilt from
/// history, where the footer does not say whether they were absent or late.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Absence,
    Late,
    Unrecovered,
}

impl ResponseStatus {
    pub fn label(self) -> &'static str {
        match self {
            ResponseStatus::Absence => "omluvenka",
            ResponseStatus::Late => "pozdní příchod",
            ResponseStatus::Unrecovered => "neznámý stav",
        }
    }
}

/// What a reaction on an announcement asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Absence,
    Late,
    Attending,
    Close,
    Other,
}

impl SignalKind {
    /// Variation selectors are ignored: clients send "🗑️" both with and without U+FE0F.
    pub fn from_emoji(emoji: &str) -> Self {
        let bare = strip_variation(emoji);
        if bare == strip_variation(ABSENCE_EMOJI) {
            SignalKind::Absence
        } else if bare == strip_variation(LATE_EMOJI) {
            SignalKind::Late
        } else if bare == strip_variation(ATTENDING_EMOJI) {
            SignalKind::Attending
        } else if bare == strip_variation(CLOSE_EMOJI) {
            SignalKind::Close
        } else {
            SignalKind::Other
        }
    }
}

fn strip_variation(emoji: &str) -> &str {
    emoji.trim_end_matches('\u{fe0f}')
}

/// A reaction added to some message, as seen by the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleSignal {
    pub channel_id: ChannelId,
    pub message_id: MessageId,
    pub user_id: UserId,
    /// Exactly as received, so clearing removes the same reaction.
    pub emoji: String,
}

impl ToggleSignal {
    pub fn kind(&self) -> SignalKind {
        SignalKind::from_emoji(&self.emoji)
    }
}

/// Display data used as the author block of thread records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub display_name: String,
    pub avatar_url: String,
}

impl Profile {
    /// Used when the platform cannot resolve the user; the record is still written.
    pub fn fallback(user_id: UserId) -> Self {
        Self {
            display_name: format!("Uživatel {user_id}"),
            avatar_url: String::new(),
        }
    }
}
