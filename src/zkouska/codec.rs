//! Text encoding of everything the bot persists in chat: announcement bodies, thread names
//! and the footers of thread records. Decoding never fails loudly; unrecognized text
//! simply yields `None`.
use std::sync::LazyLock;

use regex::Regex;
use serenity::model::colour::Colour;
use serenity::model::id::UserId;

use super::constants::{
    ABSENCE_EMOJI, ANNOUNCEMENT_PREFIX, ATTENDING_EMOJI, CLOSE_EMOJI, CREATOR_FOOTER_MARKER,
    LATE_EMOJI, LOCK_EMOJI, MAX_THREAD_NAME_LENGTH, USER_ID_FOOTER_PREFIX,
};
use super::model::{Profile, ResponseStatus, ZkouskaId};

static ZKOUSKA_ID_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`#([a-fA-F0-9]{8})`").expect("zkouska id pattern is valid"));

static INSTRUCTIONS: LazyLock<String> = LazyLock::new(|| {
    format!(
        "*Reagujte pomocí {ABSENCE_EMOJI} pokud se chcete omluvit z této zkoušky, \
         nebo {LATE_EMOJI} pokud přijdete pozdě. {ATTENDING_EMOJI} zruší vaši omluvenku. \
         Vaše reakce po chvilce zmizí, ale bude zaznamenána.*\n\
         *Moderátoři můžou reagovat pomocí {CLOSE_EMOJI}, aby uzavřeli omluvenky na tuto zkoušku.*"
    )
});

/// Announcement recovered from message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAnnouncement {
    pub id: ZkouskaId,
    pub description: String,
}

pub fn encode_announcement(id: &ZkouskaId, description: &str) -> String {
    format!(
        "{ANNOUNCEMENT_PREFIX} `#{id}`\n\n{description}\n\n{}",
        INSTRUCTIONS.as_str()
    )
}

pub fn is_announcement(text: &str) -> bool {
    text.starts_with(ANNOUNCEMENT_PREFIX)
}

/// Id only; `None` when the prefix is missing or no `` `#XXXXXXXX` `` token is present.
pub fn decode_id(text: &str) -> Option<ZkouskaId> {
    if !is_announcement(text) {
        return None;
    }
    let caps = ZKOUSKA_ID_REGEX.captures(text)?;
    ZkouskaId::parse(caps.get(1)?.as_str())
}

/// Id plus the description between the header line and the fixed instructions.
pub fn decode_announcement(text: &str) -> Option<DecodedAnnouncement> {
    let id = decode_id(text)?;
    let body = text.split_once("\n\n").map(|(_, rest)| rest).unwrap_or("");
    let suffix = format!("\n\n{}", INSTRUCTIONS.as_str());
    let description = body.strip_suffix(suffix.as_str()).unwrap_or(body).trim();
    Some(DecodedAnnouncement {
        id,
        description: description.to_string(),
    })
}

/// `description + " #" + id`, keeping the whole suffix and at most 100 chars in total.
pub fn thread_name(description: &str, id: &ZkouskaId) -> String {
    let suffix = format!(" #{id}");
    let budget = MAX_THREAD_NAME_LENGTH.saturating_sub(suffix.chars().count());
    let head: String = description.chars().take(budget).collect();
    format!("{head}{suffix}")
}

/// Literal suffix a companion thread name ends with.
pub fn thread_suffix(id: &ZkouskaId) -> String {
    format!(" #{id}")
}

// Footers ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FooterRecord {
    Response { user_id: UserId },
    Creator { zkouska_id: String, user_id: UserId },
}

pub fn response_footer(user_id: UserId) -> String {
    format!("{USER_ID_FOOTER_PREFIX}{user_id}")
}

pub fn creator_footer(id: &ZkouskaId, user_id: UserId) -> String {
    format!("{CREATOR_FOOTER_MARKER} {id} | {USER_ID_FOOTER_PREFIX}{user_id}")
}

pub fn decode_footer(text: &str) -> Option<FooterRecord> {
    if let Some(rest) = text.strip_prefix(CREATOR_FOOTER_MARKER) {
        let (id_part, user_part) = rest.split_once('|')?;
        let user_id = parse_user_id(user_part.trim().strip_prefix(USER_ID_FOOTER_PREFIX)?)?;
        return Some(FooterRecord::Creator {
            zkouska_id: id_part.trim().to_string(),
            user_id,
        });
    }
    let user_id = parse_user_id(text.strip_prefix(USER_ID_FOOTER_PREFIX)?)?;
    Some(FooterRecord::Response { user_id })
}

/// Response footers only; creator records and anything unparsable give `None`.
pub fn decode_response_user(text: &str) -> Option<UserId> {
    match decode_footer(text)? {
        FooterRecord::Response { user_id } => Some(user_id),
        FooterRecord::Creator { .. } => None,
    }
}

fn parse_user_id(raw: &str) -> Option<UserId> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|v| *v != 0)
        .map(UserId::new)
}

// Thread records ------------------------------------------------------------------

/// Platform-neutral description of an embed posted into a companion thread.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEmbed {
    pub author_name: String,
    pub author_icon_url: String,
    pub description: String,
    pub colour: Colour,
    pub footer: Option<String>,
}

pub fn creator_record(
    profile: &Profile,
    description: &str,
    id: &ZkouskaId,
    user_id: UserId,
) -> RecordEmbed {
    RecordEmbed {
        author_name: profile.display_name.clone(),
        author_icon_url: profile.avatar_url.clone(),
        description: format!("**Zkouška vytvořena:**\n{description}"),
        colour: Colour::DARK_GREEN,
        footer: Some(creator_footer(id, user_id)),
    }
}

pub fn response_record(profile: &Profile, user_id: UserId, status: ResponseStatus) -> RecordEmbed {
    let (description, colour) = match status {
        ResponseStatus::Absence => ("**Omluvenka ze zkoušky**", Colour::BLUE),
        ResponseStatus::Late => ("**Pozdní příchod na zkoušku**", Colour::ORANGE),
        ResponseStatus::Unrecovered => ("**Reakce na zkoušku**", Colour::LIGHT_GREY),
    };
    RecordEmbed {
        author_name: profile.display_name.clone(),
        author_icon_url: profile.avatar_url.clone(),
        description: description.to_string(),
        colour,
        footer: Some(response_footer(user_id)),
    }
}

pub fn closing_record(profile: &Profile) -> RecordEmbed {
    RecordEmbed {
        author_name: profile.display_name.clone(),
        author_icon_url: profile.avatar_url.clone(),
        description: format!(
            "{LOCK_EMOJI} **Příjem omluvenek uzavřen**\n\nTato zkouška byla uzavřena moderátorem."
        ),
        colour: Colour::RED,
        footer: None,
    }
}
