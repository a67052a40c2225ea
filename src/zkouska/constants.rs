// Central constants for the zkouska feature: emoji, wire markers, user-facing texts and limits.

// Signal emoji
pub const ABSENCE_EMOJI: &str = "❌";
pub const LATE_EMOJI: &str = "⏰";
pub const ATTENDING_EMOJI: &str = "✅";
pub const CLOSE_EMOJI: &str = "🗑️";
pub const LOCK_EMOJI: &str = "🔒";

/// Trigger for the creation command; the description follows after a single space.
pub const COMMAND_NAME: &str = "!zkouska";

// Wire markers. Every announcement body starts with the prefix; footers are matched literally.
pub const ANNOUNCEMENT_PREFIX: &str = "📝 **Zkouška**";
pub const USER_ID_FOOTER_PREFIX: &str = "User ID: ";
pub const CREATOR_FOOTER_MARKER: &str = "Zkouška ID:";

// User-facing replies
pub const NO_PERMISSION_MESSAGE: &str = "🔒 Potřebujete moderátorské oprávnění k vytvoření zkoušky!";
pub const MISSING_DESCRIPTION_MESSAGE: &str = "⚠️ Chybí popis! Použití: `!zkouska <description>`";
pub const CHANNEL_NOT_FOUND_MESSAGE: &str = "❌ Chyba: Nelze najít cílový kanál.";
pub const NOT_READY_MESSAGE: &str = "⏳ Bot se teprve spouští. Zkuste to prosím za chvíli.";
pub const CREATE_ERROR_MESSAGE: &str = "❌ Chyba pri vytvareni zkousky. Zkuste to prosím znovu.";

// Limits
pub const ZKOUSKA_ID_LENGTH: usize = 8;
/// Discord caps thread names at 100 characters; lengths here are counted in `char`s.
pub const MAX_THREAD_NAME_LENGTH: usize = 100;
/// Auto-archive window for companion threads, in minutes (one week).
pub const THREAD_AUTO_ARCHIVE_MINUTES: u16 = 10_080;
