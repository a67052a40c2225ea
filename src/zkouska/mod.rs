//! Exam announcements ("zkouška"): creation, reaction-driven absence tracking,
//! moderator closure and state recovery from chat history.
pub mod codec;
pub mod constants;
pub mod creator;
pub mod model;
pub mod platform;
pub mod reactions;
pub mod rebuild;
pub mod serenity_platform;
pub mod store;

pub use creator::{CreateRequest, ZkouskaCreator};
pub use model::{Announcement, ResponseStatus, SignalKind, ToggleSignal, ZkouskaId};
pub use platform::ChatPlatform;
pub use reactions::{ReactionOutcome, ReactionProcessor};
pub use rebuild::{RebuildReport, StateRebuilder};
pub use store::ZkouskaStore;
