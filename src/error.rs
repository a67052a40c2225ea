//! Error taxonomy for the zkouska lifecycle.
use crate::zkouska::constants::{
    CHANNEL_NOT_FOUND_MESSAGE, CREATE_ERROR_MESSAGE, MISSING_DESCRIPTION_MESSAGE,
    NOT_READY_MESSAGE, NO_PERMISSION_MESSAGE,
};
use crate::zkouska::platform::PlatformError;

#[derive(Debug, thiserror::Error)]
pub enum ZkouskaError {
    /// Bad user input; nothing changed.
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("moderator permission required")]
    PermissionDenied,
    /// Startup rebuild still running.
    #[error("zkouska state is not rebuilt yet")]
    NotReady,
    #[error("{0} not found")]
    NotFound(String),
    /// Any other collaborator failure. Never retried automatically.
    #[error("chat platform call failed: {0}")]
    External(PlatformError),
}

impl From<PlatformError> for ZkouskaError {
    fn from(err: PlatformError) -> Self {
        match err {
            PlatformError::NotFound { what, id } => ZkouskaError::NotFound(format!("{what} {id}")),
            other => ZkouskaError::External(other),
        }
    }
}

impl ZkouskaError {
    /// Reply shown to the user who triggered the failing command.
    pub fn user_message(&self) -> &'static str {
        match self {
            ZkouskaError::Validation(_) => MISSING_DESCRIPTION_MESSAGE,
            ZkouskaError::PermissionDenied => NO_PERMISSION_MESSAGE,
            ZkouskaError::NotReady => NOT_READY_MESSAGE,
            ZkouskaError::NotFound(_) => CHANNEL_NOT_FOUND_MESSAGE,
            ZkouskaError::External(_) => CREATE_ERROR_MESSAGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_not_found_maps_to_not_found() {
        let err: ZkouskaError = PlatformError::NotFound {
            what: "thread",
            id: 42,
        }
        .into();
        assert!(matches!(err, ZkouskaError::NotFound(ref s) if s == "thread 42"));
        assert_eq!(err.user_message(), CHANNEL_NOT_FOUND_MESSAGE);
    }

    #[test]
    fn not_ready_asks_to_retry_later() {
        assert_eq!(ZkouskaError::NotReady.user_message(), NOT_READY_MESSAGE);
    }

    #[test]
    fn other_platform_errors_are_external() {
        let err: ZkouskaError = PlatformError::Other("timeout".into()).into();
        assert!(matches!(err, ZkouskaError::External(_)));
        assert_eq!(err.user_message(), CREATE_ERROR_MESSAGE);
    }
}
