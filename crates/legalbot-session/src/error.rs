use legalbot_client::BackendError;
use legalbot_core::CoreError;
use thiserror::Error;

/// Failures of a single controller operation. None of them poison the
/// controller; retrying the user action is always allowed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("session {0} already has a request in flight")]
    Busy(String),

    #[error("session {0} is completed")]
    Completed(String),

    #[error("message is empty")]
    EmptyMessage,

    #[error("session title is empty")]
    EmptyTitle,

    #[error("session {0} has no document details")]
    NoDetails(String),

    #[error("details for session {0} are not verified")]
    NotVerified(String),

    #[error("invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
