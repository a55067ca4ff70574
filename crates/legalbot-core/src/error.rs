use thiserror::Error;

use crate::SessionStatus;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("session {0} has no document")]
    MissingDocument(String),

    #[error("field {0:?} is reserved and cannot be edited")]
    ReservedField(String),

    #[error("unknown download format: {0}")]
    UnknownFormat(String),

    #[error("unknown session status: {0}")]
    UnknownStatus(String),
}
