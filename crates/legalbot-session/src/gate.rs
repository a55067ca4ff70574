//! Verification and download gating.

use legalbot_core::{CoreError, DOCUMENT_TYPE_FIELD, Document, DocumentDetails, Session};

use crate::{EditPolicy, SessionError};

/// The document a download may fetch, or why it may not.
///
/// Downloads are allowed only once the session's details are verified.
pub fn download_target(session: &Session) -> Result<&Document, SessionError> {
    if !session.is_verified() {
        return Err(SessionError::NotVerified(session.id.clone()));
    }
    session
        .document
        .as_ref()
        .ok_or_else(|| CoreError::MissingDocument(session.id.clone()).into())
}

/// Apply a single field edit under `policy`.
///
/// Returns `None` when the value is unchanged. The reserved
/// `"Document Type"` field cannot be edited.
pub fn edit_detail(
    details: &DocumentDetails,
    key: &str,
    value: &str,
    policy: EditPolicy,
) -> Result<Option<DocumentDetails>, CoreError> {
    if key == DOCUMENT_TYPE_FIELD {
        return Err(CoreError::ReservedField(key.to_string()));
    }
    if details.details.get(key).map(String::as_str) == Some(value) {
        return Ok(None);
    }
    let mut edited = details.clone();
    edited.details.insert(key.to_string(), value.to_string());
    if policy == EditPolicy::ResetOnEdit {
        edited.verified = false;
    }
    Ok(Some(edited))
}

/// Validate a user-chosen download file name (without extension).
pub fn file_stem(name: &str) -> Result<&str, SessionError> {
    let stem = name.trim();
    if stem.is_empty() || stem.contains(['/', '\\']) || stem == "." || stem == ".." {
        return Err(SessionError::InvalidFileName(name.to_string()));
    }
    Ok(stem)
}
