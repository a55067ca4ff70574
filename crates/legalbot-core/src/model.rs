//! Session, message, and document types shared by the controller and the
//! backend client.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;

/// Title given to a freshly created session. Sessions still carrying it are
/// renamed from their first user message.
pub const DEFAULT_SESSION_TITLE: &str = "New Document";

/// Document type assigned when a draft is produced; the backend does not
/// classify drafts itself.
pub const DEFAULT_DOCUMENT_TYPE: &str = "Legal Document";

/// Reserved details key. Displayed on its own and never editable.
pub const DOCUMENT_TYPE_FIELD: &str = "Document Type";

/// Generate a fresh local identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ── Wire identifiers ──

/// Backend primary keys are UUID strings for sessions and documents but
/// integer autoincrement keys for details and messages.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireId {
    Text(String),
    Number(u64),
}

impl From<WireId> for String {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Text(s) => s,
            WireId::Number(n) => n.to_string(),
        }
    }
}

fn id_from_wire<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    WireId::deserialize(d).map(String::from)
}

fn optional_id_from_wire<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<WireId>::deserialize(d)?.map(String::from))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Lifecycle status of a drafting session.
///
/// Only forward transitions are legal: `drafting → reviewing → completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Drafting,
    Reviewing,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::Reviewing => "reviewing",
            Self::Completed => "completed",
        }
    }

    /// Whether `self → next` is a legal single step.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Drafting, Self::Reviewing) | (Self::Reviewing, Self::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drafting" => Ok(Self::Drafting),
            "reviewing" => Ok(Self::Reviewing),
            "completed" => Ok(Self::Completed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// One conversation turn. Immutable once appended to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(deserialize_with = "id_from_wire")]
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A generated legal document. `content` is authoritative; refinement
/// replaces it in place without changing `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    /// Owning session id.
    pub session: String,
    pub document_type: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatted_content: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

impl Document {
    pub fn new(id: String, session: String, content: String) -> Self {
        Self {
            id,
            session,
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            content,
            formatted_content: None,
            verified: false,
        }
    }

    /// Text to show in a preview: the formatted variant when present and
    /// non-empty, otherwise the raw content.
    pub fn preview(&self) -> &str {
        match self.formatted_content.as_deref() {
            Some(f) if !f.is_empty() => f,
            _ => &self.content,
        }
    }
}

/// Extracted key/value details for a document, subject to user verification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDetails {
    /// Backend identifier, `None` until the details have been persisted.
    #[serde(
        default,
        deserialize_with = "optional_id_from_wire",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Owning document id.
    pub document: String,
    pub details: BTreeMap<String, String>,
    #[serde(default)]
    pub verified: bool,
}

impl DocumentDetails {
    pub fn new(document: String, details: BTreeMap<String, String>) -> Self {
        Self {
            id: None,
            document,
            details,
            verified: false,
        }
    }

    pub fn document_type(&self) -> Option<&str> {
        self.details.get(DOCUMENT_TYPE_FIELD).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.details.is_empty()
    }
}

/// One document-drafting conversation and its artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub title: String,
    pub status: SessionStatus,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Document>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<DocumentDetails>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            status: SessionStatus::Drafting,
            messages: Vec::new(),
            document: None,
            details: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// A session is renamed from its first message only while it has no
    /// messages and still carries the default title.
    pub fn is_title_eligible(&self) -> bool {
        self.messages.is_empty() && self.title == DEFAULT_SESSION_TITLE
    }

    pub fn is_verified(&self) -> bool {
        self.details.as_ref().is_some_and(|d| d.verified)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Download formats offered by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Docx,
    Pdf,
}

impl DownloadFormat {
    /// Query-string value and file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Pdf => "pdf",
        }
    }

    /// File name a download of this format is saved under.
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.extension())
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.extension())
    }
}

impl FromStr for DownloadFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "pdf" => Ok(Self::Pdf),
            other => Err(CoreError::UnknownFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_transitions_forward_only() {
        use SessionStatus::*;
        assert!(Drafting.can_transition_to(Reviewing));
        assert!(Reviewing.can_transition_to(Completed));
        assert!(!Drafting.can_transition_to(Completed));
        assert!(!Reviewing.can_transition_to(Drafting));
        assert!(!Completed.can_transition_to(Reviewing));
        assert!(!Drafting.can_transition_to(Drafting));
    }

    #[test]
    fn status_serialises_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Reviewing).unwrap();
        assert_eq!(json, "\"reviewing\"");
        let parsed: SessionStatus = serde_json::from_str("\"completed\"").unwrap();
        assert_eq!(parsed, SessionStatus::Completed);
    }

    #[test]
    fn status_from_str_rejects_unknown() {
        assert_eq!("Drafting".parse::<SessionStatus>(), Ok(SessionStatus::Drafting));
        assert!(matches!(
            "archived".parse::<SessionStatus>(),
            Err(CoreError::UnknownStatus(_))
        ));
    }

    #[test]
    fn new_session_is_title_eligible() {
        let session = Session::new("s1", DEFAULT_SESSION_TITLE);
        assert_eq!(session.status, SessionStatus::Drafting);
        assert!(session.is_title_eligible());

        let renamed = Session::new("s2", "Lease for flat 4");
        assert!(!renamed.is_title_eligible());
    }

    #[test]
    fn preview_falls_back_to_content() {
        let mut doc = Document::new("d1".into(), "s1".into(), "# NDA".into());
        assert_eq!(doc.preview(), "# NDA");
        doc.formatted_content = Some(String::new());
        assert_eq!(doc.preview(), "# NDA");
        doc.formatted_content = Some("1. NDA\n".into());
        assert_eq!(doc.preview(), "1. NDA\n");
    }

    #[test]
    fn download_format_parsing() {
        assert_eq!("DOCX".parse::<DownloadFormat>(), Ok(DownloadFormat::Docx));
        assert_eq!("pdf".parse::<DownloadFormat>(), Ok(DownloadFormat::Pdf));
        assert!("odt".parse::<DownloadFormat>().is_err());
        assert_eq!(DownloadFormat::Pdf.file_name("Lease"), "Lease.pdf");
    }

    #[test]
    fn message_role_json() {
        let msg = Message::user("I need an NDA");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "I need an NDA");
    }

    #[test]
    fn details_accept_integer_and_string_ids() {
        let details: DocumentDetails = serde_json::from_str(
            r#"{"id": 7, "document": "d1", "details": {"Party 1 Name": "Acme"}, "verified": true, "created_at": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(details.id.as_deref(), Some("7"));
        assert!(details.verified);

        let details: DocumentDetails =
            serde_json::from_str(r#"{"id": "abc", "document": "d1", "details": {}}"#).unwrap();
        assert_eq!(details.id.as_deref(), Some("abc"));

        let details: DocumentDetails =
            serde_json::from_str(r#"{"id": null, "document": "d1", "details": {}}"#).unwrap();
        assert!(details.id.is_none());
        let details: DocumentDetails =
            serde_json::from_str(r#"{"document": "d1", "details": {}}"#).unwrap();
        assert!(details.id.is_none());
    }

    #[test]
    fn message_accepts_integer_id() {
        let msg: Message = serde_json::from_str(
            r#"{"id": 12, "role": "assistant", "content": "Hi", "timestamp": "2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(msg.id, "12");
        assert_eq!(msg.role, Role::Assistant);
    }
}
