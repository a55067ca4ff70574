//! Request and response bodies of the drafting backend.
//!
//! Field names follow the backend's JSON exactly.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use legalbot_core::{Document, Message, Role, Session, SessionStatus};
use serde::{Deserialize, Serialize};

/// One prior turn sent as context to the AI endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for HistoryEntry {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role,
            content: msg.content.clone(),
        }
    }
}

/// Strip messages down to the `{role, content}` pairs the backend expects.
pub fn history_of<'a>(messages: impl IntoIterator<Item = &'a Message>) -> Vec<HistoryEntry> {
    messages.into_iter().map(HistoryEntry::from).collect()
}

// ── AI endpoints ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    pub conversation_history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefineRequest {
    pub current_draft: String,
    pub user_request: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractDetailsRequest {
    pub conversation_history: Vec<HistoryEntry>,
}

/// Reply body of `generate` and `refine`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AiReply {
    pub result: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractDetailsReply {
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub ai_configured: bool,
    pub modules_loaded: bool,
    #[serde(default)]
    pub debug_mode: bool,
}

impl HealthStatus {
    /// Backend is up and able to serve AI requests.
    pub fn is_ready(&self) -> bool {
        self.status == "healthy" && self.ai_configured && self.modules_loaded
    }
}

// ── Sessions ──

/// List endpoints wrap their items in `{"results": [...]}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paginated<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Local session with no messages or artifacts loaded yet.
    pub fn into_session(self) -> Session {
        let mut session = Session::new(self.id, self.title);
        session.status = self.status;
        if let Some(ts) = self.created_at {
            session.created_at = ts;
        }
        if let Some(ts) = self.updated_at {
            session.updated_at = ts;
        }
        session
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSession {
    pub title: String,
    pub status: SessionStatus,
}

/// Partial session update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
}

impl SessionPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

// ── Documents ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentRecord {
    pub id: String,
    pub session: String,
    pub document_type: String,
    pub content: String,
    #[serde(default)]
    pub formatted_content: String,
}

impl From<DocumentRecord> for Document {
    fn from(rec: DocumentRecord) -> Self {
        Document {
            id: rec.id,
            session: rec.session,
            document_type: rec.document_type,
            content: rec.content,
            formatted_content: Some(rec.formatted_content).filter(|f| !f.is_empty()),
            verified: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    pub session: String,
    pub document_type: String,
    pub content: String,
    pub formatted_content: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_content: Option<String>,
}

/// Reply of the backend formatter.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormattedDocument {
    #[serde(default)]
    pub message: String,
    pub formatted_content: String,
}
