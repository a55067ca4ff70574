//! The drafting backend as seen by the session controller.

use std::collections::BTreeMap;

use async_trait::async_trait;
use legalbot_core::{Document, DocumentDetails, DownloadFormat, Message};

use crate::BackendError;
use crate::api::{
    DocumentPatch, ExtractDetailsRequest, FormattedDocument, GenerateRequest, HealthStatus,
    NewDocument, NewSession, RefineRequest, SessionPatch, SessionRecord,
};

/// Every call the controller makes against the backend.
///
/// [`BackendClient`](crate::BackendClient) implements this over HTTP; tests
/// substitute scripted implementations.
#[async_trait]
pub trait Backend: Send + Sync {
    // ── AI ──

    /// Conversational generation. The reply may embed a completion marker.
    async fn generate(&self, req: &GenerateRequest) -> Result<String, BackendError>;

    /// Rewrite `current_draft` per the user's request. The reply is the full
    /// replacement body.
    async fn refine(&self, req: &RefineRequest) -> Result<String, BackendError>;

    async fn extract_details(
        &self,
        req: &ExtractDetailsRequest,
    ) -> Result<BTreeMap<String, String>, BackendError>;

    async fn health(&self) -> Result<HealthStatus, BackendError>;

    // ── Sessions ──

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, BackendError>;

    async fn create_session(&self, new: &NewSession) -> Result<SessionRecord, BackendError>;

    async fn update_session(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<SessionRecord, BackendError>;

    async fn delete_session(&self, id: &str) -> Result<(), BackendError>;

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, BackendError>;

    // ── Documents ──

    /// The session's document, `None` when it has not produced one yet.
    async fn get_document(&self, session_id: &str) -> Result<Option<Document>, BackendError>;

    async fn create_document(&self, new: &NewDocument) -> Result<Document, BackendError>;

    async fn update_document(
        &self,
        id: &str,
        patch: &DocumentPatch,
    ) -> Result<Document, BackendError>;

    async fn format_document(&self, id: &str) -> Result<FormattedDocument, BackendError>;

    async fn download_document(
        &self,
        id: &str,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, BackendError>;

    // ── Details ──

    /// The document's details, `None` when none have been stored.
    async fn get_details(&self, document_id: &str)
    -> Result<Option<DocumentDetails>, BackendError>;

    async fn create_details(
        &self,
        details: &DocumentDetails,
    ) -> Result<DocumentDetails, BackendError>;

    async fn update_details(
        &self,
        id: &str,
        details: &DocumentDetails,
    ) -> Result<DocumentDetails, BackendError>;
}
