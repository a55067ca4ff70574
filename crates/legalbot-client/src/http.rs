//! HTTP client for the LegalBot drafting backend.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use legalbot_core::{Document, DocumentDetails, DownloadFormat, Message};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::api::{
    AiReply, DocumentPatch, DocumentRecord, ExtractDetailsReply, ExtractDetailsRequest,
    FormattedDocument, GenerateRequest, HealthStatus, NewDocument, NewSession, Paginated,
    RefineRequest, SessionPatch, SessionRecord,
};
use crate::{Backend, BackendError};

/// Default address of a locally running backend.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// JSON-over-HTTP client for the backend's `/api/...` endpoints.
#[derive(Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the given backend base URL.
    ///
    /// `base_url` should be like `http://localhost:8000`; a trailing slash is
    /// dropped.
    pub fn new(base_url: String) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client whose requests fail after `timeout`.
    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send and map non-2xx statuses to [`BackendError::Server`].
    async fn send(&self, req: RequestBuilder) -> Result<Response, BackendError> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, BackendError> {
        let resp = self.send(req).await?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Like [`send_json`](Self::send_json) but maps 404 to `None`.
    async fn send_json_opt<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
    ) -> Result<Option<T>, BackendError> {
        match self.send_json(req).await {
            Ok(v) => Ok(Some(v)),
            Err(BackendError::Server { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn generate(&self, req: &GenerateRequest) -> Result<String, BackendError> {
        let url = self.url("/api/ai/generate/");
        info!(url = %url, history = req.conversation_history.len(), "requesting generation");
        let reply: AiReply = self.send_json(self.client.post(&url).json(req)).await?;
        debug!(chars = reply.result.len(), "generation reply received");
        Ok(reply.result)
    }

    async fn refine(&self, req: &RefineRequest) -> Result<String, BackendError> {
        let url = self.url("/api/ai/refine/");
        info!(url = %url, draft_chars = req.current_draft.len(), "requesting refinement");
        let reply: AiReply = self.send_json(self.client.post(&url).json(req)).await?;
        Ok(reply.result)
    }

    async fn extract_details(
        &self,
        req: &ExtractDetailsRequest,
    ) -> Result<BTreeMap<String, String>, BackendError> {
        let url = self.url("/api/ai/extract-details/");
        info!(url = %url, history = req.conversation_history.len(), "requesting detail extraction");
        let reply: ExtractDetailsReply = self.send_json(self.client.post(&url).json(req)).await?;
        info!(fields = reply.details.len(), "details extracted");
        Ok(reply.details)
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        let url = self.url("/api/ai/health/");
        self.send_json(self.client.get(&url)).await
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, BackendError> {
        let url = self.url("/api/sessions/");
        let page: Paginated<SessionRecord> = self.send_json(self.client.get(&url)).await?;
        info!(count = page.results.len(), "listed sessions");
        Ok(page.results)
    }

    async fn create_session(&self, new: &NewSession) -> Result<SessionRecord, BackendError> {
        let url = self.url("/api/sessions/");
        self.send_json(self.client.post(&url).json(new)).await
    }

    async fn update_session(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<SessionRecord, BackendError> {
        let url = self.url(&format!("/api/sessions/{id}/"));
        self.send_json(self.client.put(&url).json(patch)).await
    }

    async fn delete_session(&self, id: &str) -> Result<(), BackendError> {
        let url = self.url(&format!("/api/sessions/{id}/"));
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, BackendError> {
        let url = self.url(&format!("/api/sessions/{session_id}/messages/"));
        let page: Paginated<Message> = self.send_json(self.client.get(&url)).await?;
        Ok(page.results)
    }

    async fn get_document(&self, session_id: &str) -> Result<Option<Document>, BackendError> {
        let url = self.url(&format!("/api/sessions/{session_id}/document/"));
        let rec: Option<DocumentRecord> = self.send_json_opt(self.client.get(&url)).await?;
        Ok(rec.map(Document::from))
    }

    async fn create_document(&self, new: &NewDocument) -> Result<Document, BackendError> {
        let url = self.url("/api/documents/");
        let rec: DocumentRecord = self.send_json(self.client.post(&url).json(new)).await?;
        Ok(rec.into())
    }

    async fn update_document(
        &self,
        id: &str,
        patch: &DocumentPatch,
    ) -> Result<Document, BackendError> {
        let url = self.url(&format!("/api/documents/{id}/"));
        let rec: DocumentRecord = self.send_json(self.client.put(&url).json(patch)).await?;
        Ok(rec.into())
    }

    async fn format_document(&self, id: &str) -> Result<FormattedDocument, BackendError> {
        let url = self.url(&format!("/api/documents/{id}/generate/"));
        self.send_json(self.client.post(&url)).await
    }

    async fn download_document(
        &self,
        id: &str,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, BackendError> {
        let url = self.url(&format!("/api/documents/{id}/download/"));
        info!(url = %url, format = %format, "downloading document");
        let resp = self
            .send(self.client.get(&url).query(&[("format", format.extension())]))
            .await?;
        let bytes = resp.bytes().await?;
        info!(bytes = bytes.len(), "download complete");
        Ok(bytes.to_vec())
    }

    async fn get_details(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentDetails>, BackendError> {
        let url = self.url(&format!("/api/documents/{document_id}/details/"));
        self.send_json_opt(self.client.get(&url)).await
    }

    async fn create_details(
        &self,
        details: &DocumentDetails,
    ) -> Result<DocumentDetails, BackendError> {
        let url = self.url("/api/document-details/");
        self.send_json(self.client.post(&url).json(details)).await
    }

    async fn update_details(
        &self,
        id: &str,
        details: &DocumentDetails,
    ) -> Result<DocumentDetails, BackendError> {
        let url = self.url(&format!("/api/document-details/{id}/"));
        self.send_json(self.client.put(&url).json(details)).await
    }
}
