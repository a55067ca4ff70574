//! Scripted in-memory backend for controller tests.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use legalbot_client::api::{
    DocumentPatch, ExtractDetailsRequest, FormattedDocument, GenerateRequest, HealthStatus,
    NewDocument, NewSession, RefineRequest, SessionPatch, SessionRecord,
};
use legalbot_client::{Backend, BackendError};
use legalbot_core::{Document, DocumentDetails, DownloadFormat, Message};
use tokio::sync::Notify;

/// Server-side id handed out for created documents.
pub const SERVER_DOCUMENT_ID: &str = "srv-doc";
/// Server-side id handed out for created details records.
pub const SERVER_DETAILS_ID: &str = "srv-details";

#[derive(Debug, Clone)]
pub enum Call {
    ListSessions,
    Generate(GenerateRequest),
    Refine(RefineRequest),
    Extract(ExtractDetailsRequest),
    UpdateSession(String, SessionPatch),
    CreateDocument(NewDocument),
    UpdateDocument(String, DocumentPatch),
    FormatDocument(String),
    Download(String, DownloadFormat),
    CreateDetails(DocumentDetails),
    UpdateDetails(String, DocumentDetails),
}

/// Blocks the first `generate` call until released, so tests can overlap
/// requests.
#[derive(Default)]
pub struct Gate {
    pub entered: Notify,
    pub release: Notify,
    used: AtomicBool,
}

type Script<T> = Mutex<VecDeque<Result<T, String>>>;

#[derive(Default)]
pub struct FakeBackend {
    generate: Script<String>,
    refine: Script<String>,
    extract: Script<BTreeMap<String, String>>,
    formatted: Mutex<Option<String>>,
    fail_persistence: AtomicBool,
    pub gate: Option<Gate>,
    calls: Mutex<Vec<Call>>,
    sessions: Mutex<Vec<SessionRecord>>,
    messages: Mutex<HashMap<String, Vec<Message>>>,
    documents: Mutex<HashMap<String, Document>>,
    details: Mutex<HashMap<String, DocumentDetails>>,
}

fn unavailable(reason: String) -> BackendError {
    BackendError::Unavailable(reason)
}

fn next<T>(script: &Script<T>, what: &str) -> Result<T, BackendError> {
    script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(format!("no scripted {what} reply")))
        .map_err(unavailable)
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gate: Some(Gate::default()),
            ..Self::default()
        }
    }

    pub fn push_generate(&self, reply: Result<&str, &str>) -> &Self {
        self.generate
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string).map_err(str::to_string));
        self
    }

    pub fn push_refine(&self, reply: Result<&str, &str>) -> &Self {
        self.refine
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string).map_err(str::to_string));
        self
    }

    pub fn push_extract(&self, reply: Result<&[(&str, &str)], &str>) -> &Self {
        let reply = reply
            .map(|fields| {
                fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .map_err(str::to_string);
        self.extract.lock().unwrap().push_back(reply);
        self
    }

    pub fn set_formatted(&self, formatted: Option<&str>) {
        *self.formatted.lock().unwrap() = formatted.map(str::to_string);
    }

    pub fn fail_persistence(&self, fail: bool) {
        self.fail_persistence.store(fail, Ordering::SeqCst);
    }

    pub fn seed_session(
        &self,
        record: SessionRecord,
        messages: Vec<Message>,
        document: Option<Document>,
        details: Option<DocumentDetails>,
    ) {
        let id = record.id.clone();
        self.sessions.lock().unwrap().push(record);
        self.messages.lock().unwrap().insert(id.clone(), messages);
        if let Some(document) = document {
            if let Some(details) = details {
                self.details
                    .lock()
                    .unwrap()
                    .insert(document.id.clone(), details);
            }
            self.documents.lock().unwrap().insert(id, document);
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn persist(&self) -> Result<(), BackendError> {
        if self.fail_persistence.load(Ordering::SeqCst) {
            Err(unavailable("persistence disabled".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn generate(&self, req: &GenerateRequest) -> Result<String, BackendError> {
        self.record(Call::Generate(req.clone()));
        if let Some(gate) = &self.gate
            && !gate.used.swap(true, Ordering::SeqCst)
        {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        next(&self.generate, "generate")
    }

    async fn refine(&self, req: &RefineRequest) -> Result<String, BackendError> {
        self.record(Call::Refine(req.clone()));
        next(&self.refine, "refine")
    }

    async fn extract_details(
        &self,
        req: &ExtractDetailsRequest,
    ) -> Result<BTreeMap<String, String>, BackendError> {
        self.record(Call::Extract(req.clone()));
        next(&self.extract, "extract")
    }

    async fn health(&self) -> Result<HealthStatus, BackendError> {
        Ok(HealthStatus {
            status: "healthy".into(),
            ai_configured: true,
            modules_loaded: true,
            debug_mode: false,
        })
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, BackendError> {
        self.record(Call::ListSessions);
        Ok(self.sessions.lock().unwrap().clone())
    }

    async fn create_session(&self, new: &NewSession) -> Result<SessionRecord, BackendError> {
        let record = SessionRecord {
            id: format!("s{}", self.sessions.lock().unwrap().len() + 1),
            title: new.title.clone(),
            status: new.status,
            created_at: None,
            updated_at: None,
        };
        self.sessions.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn update_session(
        &self,
        id: &str,
        patch: &SessionPatch,
    ) -> Result<SessionRecord, BackendError> {
        self.record(Call::UpdateSession(id.to_string(), patch.clone()));
        self.persist()?;
        let mut sessions = self.sessions.lock().unwrap();
        let record = sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| BackendError::Server {
                status: 404,
                body: "not found".into(),
            })?;
        if let Some(title) = &patch.title {
            record.title = title.clone();
        }
        if let Some(status) = patch.status {
            record.status = status;
        }
        Ok(record.clone())
    }

    async fn delete_session(&self, id: &str) -> Result<(), BackendError> {
        self.sessions.lock().unwrap().retain(|s| s.id != id);
        Ok(())
    }

    async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, BackendError> {
        Ok(self
            .messages
            .lock()
            .unwrap()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_document(&self, session_id: &str) -> Result<Option<Document>, BackendError> {
        Ok(self.documents.lock().unwrap().get(session_id).cloned())
    }

    async fn create_document(&self, new: &NewDocument) -> Result<Document, BackendError> {
        self.record(Call::CreateDocument(new.clone()));
        self.persist()?;
        Ok(Document::new(
            SERVER_DOCUMENT_ID.into(),
            new.session.clone(),
            new.content.clone(),
        ))
    }

    async fn update_document(
        &self,
        id: &str,
        patch: &DocumentPatch,
    ) -> Result<Document, BackendError> {
        self.record(Call::UpdateDocument(id.to_string(), patch.clone()));
        self.persist()?;
        Ok(Document::new(
            id.to_string(),
            String::new(),
            patch.content.clone().unwrap_or_default(),
        ))
    }

    async fn format_document(&self, id: &str) -> Result<FormattedDocument, BackendError> {
        self.record(Call::FormatDocument(id.to_string()));
        match self.formatted.lock().unwrap().clone() {
            Some(formatted_content) => Ok(FormattedDocument {
                message: "Document formatted".into(),
                formatted_content,
            }),
            None => Err(BackendError::Server {
                status: 500,
                body: "formatter offline".into(),
            }),
        }
    }

    async fn download_document(
        &self,
        id: &str,
        format: DownloadFormat,
    ) -> Result<Vec<u8>, BackendError> {
        self.record(Call::Download(id.to_string(), format));
        Ok(format!("{id}:{}", format.extension()).into_bytes())
    }

    async fn get_details(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentDetails>, BackendError> {
        Ok(self.details.lock().unwrap().get(document_id).cloned())
    }

    async fn create_details(
        &self,
        details: &DocumentDetails,
    ) -> Result<DocumentDetails, BackendError> {
        self.record(Call::CreateDetails(details.clone()));
        self.persist()?;
        let mut stored = details.clone();
        stored.id = Some(SERVER_DETAILS_ID.into());
        Ok(stored)
    }

    async fn update_details(
        &self,
        id: &str,
        details: &DocumentDetails,
    ) -> Result<DocumentDetails, BackendError> {
        self.record(Call::UpdateDetails(id.to_string(), details.clone()));
        self.persist()?;
        Ok(details.clone())
    }
}
