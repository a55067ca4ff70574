//! Drafting lifecycle controller.
//!
//! Drives each session through `drafting → reviewing → completed` in
//! response to user input and backend replies. Network calls are the only
//! suspension points; the store lock is never held across one, and a
//! per-session guard keeps at most one request in flight per session.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::join_all;
use legalbot_client::api::{
    DocumentPatch, ExtractDetailsRequest, GenerateRequest, HealthStatus, HistoryEntry,
    NewDocument, NewSession, RefineRequest, SessionPatch, SessionRecord, history_of,
};
use legalbot_client::{Backend, BackendError};
use legalbot_core::{
    CategorizedDetails, CompletionDetector, CoreError, DEFAULT_DOCUMENT_TYPE,
    DEFAULT_SESSION_TITLE, Document, DocumentDetails, DownloadFormat, MarkerDetector, Message,
    Role, Session, SessionStatus, categorize, format::format_document, new_id,
    title_from_message,
};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{info, warn};

use crate::gate;
use crate::store::{Action, SessionStore};
use crate::{ControllerConfig, InFlightPolicy, SessionError};

// ── Canned assistant replies ──

/// Appended instead of the raw reply when a draft is completed.
pub const DRAFT_READY_REPLY: &str =
    "I have prepared the initial draft. Please review it and verify the details below.";

/// Appended after every successful refinement.
pub const REFINED_REPLY: &str =
    "I have updated the document based on your feedback. Please review the changes.";

/// Appended when generate or refine fails.
pub const ERROR_REPLY: &str =
    "Sorry, I encountered an error. Please make sure the backend is running and try again.";

/// Appended when the backend answers with an empty reply.
pub const EMPTY_REPLY: &str =
    "I received your message. How can I help you create a legal document?";

/// Result of the detail-extraction step of a draft completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Details stored; the number of extracted fields.
    Extracted(usize),
    /// Extraction failed; details stay absent until a retry.
    Failed,
    /// Disabled by configuration.
    Skipped,
}

/// What a successful send did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Ordinary conversational reply; the session is still drafting.
    Reply(Message),
    /// The reply carried a finished draft; the session is now reviewing.
    DraftCompleted {
        document_id: String,
        extraction: Extraction,
    },
    /// The document was rewritten in place.
    Refined { document_id: String },
}

enum Request {
    Generate(GenerateRequest),
    Refine(RefineRequest),
}

/// Owns the session store and mediates every state transition.
pub struct SessionController<B> {
    backend: B,
    store: RwLock<SessionStore>,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    detector: Box<dyn CompletionDetector>,
    config: ControllerConfig,
}

impl<B: Backend> SessionController<B> {
    pub fn new(backend: B, config: ControllerConfig) -> Self {
        Self {
            backend,
            store: RwLock::new(SessionStore::new()),
            in_flight: Mutex::new(HashMap::new()),
            detector: Box::new(MarkerDetector::default()),
            config,
        }
    }

    /// Replace the completion detector.
    pub fn with_detector(mut self, detector: Box<dyn CompletionDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    // ── Queries ──

    pub async fn session(&self, session_id: &str) -> Option<Session> {
        self.store.read().await.get(session_id).cloned()
    }

    /// All sessions, newest first.
    pub async fn sessions(&self) -> Vec<Session> {
        self.store.read().await.sessions().to_vec()
    }

    /// The session's details grouped for display. `None` until details exist.
    pub async fn categorized_details(&self, session_id: &str) -> Option<CategorizedDetails> {
        let store = self.store.read().await;
        let details = store.get(session_id)?.details.as_ref()?;
        Some(categorize(&details.details))
    }

    pub async fn health(&self) -> Result<HealthStatus, SessionError> {
        Ok(self.backend.health().await?)
    }

    // ── Session management ──

    /// Create a session on the backend and list it first.
    pub async fn create_session(&self) -> Result<String, SessionError> {
        let record = self
            .backend
            .create_session(&NewSession {
                title: DEFAULT_SESSION_TITLE.to_string(),
                status: SessionStatus::Drafting,
            })
            .await?;
        let session = record.into_session();
        let id = session.id.clone();
        self.store.write().await.apply(Action::SessionCreated(session))?;
        info!(session = %id, "session created");
        Ok(id)
    }

    /// Replace local state with the backend's sessions, their messages,
    /// documents and details. Returns the number of sessions loaded.
    ///
    /// Waits for every outstanding request on a known session first, and
    /// blocks new ones until the reload is applied. Messages are never sent
    /// to the backend, so a reload replaces each conversation with whatever
    /// history the backend holds.
    pub async fn load_sessions(&self) -> Result<usize, SessionError> {
        let _guards = self.acquire_all().await;
        let records = self.backend.list_sessions().await?;
        let sessions = join_all(records.into_iter().map(|rec| self.hydrate(rec))).await;
        let count = sessions.len();

        let mut store = self.store.write().await;
        store.apply(Action::SessionsLoaded(sessions))?;
        self.in_flight
            .lock()
            .await
            .retain(|id, _| store.get(id).is_some());
        drop(store);
        info!(count, "sessions loaded");
        Ok(count)
    }

    /// Build a local session from a backend record. Missing pieces are
    /// logged and left empty rather than failing the whole load; a session
    /// whose document cannot be loaded resumes as drafting.
    async fn hydrate(&self, record: SessionRecord) -> Session {
        let mut session = record.into_session();
        let id = session.id.clone();

        match self.backend.list_messages(&id).await {
            Ok(messages) => session.messages = messages,
            Err(e) => warn!(session = %id, error = %e, "failed to load messages"),
        }

        if session.status == SessionStatus::Drafting {
            return session;
        }
        let document = match self.backend.get_document(&id).await {
            Ok(Some(document)) => document,
            Ok(None) => {
                warn!(session = %id, status = %session.status, "session has no document; resuming as drafting");
                session.status = SessionStatus::Drafting;
                return session;
            }
            Err(e) => {
                warn!(session = %id, status = %session.status, error = %e, "failed to load document; resuming as drafting");
                session.status = SessionStatus::Drafting;
                return session;
            }
        };
        match self.backend.get_details(&document.id).await {
            Ok(details) => session.details = details,
            Err(e) => warn!(session = %id, error = %e, "failed to load details"),
        }
        let mut document = document;
        document.verified = session.is_verified();
        session.document = Some(document);
        session
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<(), SessionError> {
        let _guard = self.acquire(session_id).await?;
        self.backend.delete_session(session_id).await?;
        self.store.write().await.apply(Action::SessionRemoved {
            session_id: session_id.to_string(),
        })?;
        self.in_flight.lock().await.remove(session_id);
        info!(session = %session_id, "session deleted");
        Ok(())
    }

    pub async fn rename_session(&self, session_id: &str, title: &str) -> Result<(), SessionError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(SessionError::EmptyTitle);
        }
        self.store.write().await.apply(Action::TitleChanged {
            session_id: session_id.to_string(),
            title: title.to_string(),
        })?;
        self.persist_session(session_id, SessionPatch::title(title))
            .await;
        Ok(())
    }

    // ── Conversation ──

    /// Append a user message and run it through the backend.
    ///
    /// Drafting sessions send a generate request with the prior conversation;
    /// reviewing sessions send a refine request for the current document.
    /// On backend failure the user message stays, an error reply is
    /// appended, the status is unchanged, and the error is returned.
    pub async fn send_message(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SendOutcome, SessionError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyMessage);
        }
        let _guard = self.acquire(session_id).await?;

        let (request, new_title) = {
            let mut store = self.store.write().await;
            let session = store
                .get(session_id)
                .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;

            let request = match session.status {
                SessionStatus::Completed => {
                    return Err(SessionError::Completed(session_id.to_string()));
                }
                SessionStatus::Drafting => Request::Generate(GenerateRequest {
                    prompt: text.to_string(),
                    conversation_history: history_of(&session.messages),
                }),
                SessionStatus::Reviewing => {
                    let document = session
                        .document
                        .as_ref()
                        .ok_or_else(|| CoreError::MissingDocument(session_id.to_string()))?;
                    Request::Refine(RefineRequest {
                        current_draft: document.content.clone(),
                        user_request: text.to_string(),
                    })
                }
            };
            let new_title = session
                .is_title_eligible()
                .then(|| title_from_message(text));

            store.apply(Action::MessageAppended {
                session_id: session_id.to_string(),
                message: Message::user(text),
            })?;
            if let Some(title) = &new_title {
                store.apply(Action::TitleChanged {
                    session_id: session_id.to_string(),
                    title: title.clone(),
                })?;
            }
            (request, new_title)
        };

        let outcome = match request {
            Request::Generate(req) => self.run_generate(session_id, req).await,
            Request::Refine(req) => self.run_refine(session_id, req).await,
        };

        if let Some(title) = new_title {
            self.persist_session(session_id, SessionPatch::title(title))
                .await;
        }
        outcome
    }

    async fn run_generate(
        &self,
        session_id: &str,
        req: GenerateRequest,
    ) -> Result<SendOutcome, SessionError> {
        let reply = match self.backend.generate(&req).await {
            Ok(reply) => reply,
            Err(e) => return self.fail_request(session_id, "generate", e).await,
        };

        let Some(body) = self.detector.detect(&reply) else {
            let content = if reply.trim().is_empty() {
                EMPTY_REPLY.to_string()
            } else {
                reply
            };
            let message = Message::assistant(content);
            self.append(session_id, message.clone()).await?;
            return Ok(SendOutcome::Reply(message));
        };
        let body = body.to_string();

        let mut history = req.conversation_history;
        history.push(HistoryEntry {
            role: Role::User,
            content: req.prompt,
        });
        self.complete_draft(session_id, body, history).await
    }

    /// drafting → reviewing: attach the draft, then try to extract details.
    async fn complete_draft(
        &self,
        session_id: &str,
        body: String,
        history: Vec<HistoryEntry>,
    ) -> Result<SendOutcome, SessionError> {
        let mut document = Document::new(new_id(), session_id.to_string(), body);
        let new = NewDocument {
            session: session_id.to_string(),
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
            content: document.content.clone(),
            formatted_content: String::new(),
        };
        match self.backend.create_document(&new).await {
            Ok(stored) => document.id = stored.id,
            Err(e) => {
                warn!(session = %session_id, error = %e, "failed to persist document; keeping local id")
            }
        }
        let document_id = document.id.clone();

        {
            let mut store = self.store.write().await;
            store.apply(Action::DraftCompleted {
                session_id: session_id.to_string(),
                document,
            })?;
            store.apply(Action::MessageAppended {
                session_id: session_id.to_string(),
                message: Message::assistant(DRAFT_READY_REPLY),
            })?;
        }
        info!(session = %session_id, document = %document_id, "draft completed");
        self.persist_session(session_id, SessionPatch::status(SessionStatus::Reviewing))
            .await;

        let extraction = if self.config.extract_on_draft {
            match self.extract(session_id, &document_id, history).await {
                Ok(fields) => Extraction::Extracted(fields),
                Err(e) => {
                    warn!(session = %session_id, error = %e, "detail extraction failed");
                    Extraction::Failed
                }
            }
        } else {
            Extraction::Skipped
        };

        Ok(SendOutcome::DraftCompleted {
            document_id,
            extraction,
        })
    }

    async fn run_refine(
        &self,
        session_id: &str,
        req: RefineRequest,
    ) -> Result<SendOutcome, SessionError> {
        let content = match self.backend.refine(&req).await {
            Ok(content) => content,
            Err(e) => return self.fail_request(session_id, "refine", e).await,
        };

        let document_id = {
            let mut store = self.store.write().await;
            store.apply(Action::DocumentContentReplaced {
                session_id: session_id.to_string(),
                content: content.clone(),
            })?;
            store.apply(Action::MessageAppended {
                session_id: session_id.to_string(),
                message: Message::assistant(REFINED_REPLY),
            })?;
            store
                .get(session_id)
                .and_then(|s| s.document.as_ref())
                .map(|d| d.id.clone())
                .ok_or_else(|| CoreError::MissingDocument(session_id.to_string()))?
        };
        info!(session = %session_id, document = %document_id, "document refined");

        let patch = DocumentPatch {
            content: Some(content),
            ..DocumentPatch::default()
        };
        if let Err(e) = self.backend.update_document(&document_id, &patch).await {
            warn!(session = %session_id, error = %e, "failed to persist refined document");
        }
        Ok(SendOutcome::Refined { document_id })
    }

    /// Substitute the error reply for a failed AI request.
    async fn fail_request(
        &self,
        session_id: &str,
        operation: &str,
        error: BackendError,
    ) -> Result<SendOutcome, SessionError> {
        warn!(session = %session_id, operation, error = %error, "backend request failed");
        self.append(session_id, Message::assistant(ERROR_REPLY))
            .await?;
        Err(SessionError::Backend(error))
    }

    async fn append(&self, session_id: &str, message: Message) -> Result<(), SessionError> {
        self.store.write().await.apply(Action::MessageAppended {
            session_id: session_id.to_string(),
            message,
        })
    }

    // ── Details ──

    async fn extract(
        &self,
        session_id: &str,
        document_id: &str,
        history: Vec<HistoryEntry>,
    ) -> Result<usize, SessionError> {
        let details = self
            .backend
            .extract_details(&ExtractDetailsRequest {
                conversation_history: history,
            })
            .await?;
        let fields = details.len();
        let mut store = self.store.write().await;
        let mut replacement = DocumentDetails::new(document_id.to_string(), details);
        replacement.id = store
            .get(session_id)
            .and_then(|s| s.details.as_ref())
            .and_then(|d| d.id.clone());
        store.apply(Action::DetailsReplaced {
            session_id: session_id.to_string(),
            details: replacement,
        })?;
        info!(session = %session_id, fields, "details extracted");
        Ok(fields)
    }

    /// Request detail extraction again over the whole conversation. Replaces
    /// any existing details, which also clears verification.
    pub async fn retry_extraction(&self, session_id: &str) -> Result<usize, SessionError> {
        let _guard = self.acquire(session_id).await?;
        let (document_id, history) = {
            let store = self.store.read().await;
            let session = require(&store, session_id)?;
            if session.status != SessionStatus::Reviewing {
                return Err(CoreError::InvalidTransition {
                    from: session.status,
                    to: SessionStatus::Reviewing,
                }
                .into());
            }
            let document = session
                .document
                .as_ref()
                .ok_or_else(|| CoreError::MissingDocument(session_id.to_string()))?;
            (document.id.clone(), history_of(&session.messages))
        };
        self.extract(session_id, &document_id, history).await
    }

    /// Change one detail value locally. Returns whether anything changed.
    ///
    /// Edits are sent to the backend with the next [`set_verified`](Self::set_verified).
    pub async fn update_detail(
        &self,
        session_id: &str,
        key: &str,
        value: &str,
    ) -> Result<bool, SessionError> {
        let _guard = self.acquire(session_id).await?;
        let mut store = self.store.write().await;
        let session = require(&store, session_id)?;
        ensure_open(session)?;
        let details = session
            .details
            .as_ref()
            .ok_or_else(|| SessionError::NoDetails(session_id.to_string()))?;

        let Some(edited) = gate::edit_detail(details, key, value, self.config.edit_policy)? else {
            return Ok(false);
        };
        let was_verified = details.verified;
        let now_verified = edited.verified;
        store.apply(Action::DetailsReplaced {
            session_id: session_id.to_string(),
            details: edited,
        })?;
        if was_verified && !now_verified {
            info!(session = %session_id, field = key, "detail edited; verification cleared");
        }
        Ok(true)
    }

    /// Persist the current field mapping together with `verified` as one
    /// backend update, then mirror it locally. Local state is unchanged if
    /// the backend rejects the update.
    pub async fn set_verified(&self, session_id: &str, verified: bool) -> Result<(), SessionError> {
        let _guard = self.acquire(session_id).await?;
        let mut candidate = {
            let store = self.store.read().await;
            let session = require(&store, session_id)?;
            ensure_open(session)?;
            session
                .details
                .clone()
                .ok_or_else(|| SessionError::NoDetails(session_id.to_string()))?
        };
        candidate.verified = verified;

        let stored = match candidate.id.as_deref() {
            Some(id) => self.backend.update_details(id, &candidate).await?,
            None => self.backend.create_details(&candidate).await?,
        };
        candidate.id = stored.id.or(candidate.id);

        self.store.write().await.apply(Action::DetailsReplaced {
            session_id: session_id.to_string(),
            details: candidate,
        })?;
        info!(session = %session_id, verified, "verification updated");
        Ok(())
    }

    // ── Document ──

    /// Download the verified document to `dir/{file_name}.{format}`.
    ///
    /// Rejected without any network call unless the details are verified.
    pub async fn download(
        &self,
        session_id: &str,
        format: DownloadFormat,
        file_name: &str,
        dir: &Path,
    ) -> Result<PathBuf, SessionError> {
        let stem = gate::file_stem(file_name)?;
        let _guard = self.acquire(session_id).await?;
        let document_id = {
            let store = self.store.read().await;
            let session = require(&store, session_id)?;
            gate::download_target(session)?.id.clone()
        };

        let bytes = self.backend.download_document(&document_id, format).await?;
        let path = dir.join(format.file_name(stem));
        tokio::fs::write(&path, &bytes).await?;
        info!(session = %session_id, path = %path.display(), bytes = bytes.len(), "document saved");
        Ok(path)
    }

    /// Refresh the document's formatted rendering. Falls back to the local
    /// formatter when the backend cannot format it.
    pub async fn format_document(&self, session_id: &str) -> Result<String, SessionError> {
        let _guard = self.acquire(session_id).await?;
        let (document_id, content) = {
            let store = self.store.read().await;
            let session = require(&store, session_id)?;
            let document = session
                .document
                .as_ref()
                .ok_or_else(|| CoreError::MissingDocument(session_id.to_string()))?;
            (document.id.clone(), document.content.clone())
        };

        let formatted = match self.backend.format_document(&document_id).await {
            Ok(reply) if !reply.formatted_content.is_empty() => reply.formatted_content,
            Ok(_) => format_document(&content),
            Err(e) => {
                warn!(session = %session_id, error = %e, "backend formatting failed; using local formatter");
                format_document(&content)
            }
        };
        self.store.write().await.apply(Action::DocumentFormatted {
            session_id: session_id.to_string(),
            formatted_content: formatted.clone(),
        })?;
        Ok(formatted)
    }

    /// reviewing → completed. Requires verified details; terminal afterwards.
    pub async fn complete_session(&self, session_id: &str) -> Result<(), SessionError> {
        let _guard = self.acquire(session_id).await?;
        {
            let mut store = self.store.write().await;
            let session = require(&store, session_id)?;
            ensure_open(session)?;
            if session.status == SessionStatus::Reviewing && !session.is_verified() {
                return Err(SessionError::NotVerified(session_id.to_string()));
            }
            store.apply(Action::StatusChanged {
                session_id: session_id.to_string(),
                status: SessionStatus::Completed,
            })?;
        }
        info!(session = %session_id, "session completed");
        self.persist_session(session_id, SessionPatch::status(SessionStatus::Completed))
            .await;
        Ok(())
    }

    // ── Helpers ──

    /// Take the session's in-flight guard according to the configured policy.
    ///
    /// Unknown sessions are rejected before a guard is created for them.
    async fn acquire(&self, session_id: &str) -> Result<OwnedMutexGuard<()>, SessionError> {
        self.require_session(session_id).await?;
        let lock = self
            .in_flight
            .lock()
            .await
            .entry(session_id.to_string())
            .or_default()
            .clone();
        match self.config.in_flight {
            InFlightPolicy::Reject => lock
                .try_lock_owned()
                .map_err(|_| SessionError::Busy(session_id.to_string())),
            InFlightPolicy::Queue => Ok(lock.lock_owned().await),
        }
    }

    /// Take the guard of every known session, in store order, waiting for
    /// outstanding requests regardless of policy.
    async fn acquire_all(&self) -> Vec<OwnedMutexGuard<()>> {
        let ids: Vec<String> = {
            let store = self.store.read().await;
            store.sessions().iter().map(|s| s.id.clone()).collect()
        };
        let locks: Vec<Arc<Mutex<()>>> = {
            let mut in_flight = self.in_flight.lock().await;
            ids.into_iter()
                .map(|id| in_flight.entry(id).or_default().clone())
                .collect()
        };
        let mut guards = Vec::with_capacity(locks.len());
        for lock in locks {
            guards.push(lock.lock_owned().await);
        }
        guards
    }

    async fn require_session(&self, session_id: &str) -> Result<(), SessionError> {
        require(&*self.store.read().await, session_id).map(|_| ())
    }

    /// Best-effort session update; failures never roll back local state.
    async fn persist_session(&self, session_id: &str, patch: SessionPatch) {
        if let Err(e) = self.backend.update_session(session_id, &patch).await {
            warn!(session = %session_id, error = %e, "failed to persist session update");
        }
    }
}

fn require<'a>(store: &'a SessionStore, session_id: &str) -> Result<&'a Session, SessionError> {
    store
        .get(session_id)
        .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
}

fn ensure_open(session: &Session) -> Result<(), SessionError> {
    if session.status.is_terminal() {
        return Err(SessionError::Completed(session.id.clone()));
    }
    Ok(())
}
