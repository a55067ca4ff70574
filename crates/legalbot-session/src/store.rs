//! Owned session state, mutated only through [`Action`]s.
//!
//! The reducer enforces the model invariants: messages are append-only,
//! status only moves forward, and a session can never be in review without a
//! document.

use chrono::Utc;
use legalbot_core::{CoreError, Document, DocumentDetails, Message, Session, SessionStatus};
use tracing::debug;

use crate::SessionError;

/// A single state mutation.
#[derive(Debug, Clone)]
pub enum Action {
    /// New session, listed first.
    SessionCreated(Session),
    /// Replace every session, e.g. after a reload from the backend. Rejected
    /// whole if any session past drafting lacks a document.
    SessionsLoaded(Vec<Session>),
    SessionRemoved {
        session_id: String,
    },
    MessageAppended {
        session_id: String,
        message: Message,
    },
    TitleChanged {
        session_id: String,
        title: String,
    },
    /// Attach the first draft and move to reviewing in one step.
    DraftCompleted {
        session_id: String,
        document: Document,
    },
    StatusChanged {
        session_id: String,
        status: SessionStatus,
    },
    /// Refinement result. Clears any stale formatted rendering.
    DocumentContentReplaced {
        session_id: String,
        content: String,
    },
    DocumentFormatted {
        session_id: String,
        formatted_content: String,
    },
    /// Replace the whole details record; the document's verified flag
    /// follows the record.
    DetailsReplaced {
        session_id: String,
        details: DocumentDetails,
    },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated(_) => "session-created",
            Self::SessionsLoaded(_) => "sessions-loaded",
            Self::SessionRemoved { .. } => "session-removed",
            Self::MessageAppended { .. } => "message-appended",
            Self::TitleChanged { .. } => "title-changed",
            Self::DraftCompleted { .. } => "draft-completed",
            Self::StatusChanged { .. } => "status-changed",
            Self::DocumentContentReplaced { .. } => "document-content-replaced",
            Self::DocumentFormatted { .. } => "document-formatted",
            Self::DetailsReplaced { .. } => "details-replaced",
        }
    }
}

/// Every known session, newest first.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, session_id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == session_id)
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn get_mut(&mut self, session_id: &str) -> Result<&mut Session, SessionError> {
        self.sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
    }

    /// Apply one action. On error the store is left unchanged.
    pub fn apply(&mut self, action: Action) -> Result<(), SessionError> {
        debug!(action = action.name(), "applying action");
        match action {
            Action::SessionCreated(session) => {
                self.sessions.retain(|s| s.id != session.id);
                self.sessions.insert(0, session);
            }
            Action::SessionsLoaded(sessions) => {
                if let Some(orphan) = sessions
                    .iter()
                    .find(|s| s.status != SessionStatus::Drafting && s.document.is_none())
                {
                    return Err(CoreError::MissingDocument(orphan.id.clone()).into());
                }
                self.sessions = sessions;
            }
            Action::SessionRemoved { session_id } => {
                let before = self.sessions.len();
                self.sessions.retain(|s| s.id != session_id);
                if self.sessions.len() == before {
                    return Err(SessionError::UnknownSession(session_id));
                }
            }
            Action::MessageAppended {
                session_id,
                message,
            } => {
                let session = self.get_mut(&session_id)?;
                session.messages.push(message);
                touch(session);
            }
            Action::TitleChanged { session_id, title } => {
                let session = self.get_mut(&session_id)?;
                session.title = title;
                touch(session);
            }
            Action::DraftCompleted {
                session_id,
                document,
            } => {
                let session = self.get_mut(&session_id)?;
                check_transition(session.status, SessionStatus::Reviewing)?;
                session.document = Some(document);
                session.status = SessionStatus::Reviewing;
                touch(session);
            }
            Action::StatusChanged { session_id, status } => {
                let session = self.get_mut(&session_id)?;
                check_transition(session.status, status)?;
                if status == SessionStatus::Reviewing && session.document.is_none() {
                    return Err(CoreError::MissingDocument(session_id).into());
                }
                session.status = status;
                touch(session);
            }
            Action::DocumentContentReplaced {
                session_id,
                content,
            } => {
                let session = self.get_mut(&session_id)?;
                let document = session
                    .document
                    .as_mut()
                    .ok_or(CoreError::MissingDocument(session_id))?;
                document.content = content;
                document.formatted_content = None;
                touch(session);
            }
            Action::DocumentFormatted {
                session_id,
                formatted_content,
            } => {
                let session = self.get_mut(&session_id)?;
                let document = session
                    .document
                    .as_mut()
                    .ok_or(CoreError::MissingDocument(session_id))?;
                document.formatted_content = Some(formatted_content);
                touch(session);
            }
            Action::DetailsReplaced {
                session_id,
                details,
            } => {
                let session = self.get_mut(&session_id)?;
                let document = session
                    .document
                    .as_mut()
                    .ok_or(CoreError::MissingDocument(session_id))?;
                document.verified = details.verified;
                session.details = Some(details);
                touch(session);
            }
        }
        Ok(())
    }
}

fn check_transition(from: SessionStatus, to: SessionStatus) -> Result<(), CoreError> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition { from, to })
    }
}

fn touch(session: &mut Session) {
    session.updated_at = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use legalbot_core::DEFAULT_SESSION_TITLE;

    fn store_with(id: &str) -> SessionStore {
        let mut store = SessionStore::new();
        store
            .apply(Action::SessionCreated(Session::new(id, DEFAULT_SESSION_TITLE)))
            .unwrap();
        store
    }

    fn doc(session: &str) -> Document {
        Document::new("d1".into(), session.into(), "# NDA".into())
    }

    #[test]
    fn newest_session_first() {
        let mut store = store_with("a");
        store
            .apply(Action::SessionCreated(Session::new("b", DEFAULT_SESSION_TITLE)))
            .unwrap();
        let ids: Vec<&str> = store.sessions().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn messages_append_in_order() {
        let mut store = store_with("a");
        for text in ["one", "two", "three"] {
            store
                .apply(Action::MessageAppended {
                    session_id: "a".into(),
                    message: Message::user(text),
                })
                .unwrap();
        }
        let contents: Vec<&str> = store.get("a").unwrap().messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn reviewing_requires_document() {
        let mut store = store_with("a");
        let err = store
            .apply(Action::StatusChanged {
                session_id: "a".into(),
                status: SessionStatus::Reviewing,
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::MissingDocument(_))));
        assert_eq!(store.get("a").unwrap().status, SessionStatus::Drafting);
    }

    #[test]
    fn draft_completed_attaches_and_transitions() {
        let mut store = store_with("a");
        store
            .apply(Action::DraftCompleted {
                session_id: "a".into(),
                document: doc("a"),
            })
            .unwrap();
        let session = store.get("a").unwrap();
        assert_eq!(session.status, SessionStatus::Reviewing);
        assert_eq!(session.document.as_ref().unwrap().content, "# NDA");

        // A second draft completion is not a legal transition.
        let err = store
            .apply(Action::DraftCompleted {
                session_id: "a".into(),
                document: doc("a"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::Core(CoreError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn status_never_moves_backwards() {
        let mut store = store_with("a");
        store
            .apply(Action::DraftCompleted {
                session_id: "a".into(),
                document: doc("a"),
            })
            .unwrap();
        store
            .apply(Action::StatusChanged {
                session_id: "a".into(),
                status: SessionStatus::Completed,
            })
            .unwrap();
        for status in [SessionStatus::Drafting, SessionStatus::Reviewing] {
            assert!(
                store
                    .apply(Action::StatusChanged {
                        session_id: "a".into(),
                        status,
                    })
                    .is_err()
            );
        }
        assert_eq!(store.get("a").unwrap().status, SessionStatus::Completed);
    }

    #[test]
    fn content_replacement_keeps_identity_and_clears_formatting() {
        let mut store = store_with("a");
        store
            .apply(Action::DraftCompleted {
                session_id: "a".into(),
                document: doc("a"),
            })
            .unwrap();
        store
            .apply(Action::DocumentFormatted {
                session_id: "a".into(),
                formatted_content: "1. NDA\n".into(),
            })
            .unwrap();
        store
            .apply(Action::DocumentContentReplaced {
                session_id: "a".into(),
                content: "# NDA v2".into(),
            })
            .unwrap();
        let document = store.get("a").unwrap().document.as_ref().unwrap();
        assert_eq!(document.id, "d1");
        assert_eq!(document.content, "# NDA v2");
        assert!(document.formatted_content.is_none());
    }

    #[test]
    fn details_verified_flag_mirrors_onto_document() {
        let mut store = store_with("a");
        store
            .apply(Action::DraftCompleted {
                session_id: "a".into(),
                document: doc("a"),
            })
            .unwrap();
        let mut details = DocumentDetails::new("d1".into(), Default::default());
        details.verified = true;
        store
            .apply(Action::DetailsReplaced {
                session_id: "a".into(),
                details,
            })
            .unwrap();
        let session = store.get("a").unwrap();
        assert!(session.is_verified());
        assert!(session.document.as_ref().unwrap().verified);
    }

    #[test]
    fn details_require_document() {
        let mut store = store_with("a");
        let err = store
            .apply(Action::DetailsReplaced {
                session_id: "a".into(),
                details: DocumentDetails::default(),
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::MissingDocument(_))));
    }

    #[test]
    fn unknown_session_rejected() {
        let mut store = SessionStore::new();
        let err = store
            .apply(Action::MessageAppended {
                session_id: "missing".into(),
                message: Message::user("hi"),
            })
            .unwrap_err();
        assert!(matches!(err, SessionError::UnknownSession(id) if id == "missing"));
        assert!(
            store
                .apply(Action::SessionRemoved {
                    session_id: "missing".into()
                })
                .is_err()
        );
    }

    #[test]
    fn loaded_sessions_past_drafting_need_a_document() {
        let mut store = store_with("a");
        let mut orphan = Session::new("b", "Lease");
        orphan.status = SessionStatus::Reviewing;
        let err = store
            .apply(Action::SessionsLoaded(vec![
                Session::new("c", DEFAULT_SESSION_TITLE),
                orphan.clone(),
            ]))
            .unwrap_err();
        assert!(matches!(err, SessionError::Core(CoreError::MissingDocument(id)) if id == "b"));
        assert_eq!(store.len(), 1);
        assert!(store.get("a").is_some());

        orphan.document = Some(doc("b"));
        store.apply(Action::SessionsLoaded(vec![orphan])).unwrap();
        assert_eq!(store.get("b").unwrap().status, SessionStatus::Reviewing);
    }
}
