pub mod categorize;
mod error;
pub mod format;
pub mod marker;
pub mod model;
pub mod title;

pub use categorize::{CategorizedDetails, DetailCategory, categorize, classify_field};
pub use error::CoreError;
pub use marker::{CompletionDetector, DRAFT_MARKER, MarkerDetector, parse_draft};
pub use model::{
    DEFAULT_DOCUMENT_TYPE, DEFAULT_SESSION_TITLE, DOCUMENT_TYPE_FIELD, Document, DocumentDetails,
    DownloadFormat, Message, Role, Session, SessionStatus, new_id,
};
pub use title::title_from_message;
