//! Completion-marker detection for generate replies.
//!
//! The backend signals a finished draft by embedding a literal token in its
//! free-text reply, followed by the document body:
//!
//! ```text
//! Sure, here is your agreement. DRAFT_COMPLETE: # NDA
//! This Non-Disclosure Agreement ...
//! ```
//!
//! The token can collide with prose that merely mentions it, so detection sits
//! behind [`CompletionDetector`] and the controller never matches on the reply
//! text itself.

/// Literal token the backend places before a finished draft.
pub const DRAFT_MARKER: &str = "DRAFT_COMPLETE:";

/// Decides whether a generate reply carries a finished draft.
pub trait CompletionDetector: Send + Sync {
    /// Returns the draft body when `reply` signals completion.
    fn detect<'a>(&self, reply: &'a str) -> Option<&'a str>;
}

/// Substring detector for the backend's literal marker.
///
/// The body is everything after the first occurrence of the marker, with
/// surrounding whitespace trimmed.
#[derive(Debug, Clone)]
pub struct MarkerDetector {
    marker: String,
}

impl Default for MarkerDetector {
    fn default() -> Self {
        Self::new(DRAFT_MARKER)
    }
}

impl MarkerDetector {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker(&self) -> &str {
        &self.marker
    }
}

impl CompletionDetector for MarkerDetector {
    fn detect<'a>(&self, reply: &'a str) -> Option<&'a str> {
        if self.marker.is_empty() {
            return None;
        }
        reply
            .split_once(self.marker.as_str())
            .map(|(_, body)| body.trim())
    }
}

/// Extract the draft body using the default marker.
pub fn parse_draft(reply: &str) -> Option<&str> {
    MarkerDetector::default().detect(reply)
}
