//! Terminal rendering for sessions, transcripts, and the details card.
//!
//! The details card groups fields the way the verification form does:
//! document type first, then one section per non-empty category.

use std::collections::BTreeMap;

use legalbot_client::api::HealthStatus;
use legalbot_core::{DocumentDetails, Message, Role, Session, categorize};
use legalbot_session::{Extraction, SendOutcome};

const LABEL_WIDTH: usize = 26;

// ── Public API ──

pub fn print_health(health: &HealthStatus) {
    println!("=== Backend ===");
    print_field("Status", &health.status);
    print_field("AI configured", yes_no(health.ai_configured));
    print_field("Modules loaded", yes_no(health.modules_loaded));
    print_field("Debug mode", yes_no(health.debug_mode));
    println!();
    if !health.is_ready() {
        println!("Backend is not ready; drafting requests will fail.");
    }
}

/// One line per session, newest first.
pub fn print_sessions(sessions: &[Session]) {
    if sessions.is_empty() {
        println!("No sessions yet.");
        return;
    }
    for session in sessions {
        println!(
            "{:<38} {:<10} {:<34} {}",
            session.id,
            session.status,
            session.title,
            session.updated_at.format("%Y-%m-%d %H:%M")
        );
    }
}

pub fn print_transcript(session: &Session) {
    println!("=== {} ({}) ===", session.title, session.status);
    for message in &session.messages {
        print_message(message);
    }
}

pub fn print_message(message: &Message) {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "legalbot",
    };
    println!("{who}> {}", message.content);
    println!();
}

/// Summarize the effect of a send on the session.
pub fn print_outcome(outcome: &SendOutcome, session: &Session) {
    match outcome {
        SendOutcome::Reply(message) => print_message(message),
        SendOutcome::DraftCompleted { extraction, .. } => {
            if let Some(message) = session.last_message() {
                print_message(message);
            }
            print_document(session);
            match (extraction, &session.details) {
                (Extraction::Extracted(_), Some(details)) => print_details_card(details),
                (Extraction::Failed, _) => {
                    println!("Could not extract the document details; try /retry-details.")
                }
                _ => {}
            }
        }
        SendOutcome::Refined { .. } => {
            if let Some(message) = session.last_message() {
                print_message(message);
            }
            print_document(session);
        }
    }
}

/// The current document, preferring its formatted rendering.
pub fn print_document(session: &Session) {
    let Some(document) = &session.document else {
        println!("No document yet.");
        return;
    };
    println!("--- {} ---", document.document_type);
    println!("{}", document.preview());
    println!("---");
    println!();
}

/// Print the details as a grouped card with the verification state.
pub fn print_details_card(details: &DocumentDetails) {
    let document_type = details.document_type().unwrap_or("Document");
    println!("=== {document_type} details ===");
    println!();

    let card = categorize(&details.details);
    if card.is_empty() {
        println!("  (no fields extracted)");
        println!();
    }
    for (category, fields) in card.sections() {
        print_section(category.heading(), fields);
    }

    if details.verified {
        println!("Verified. Download with /download docx|pdf NAME.");
    } else {
        println!("Not verified. Check the values, fix them with /set, then /verify.");
    }
}

// ── Section rendering ──

fn print_section(header: &str, fields: &BTreeMap<String, String>) {
    if fields.is_empty() {
        return;
    }
    println!("{header}");
    for (name, value) in fields {
        let value = if value.is_empty() { "-" } else { value };
        println!("  {name:<LABEL_WIDTH$} {value}");
    }
    println!();
}

fn print_field(label: &str, value: &str) {
    println!("  {label:<LABEL_WIDTH$} {value}");
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}
