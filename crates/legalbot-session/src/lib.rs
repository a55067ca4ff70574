//! Session state and the drafting lifecycle for LegalBot.
//!
//! [`SessionController`] owns a [`SessionStore`] and drives every session
//! through `drafting → reviewing → completed` against a
//! [`Backend`](legalbot_client::Backend).

mod config;
pub mod controller;
mod error;
pub mod gate;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{ControllerConfig, EditPolicy, InFlightPolicy};
pub use controller::{Extraction, SendOutcome, SessionController};
pub use error::SessionError;
pub use store::{Action, SessionStore};
