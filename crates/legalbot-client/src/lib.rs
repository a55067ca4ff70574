//! Backend contract for LegalBot: wire types, the [`Backend`] trait, and an
//! HTTP implementation behind the `http` feature.

pub mod api;
mod backend;
mod error;

#[cfg(feature = "http")]
pub mod http;

pub use backend::Backend;
pub use error::BackendError;

#[cfg(feature = "http")]
pub use http::{BackendClient, DEFAULT_BASE_URL};
