//! pdfgate API Library
//!
//! HTTP handlers, application state, error mapping, and application setup. The binary in
//! `main.rs` only loads configuration and calls into [`setup`].

pub mod constants;
pub mod error;
mod handlers;
pub mod setup;
pub mod state;

pub use error::HttpAppError;
pub use state::AppState;
