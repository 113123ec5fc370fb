//! Portal login client with risk-tiered responses.
//!
//! SYSTEM CONTEXT
//! ==============
//! The portal backend scores each login attempt and answers with one of five
//! outcomes: granted, granted with a warning, delayed, blocked, or rejected.
//! This crate submits attempts, classifies the responses, runs the delay
//! countdown with its server verification, and keeps the resulting session.
//!
//! ```text
//! LoginFlow ──► submit ──► AuthApi (HttpAuthApi | mock)
//!     │            └──► classify ──► LoginOutcome
//!     ├──► DelayTimer ──► DelayTracker ──► check_delay polls
//!     └──► SessionFinalizer ──► SessionStore (FileStore | MemoryStore)
//! ```

pub mod api;
pub mod classify;
pub mod config;
pub mod delay;
pub mod flow;
pub mod outcome;
pub mod session;
pub mod submit;
pub mod timer;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use api::AuthApi;
pub use api::http::HttpAuthApi;
pub use api::types::{AuthError, Role};
pub use config::ClientConfig;
pub use flow::LoginFlow;
pub use outcome::{LoginAttempt, LoginOutcome, Profile};
pub use session::{FileStore, MemoryStore, Session, SessionStore};
pub use timer::{DelayProgress, TrackerId};
