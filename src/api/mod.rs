//! API — transport seam between the login flow and the portal backend.
//!
//! DESIGN
//! ======
//! The flow controller talks to the backend only through [`AuthApi`], so
//! tests can script responses with an in-memory mock and the HTTP client
//! stays a thin wrapper. Every method returns the raw status and body;
//! interpretation lives in [`crate::classify`].

pub mod http;
pub mod types;

use types::{AuthError, RawResponse, Role};

/// Calls exposed by the portal authentication service.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Submit one login attempt. Never retried by callers.
    async fn login(&self, role: Role, identifier: &str, credential: &str) -> Result<RawResponse, AuthError>;

    /// Poll the status of a server-side delayed login.
    async fn check_delay(&self, delay_token: &str) -> Result<RawResponse, AuthError>;

    /// Invalidate the session on the server.
    async fn logout(&self, role: Role, token: &str) -> Result<RawResponse, AuthError>;

    /// Fetch the profile bound to a session token.
    async fn profile(&self, role: Role, token: &str) -> Result<RawResponse, AuthError>;
}
