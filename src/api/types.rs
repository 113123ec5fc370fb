//! API types: roles, raw responses, and errors shared by every transport.

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by the login client.
///
/// Bad credentials, blocks, and delays are *outcomes*, not errors; see
/// [`crate::outcome::LoginOutcome`]. This type covers failures that leave the
/// client unable to obtain an outcome at all.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The HTTP call could not complete (connection refused, timeout, ...).
    #[error("could not reach the authentication server: {0}")]
    Transport(String),

    /// A required login field was blank.
    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    /// An authenticated operation was requested without a session.
    #[error("not logged in")]
    NotAuthenticated,

    /// The server rejected the stored session token.
    #[error("session is no longer valid; please log in again")]
    SessionExpired,

    /// An authenticated request returned a non-success status.
    #[error("request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    /// The session store could not read or write.
    #[error("session storage failed: {0}")]
    Storage(String),

    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl AuthError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(_) => "E_TRANSPORT",
            Self::EmptyInput { .. } => "E_EMPTY_INPUT",
            Self::NotAuthenticated => "E_NOT_AUTHENTICATED",
            Self::SessionExpired => "E_SESSION_EXPIRED",
            Self::RequestFailed { .. } => "E_REQUEST_FAILED",
            Self::Storage(_) => "E_STORAGE",
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// Which portal an attempt targets, and the role a resulting session holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    /// Wire name of the identifier field in the login body.
    #[must_use]
    pub fn identifier_field(self) -> &'static str {
        match self {
            Self::Student => "nim",
            Self::Admin => "username",
        }
    }

    #[must_use]
    pub fn login_path(self) -> &'static str {
        match self {
            Self::Student => "/auth/login",
            Self::Admin => "/auth-admin/login",
        }
    }

    #[must_use]
    pub fn logout_path(self) -> &'static str {
        match self {
            Self::Student => "/auth/logout",
            Self::Admin => "/auth-admin/logout",
        }
    }

    #[must_use]
    pub fn profile_path(self) -> &'static str {
        match self {
            Self::Student => "/auth/profile",
            Self::Admin => "/auth-admin/profile",
        }
    }
}

// =============================================================================
// RAW RESPONSE
// =============================================================================

/// Status code and unparsed body of an HTTP response.
///
/// Bodies stay as text so classification can degrade gracefully on
/// malformed payloads instead of failing inside the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
