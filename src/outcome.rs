//! Login data model: attempts, profiles, and the risk-tiered outcome.
//!
//! SYSTEM CONTEXT
//! ==============
//! The server scores every login attempt and answers with one of five
//! mutually exclusive outcomes. [`LoginOutcome`] is the only thing the
//! presentation layer needs to render a result; tokens exist only on the
//! granted variants, so a delayed or blocked attempt can never be finalized
//! into a session by mistake.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::types::{AuthError, Role};

// =============================================================================
// LOGIN ATTEMPT
// =============================================================================

/// One user-initiated login submission.
///
/// The credential is kept private and redacted from `Debug` output.
#[derive(Clone)]
pub struct LoginAttempt {
    pub role: Role,
    pub identifier: String,
    credential: String,
}

impl LoginAttempt {
    #[must_use]
    pub fn new(role: Role, identifier: impl Into<String>, credential: impl Into<String>) -> Self {
        Self { role, identifier: identifier.into(), credential: credential.into() }
    }

    #[must_use]
    pub fn credential(&self) -> &str {
        &self.credential
    }

    /// Reject blank identifiers and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptyInput`] naming the blank field.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.identifier.trim().is_empty() {
            return Err(AuthError::EmptyInput { field: self.role.identifier_field() });
        }
        if self.credential.is_empty() {
            return Err(AuthError::EmptyInput { field: "password" });
        }
        Ok(())
    }
}

impl fmt::Debug for LoginAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginAttempt")
            .field("role", &self.role)
            .field("identifier", &self.identifier)
            .field("credential", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// PROFILE
// =============================================================================

/// The `data` object the server attaches to a granted login.
///
/// Kept as an open map: student and admin profiles carry different fields,
/// and risk metadata (`risk_level`, `skor_anomali`) is informational only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    /// Build a profile from an optional JSON value; non-objects yield an empty profile.
    #[must_use]
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::Object(map)) => Self(map.clone()),
            _ => Self::default(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Human-readable name: student name, admin name, then identifiers.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        ["nama", "nama_admin", "username", "nim"]
            .into_iter()
            .find_map(|key| self.get_str(key))
    }

    /// Server-assigned risk tier (`low`, `medium`, ...), if reported.
    #[must_use]
    pub fn risk_level(&self) -> Option<&str> {
        self.get_str("risk_level")
    }

    #[must_use]
    pub fn anomaly_score(&self) -> Option<f64> {
        self.0.get("skor_anomali").and_then(Value::as_f64)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// =============================================================================
// LOGIN OUTCOME
// =============================================================================

/// Result of a login attempt, or of a delay that has run out.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Granted {
        token: String,
        profile: Profile,
    },
    GrantedWithWarning {
        token: String,
        profile: Profile,
        advisory_message: String,
    },
    Delayed {
        /// Absent when the server issued a plain lockout that cannot be polled.
        delay_token: Option<String>,
        remaining_seconds: u32,
        /// Server's explanation of the delay, shown while it runs.
        advisory_message: Option<String>,
    },
    Blocked {
        reason: String,
    },
    Rejected {
        reason: String,
    },
}

impl LoginOutcome {
    /// Short tag for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Granted { .. } => "granted",
            Self::GrantedWithWarning { .. } => "granted_with_warning",
            Self::Delayed { .. } => "delayed",
            Self::Blocked { .. } => "blocked",
            Self::Rejected { .. } => "rejected",
        }
    }

    /// Session token, present only on granted outcomes.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Granted { token, .. } | Self::GrantedWithWarning { token, .. } => Some(token.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_granted(&self) -> bool {
        self.token().is_some()
    }

    /// User-facing message for outcomes that carry one.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::GrantedWithWarning { advisory_message, .. } => Some(advisory_message.as_str()),
            Self::Delayed { advisory_message, .. } => advisory_message.as_deref(),
            Self::Blocked { reason } | Self::Rejected { reason } => Some(reason.as_str()),
            Self::Granted { .. } => None,
        }
    }
}
