//! Attempt submission, one network call per user action.
//!
//! Credential submissions are never retried here or anywhere else: a
//! repeated attempt feeds the server's lockout counters, so a transport
//! failure is handed straight back to the caller.

use crate::api::AuthApi;
use crate::api::types::{AuthError, RawResponse};
use crate::outcome::LoginAttempt;

/// Send `attempt` to the login endpoint of its role.
///
/// # Errors
///
/// Returns [`AuthError::EmptyInput`] before any network call when a field is
/// blank, and [`AuthError::Transport`] when the call cannot complete.
pub async fn submit(api: &dyn AuthApi, attempt: &LoginAttempt) -> Result<RawResponse, AuthError> {
    attempt.validate()?;
    tracing::debug!(role = ?attempt.role, "submitting login attempt");

    let raw = api
        .login(attempt.role, attempt.identifier.trim(), attempt.credential())
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "login submission failed"))?;

    tracing::debug!(status = raw.status, "login response received");
    Ok(raw)
}

#[cfg(test)]
#[path = "submit_test.rs"]
mod tests;
