//! Outcome classification: raw HTTP responses to login outcomes.
//!
//! DESIGN
//! ======
//! Pure functions over `(status, body)`. Nothing here can fail: malformed or
//! unexpected payloads degrade to [`LoginOutcome::Rejected`] with a generic
//! message and a `warn` log, so a parse problem never escapes this boundary.
//!
//! | status | `status` field          | outcome            |
//! |--------|-------------------------|--------------------|
//! | 200    | `success`               | Granted            |
//! | 200    | `success_with_warning`  | GrantedWithWarning |
//! | 429    | any                     | Delayed            |
//! | 403    | `blocked`               | Blocked            |
//! | 403    | other                   | Rejected           |
//! | 401    | any                     | Rejected           |
//! | other  | any                     | Rejected (generic) |

use serde_json::{Map, Value};

use crate::outcome::{LoginOutcome, Profile};

/// Delay applied when a 429 carries no usable `delay_seconds`.
pub const DEFAULT_DELAY_SECS: u32 = 60;

pub const GENERIC_REJECTION: &str = "Login failed. Please check your credentials and try again.";
pub const UNEXPECTED_RESPONSE: &str = "The server sent an unexpected response. Please try again.";
const GENERIC_BLOCK: &str = "This account is blocked. Contact an administrator to restore access.";
const GENERIC_WARNING: &str = "Unusual activity was detected for this account.";
const POLL_REJECTION: &str = "Login failed. Please try again.";

// =============================================================================
// BODY
// =============================================================================

/// Lenient view of the portal's `{status, message, token, data}` envelope.
#[derive(Debug, Default)]
struct Envelope {
    status: Option<String>,
    message: Option<String>,
    token: Option<String>,
    data: Option<Value>,
}

/// Parse a response envelope; `None` when the body is not a JSON object.
fn parse_envelope(body: &str) -> Option<Envelope> {
    let value: Value = serde_json::from_str(body).ok()?;
    let Value::Object(map) = value else {
        return None;
    };
    Some(Envelope {
        status: non_empty_str(&map, "status"),
        message: non_empty_str(&map, "message"),
        token: non_empty_str(&map, "token"),
        data: map.get("data").cloned(),
    })
}

fn non_empty_str(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

/// Server `message` field of a response body, if any.
#[must_use]
pub fn server_message(body: &str) -> Option<String> {
    parse_envelope(body).and_then(|env| env.message)
}

/// Profile carried in the `data` field of a response body.
#[must_use]
pub fn profile_from_body(body: &str) -> Profile {
    parse_envelope(body).map_or_else(Profile::default, |env| Profile::from_value(env.data.as_ref()))
}

// =============================================================================
// LOGIN
// =============================================================================

/// Map a login response onto exactly one [`LoginOutcome`].
#[must_use]
pub fn classify(status: u16, body: &str) -> LoginOutcome {
    let envelope = parse_envelope(body);
    if envelope.is_none() && status != 429 {
        tracing::warn!(status, "login response body is not a JSON object; treating as rejected");
    }
    let envelope = envelope.unwrap_or_default();

    match status {
        200 => classify_granted(envelope),
        429 => classify_delayed(envelope),
        403 if envelope.status.as_deref() == Some("blocked") => LoginOutcome::Blocked {
            reason: envelope.message.unwrap_or_else(|| GENERIC_BLOCK.to_owned()),
        },
        401 | 403 => LoginOutcome::Rejected {
            reason: envelope.message.unwrap_or_else(|| GENERIC_REJECTION.to_owned()),
        },
        _ => {
            tracing::warn!(status, "unexpected login status");
            LoginOutcome::Rejected { reason: format!("Login failed (server returned {status}). Please try again.") }
        }
    }
}

fn classify_granted(envelope: Envelope) -> LoginOutcome {
    let Envelope { status, message, token, data } = envelope;
    let Some(token) = token else {
        tracing::warn!(status = ?status, "200 response without a session token; treating as rejected");
        return unexpected();
    };
    let profile = Profile::from_value(data.as_ref());

    match status.as_deref() {
        Some("success") => LoginOutcome::Granted { token, profile },
        Some("success_with_warning") => LoginOutcome::GrantedWithWarning {
            token,
            profile,
            advisory_message: message.unwrap_or_else(|| GENERIC_WARNING.to_owned()),
        },
        other => {
            tracing::warn!(status = ?other, "200 response with unknown status field; treating as rejected");
            unexpected()
        }
    }
}

fn classify_delayed(envelope: Envelope) -> LoginOutcome {
    let data = envelope.data.as_ref().and_then(Value::as_object);
    let delay_token = data.and_then(|d| d.get("id_delayed")).and_then(delay_token_from);
    let remaining_seconds = data
        .and_then(|d| d.get("delay_seconds"))
        .and_then(Value::as_u64)
        .filter(|secs| *secs > 0)
        .map_or(DEFAULT_DELAY_SECS, |secs| u32::try_from(secs).unwrap_or(u32::MAX));
    LoginOutcome::Delayed { delay_token, remaining_seconds, advisory_message: envelope.message }
}

/// Delay ids arrive as integers from the portal; strings are accepted too.
fn delay_token_from(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn unexpected() -> LoginOutcome {
    LoginOutcome::Rejected { reason: UNEXPECTED_RESPONSE.to_owned() }
}

// =============================================================================
// DELAY POLL
// =============================================================================

/// Interpreted reply to a `check-delay` poll.
#[derive(Debug, Clone, PartialEq)]
pub enum PollReply {
    /// The delay elapsed and the server issued a session.
    Completed { token: String, profile: Profile },
    /// Still waiting; the server's remaining time is authoritative.
    Waiting { remaining_seconds: i64 },
    /// Cancelled, unknown, or malformed.
    Other { message: String },
}

/// Map a `check-delay` response onto a [`PollReply`].
///
/// The portal answers waiting polls with 202 and failures with 403/404, all
/// in the same envelope, so the status code only feeds diagnostics.
#[must_use]
pub fn classify_poll(status: u16, body: &str) -> PollReply {
    let Some(envelope) = parse_envelope(body) else {
        tracing::warn!(status, "delay poll body is not a JSON object");
        return PollReply::Other { message: UNEXPECTED_RESPONSE.to_owned() };
    };
    let data = envelope.data.as_ref().and_then(Value::as_object);

    match (envelope.status.as_deref(), envelope.token) {
        (Some("completed"), Some(token)) => PollReply::Completed {
            token,
            profile: Profile::from_value(envelope.data.as_ref()),
        },
        (Some("waiting"), _) => match data.and_then(|d| d.get("remaining_seconds")).and_then(Value::as_i64) {
            Some(remaining_seconds) => PollReply::Waiting { remaining_seconds },
            None => {
                tracing::warn!(status, "waiting poll reply without remaining_seconds");
                PollReply::Other { message: envelope.message.unwrap_or_else(|| POLL_REJECTION.to_owned()) }
            }
        },
        (other, _) => {
            tracing::debug!(status, poll_status = ?other, "delay poll did not complete");
            PollReply::Other { message: envelope.message.unwrap_or_else(|| POLL_REJECTION.to_owned()) }
        }
    }
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
