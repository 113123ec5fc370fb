//! Delay tracker: countdown/verify state machine for delayed logins.
//!
//! DESIGN
//! ======
//! A delayed login counts down locally and then asks the server whether the
//! delay actually elapsed. The local countdown is advisory only: a `waiting`
//! poll reply resets it to the server's remaining time, which absorbs clock
//! drift and suspended timers.
//!
//! ```text
//! Counting(n) --tick--> Counting(n-1)            (n-1 > 0)
//! Counting(n) --tick--> Verifying                (n-1 == 0, token present)
//! Counting(n) --tick--> Resolved(Rejected)       (n-1 == 0, no token)
//! Verifying   --poll--> Counting(server) | Resolved(Granted | Rejected)
//! ```
//!
//! This type performs no I/O. [`crate::timer::DelayTimer`] drives it on a
//! clock and performs the polls it asks for.

use crate::api::types::AuthError;
use crate::classify::PollReply;
use crate::outcome::LoginOutcome;

/// Delay ended but the server gave no id to confirm it; the user must log in again.
pub const DELAY_OVER_RETRY: &str = "The waiting period is over. Please log in again to continue.";
/// A status poll could not reach the server.
pub const POLL_FAILED: &str = "Could not verify the login status. Please try again.";

// =============================================================================
// STATE
// =============================================================================

/// Server-side delay being waited out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelaySession {
    delay_token: Option<String>,
    remaining_seconds: u32,
}

impl DelaySession {
    #[must_use]
    pub fn new(delay_token: Option<String>, remaining_seconds: u32) -> Self {
        Self { delay_token, remaining_seconds }
    }

    #[must_use]
    pub fn delay_token(&self) -> Option<&str> {
        self.delay_token.as_deref()
    }

    #[must_use]
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining_seconds
    }

    /// Whether the server can be asked about this delay.
    #[must_use]
    pub fn pollable(&self) -> bool {
        self.delay_token.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DelayState {
    Counting(u32),
    Verifying,
    Resolved(LoginOutcome),
}

/// What the driver must do after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    /// Keep counting; carries the seconds left.
    Counting(u32),
    /// Issue exactly one status poll for this delay token.
    Poll(String),
    /// The tracker reached a terminal outcome.
    Resolved,
    /// Nothing to do (poll outstanding, or already resolved).
    Idle,
}

// =============================================================================
// TRACKER
// =============================================================================

#[derive(Debug, Clone)]
pub struct DelayTracker {
    session: DelaySession,
    state: DelayState,
}

impl DelayTracker {
    /// Start counting down from a delayed outcome.
    #[must_use]
    pub fn start(delay_token: Option<String>, remaining_seconds: u32) -> Self {
        Self {
            session: DelaySession::new(delay_token, remaining_seconds),
            state: DelayState::Counting(remaining_seconds),
        }
    }

    #[must_use]
    pub fn session(&self) -> &DelaySession {
        &self.session
    }

    #[must_use]
    pub fn state(&self) -> &DelayState {
        &self.state
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&LoginOutcome> {
        match &self.state {
            DelayState::Resolved(outcome) => Some(outcome),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self.state, DelayState::Resolved(_))
    }

    /// Advance the countdown by one period.
    pub fn tick(&mut self) -> TickAction {
        let DelayState::Counting(remaining) = self.state else {
            return TickAction::Idle;
        };
        let remaining = remaining.saturating_sub(1);
        if remaining > 0 {
            self.session.remaining_seconds = remaining;
            self.state = DelayState::Counting(remaining);
            return TickAction::Counting(remaining);
        }
        self.enter_verifying()
    }

    /// Stop counting and confirm with the server (or give up without a token).
    ///
    /// Also used directly when a delay starts with no time left.
    pub fn enter_verifying(&mut self) -> TickAction {
        if self.is_resolved() || self.state == DelayState::Verifying {
            return TickAction::Idle;
        }
        self.session.remaining_seconds = 0;
        match self.session.delay_token.clone() {
            Some(token) => {
                self.state = DelayState::Verifying;
                TickAction::Poll(token)
            }
            None => {
                self.state = DelayState::Resolved(LoginOutcome::Rejected { reason: DELAY_OVER_RETRY.to_owned() });
                TickAction::Resolved
            }
        }
    }

    /// Apply a poll reply. Ignored unless a poll is outstanding.
    pub fn apply_poll(&mut self, reply: PollReply) -> &DelayState {
        if self.state != DelayState::Verifying {
            tracing::debug!(state = ?self.state, "ignoring poll reply outside verification");
            return &self.state;
        }
        self.state = match reply {
            PollReply::Completed { token, profile } => DelayState::Resolved(LoginOutcome::Granted { token, profile }),
            PollReply::Waiting { remaining_seconds } => {
                // Never re-poll before the next tick boundary.
                let remaining = u32::try_from(remaining_seconds.max(1)).unwrap_or(u32::MAX);
                self.session.remaining_seconds = remaining;
                DelayState::Counting(remaining)
            }
            PollReply::Other { message } => DelayState::Resolved(LoginOutcome::Rejected { reason: message }),
        };
        &self.state
    }

    /// Resolve after a poll that could not complete. Not retried.
    pub fn apply_poll_failure(&mut self, error: &AuthError) -> &DelayState {
        if self.state != DelayState::Verifying {
            return &self.state;
        }
        tracing::warn!(error = %error, "delay status poll failed");
        self.state = DelayState::Resolved(LoginOutcome::Rejected { reason: POLL_FAILED.to_owned() });
        &self.state
    }
}

/// Render seconds as `m:ss` for countdown displays.
#[must_use]
pub fn format_countdown(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
#[path = "delay_test.rs"]
mod tests;
