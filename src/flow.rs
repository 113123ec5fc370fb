//! Login flow controller.
//!
//! SYSTEM CONTEXT
//! ==============
//! The one owner of mutable login state: the current session (through the
//! [`SessionFinalizer`]), a granted-with-warning outcome awaiting the user's
//! decision, and the active delay timer. Collaborators (API client, session
//! store) are injected; every method takes `&mut self`, so two attempts can
//! never run at once.
//!
//! ```text
//! login ─► submit ─► classify ─┬─ Granted ──────────────► finalize
//!                              ├─ GrantedWithWarning ───► pending ─► accept_warning ─► finalize
//!                              ├─ Delayed ──────────────► DelayTimer ─► next_delay_event
//!                              └─ Blocked / Rejected
//! ```
//!
//! Starting a new attempt cancels the previous timer first. Events still
//! queued from it fail the identity check in [`next_delay_event`] and are
//! dropped.
//!
//! Delays exist only on the student portal: `check-delay` always issues a
//! student token, so a delay that completes is finalized as
//! [`Role::Student`] whatever role the attempt targeted.
//!
//! [`next_delay_event`]: LoginFlow::next_delay_event

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::api::AuthApi;
use crate::api::types::{AuthError, Role};
use crate::classify::{classify, profile_from_body, server_message};
use crate::config::DEFAULT_TICK_MILLIS;
use crate::delay::DelayTracker;
use crate::outcome::{LoginAttempt, LoginOutcome, Profile};
use crate::session::{Session, SessionFinalizer, SessionStore};
use crate::submit::submit;
use crate::timer::{DelayEvent, DelayProgress, DelayTimer, StaleResponse, TrackerId};

/// A warned login the user has not yet accepted.
#[derive(Debug, Clone)]
struct PendingGrant {
    token: String,
    profile: Profile,
    role: Role,
}

/// Reason given when the delay task ends without resolving.
pub const DELAY_INTERRUPTED: &str = "The login delay stopped unexpectedly. Please log in again.";

pub struct LoginFlow {
    api: Arc<dyn AuthApi>,
    finalizer: SessionFinalizer,
    tick: Duration,
    attempts: u64,
    active: Option<DelayTimer>,
    pending: Option<PendingGrant>,
    events_tx: mpsc::UnboundedSender<DelayEvent>,
    events_rx: mpsc::UnboundedReceiver<DelayEvent>,
}

impl LoginFlow {
    #[must_use]
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn SessionStore>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            api,
            finalizer: SessionFinalizer::new(store),
            tick: Duration::from_millis(DEFAULT_TICK_MILLIS),
            attempts: 0,
            active: None,
            pending: None,
            events_tx,
            events_rx,
        }
    }

    /// Override the countdown period (one "second" of the delay).
    #[must_use]
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    // =========================================================================
    // SESSION
    // =========================================================================

    /// Load a persisted session, e.g. on startup.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub fn restore(&mut self) -> Result<Option<&Session>, AuthError> {
        self.finalizer.restore()
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.finalizer.current()
    }

    // =========================================================================
    // LOGIN
    // =========================================================================

    /// Run one login attempt and act on its outcome.
    ///
    /// Input is validated before anything else, so a blank field leaves an
    /// active delay running. Otherwise any active delay is cancelled first.
    /// Granted outcomes are finalized
    /// immediately; warned outcomes wait for [`Self::accept_warning`];
    /// delayed outcomes start a timer whose progress is read with
    /// [`Self::next_delay_event`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::EmptyInput`] or [`AuthError::Transport`] from the
    /// submission, or a storage error while finalizing.
    pub async fn login(&mut self, attempt: LoginAttempt) -> Result<LoginOutcome, AuthError> {
        attempt.validate()?;
        self.cancel_delay();
        self.pending = None;
        self.attempts += 1;

        let raw = submit(self.api.as_ref(), &attempt).await?;
        let outcome = classify(raw.status, &raw.body);
        tracing::info!(attempt = self.attempts, status = raw.status, outcome = outcome.kind(), "login attempt classified");

        match &outcome {
            LoginOutcome::Granted { token, profile } => {
                self.finalizer.finalize(token, profile.clone(), attempt.role)?;
            }
            LoginOutcome::GrantedWithWarning { token, profile, .. } => {
                self.pending = Some(PendingGrant { token: token.clone(), profile: profile.clone(), role: attempt.role });
            }
            LoginOutcome::Delayed { delay_token, remaining_seconds, .. } => {
                if attempt.role == Role::Admin {
                    tracing::warn!("admin login answered with a delay; it will resolve to a student session");
                }
                self.start_delay(delay_token.clone(), *remaining_seconds);
            }
            LoginOutcome::Blocked { .. } | LoginOutcome::Rejected { .. } => {}
        }
        Ok(outcome)
    }

    /// Whether a warned login is waiting for the user's decision.
    #[must_use]
    pub fn has_pending_warning(&self) -> bool {
        self.pending.is_some()
    }

    /// Proceed with a login that was granted with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] if no warned login is pending,
    /// or a storage error while finalizing.
    pub fn accept_warning(&mut self) -> Result<Session, AuthError> {
        let pending = self.pending.take().ok_or(AuthError::NotAuthenticated)?;
        self.finalizer.finalize(&pending.token, pending.profile, pending.role)
    }

    /// Discard a warned login without creating a session.
    pub fn decline_warning(&mut self) {
        if self.pending.take().is_some() {
            tracing::info!("warned login declined");
        }
    }

    // =========================================================================
    // DELAY
    // =========================================================================

    /// Resume waiting on a known student login delay.
    ///
    /// Cancels any active delay. Requires a tokio runtime.
    pub fn resume_delay(&mut self, delay_token: impl Into<String>, remaining_seconds: u32) -> TrackerId {
        self.cancel_delay();
        self.pending = None;
        self.attempts += 1;
        self.start_delay(Some(delay_token.into()), remaining_seconds)
    }

    fn start_delay(&mut self, delay_token: Option<String>, remaining_seconds: u32) -> TrackerId {
        let id = TrackerId { attempt: self.attempts, delay_token: delay_token.clone() };
        let tracker = DelayTracker::start(delay_token, remaining_seconds);
        let timer = DelayTimer::spawn(id.clone(), tracker, Arc::clone(&self.api), self.tick, self.events_tx.clone());
        self.active = Some(timer);
        id
    }

    /// Identity of the active delay, if one is running.
    #[must_use]
    pub fn active_delay(&self) -> Option<&TrackerId> {
        self.active.as_ref().map(DelayTimer::id)
    }

    /// Cancel the active delay. No further ticks or polls are issued for it.
    pub fn cancel_delay(&mut self) {
        if let Some(timer) = self.active.take() {
            timer.cancel();
        }
    }

    /// Wait for the next progress event of the active delay.
    ///
    /// Returns `Ok(None)` when no delay is active. A `Resolved(Granted)`
    /// event finalizes the session before it is returned; any resolution
    /// ends the delay. If the delay task stops without resolving, the delay
    /// resolves to `Rejected` with [`DELAY_INTERRUPTED`].
    ///
    /// # Errors
    ///
    /// Returns a storage error if finalizing a granted delay fails.
    pub async fn next_delay_event(&mut self) -> Result<Option<DelayProgress>, AuthError> {
        loop {
            let Some(current) = self.active_delay().cloned() else {
                return Ok(None);
            };
            let Some(timer) = self.active.as_mut() else {
                return Ok(None);
            };
            let received = tokio::select! {
                biased;
                event = self.events_rx.recv() => event,
                () = timer.stopped() => self.events_rx.try_recv().ok(),
            };
            let Some(event) = received else {
                tracing::warn!(attempt = current.attempt, "delay task stopped without resolving");
                let outcome = LoginOutcome::Rejected { reason: DELAY_INTERRUPTED.to_owned() };
                self.finish_delay(&outcome)?;
                return Ok(Some(DelayProgress::Resolved(outcome)));
            };
            match accept_event(&current, event) {
                Ok(progress) => {
                    if let DelayProgress::Resolved(outcome) = &progress {
                        self.finish_delay(outcome)?;
                    }
                    return Ok(Some(progress));
                }
                Err(stale) => tracing::debug!(reason = %stale, "discarding delay event"),
            }
        }
    }

    fn finish_delay(&mut self, outcome: &LoginOutcome) -> Result<(), AuthError> {
        let Some(timer) = self.active.take() else {
            return Ok(());
        };
        timer.cancel();
        if let LoginOutcome::Granted { token, profile } = outcome {
            self.finalizer.finalize(token, profile.clone(), Role::Student)?;
        }
        Ok(())
    }

    // =========================================================================
    // AUTHENTICATED CALLS
    // =========================================================================

    /// Fetch the profile of the current session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::NotAuthenticated`] without a session,
    /// [`AuthError::SessionExpired`] (after clearing the session) when the
    /// server answers 401, and [`AuthError::RequestFailed`] for other
    /// non-success statuses.
    pub async fn fetch_profile(&mut self) -> Result<Profile, AuthError> {
        let session = self.finalizer.current().cloned().ok_or(AuthError::NotAuthenticated)?;
        let raw = self.api.profile(session.role, &session.token).await?;

        match raw.status {
            401 => {
                tracing::warn!("session token rejected; clearing session");
                self.finalizer.clear()?;
                Err(AuthError::SessionExpired)
            }
            _ if raw.is_success() => Ok(profile_from_body(&raw.body)),
            status => Err(AuthError::RequestFailed {
                status,
                message: server_message(&raw.body).unwrap_or_else(|| "profile request failed".to_owned()),
            }),
        }
    }

    /// End the session. The server call is best effort; the local session is
    /// cleared whatever it returns.
    ///
    /// # Errors
    ///
    /// Returns an error only if the session store cannot be cleared.
    pub async fn logout(&mut self) -> Result<(), AuthError> {
        self.cancel_delay();
        self.pending = None;
        let Some(session) = self.finalizer.current().cloned() else {
            return self.finalizer.clear();
        };

        match self.api.logout(session.role, &session.token).await {
            Ok(raw) if raw.is_success() => tracing::info!("logged out"),
            Ok(raw) => tracing::warn!(status = raw.status, "server refused logout; clearing local session anyway"),
            Err(e) => tracing::warn!(error = %e, "logout request failed; clearing local session anyway"),
        }
        self.finalizer.clear()
    }
}

/// Pass `event` through only if it came from the `current` tracker.
fn accept_event(current: &TrackerId, event: DelayEvent) -> Result<DelayProgress, StaleResponse> {
    if event.tracker == *current {
        Ok(event.progress)
    } else {
        Err(StaleResponse(event.tracker))
    }
}

#[cfg(test)]
#[path = "flow_test.rs"]
mod tests;
