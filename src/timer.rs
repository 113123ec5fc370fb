//! Delay timer: owned handle for the task that drives a [`DelayTracker`].
//!
//! ARCHITECTURE
//! ============
//! Each delayed login gets one spawned task that owns its tracker outright,
//! ticks it on a fixed period, and performs the status polls it asks for.
//! The task never touches controller state: it publishes [`DelayEvent`]s
//! tagged with a [`TrackerId`] over an mpsc channel, and the controller
//! decides whether the event still belongs to the current attempt.
//!
//! LIFECYCLE
//! =========
//! The task exits on its own once the tracker resolves or the event
//! receiver is gone. [`DelayTimer::cancel`] (or dropping the handle) aborts
//! it, so no ticks or polls run after cancellation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::api::AuthApi;
use crate::classify::classify_poll;
use crate::delay::{DelayState, DelayTracker, TickAction};
use crate::outcome::LoginOutcome;

// =============================================================================
// EVENTS
// =============================================================================

/// Identity of one tracker instance: the attempt that started it plus the
/// delay token it polls. The same server token can be reissued to a later
/// attempt, so the attempt number is part of the identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerId {
    pub attempt: u64,
    pub delay_token: Option<String>,
}

/// Progress visible to the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum DelayProgress {
    Counting(u32),
    Verifying,
    Resolved(LoginOutcome),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DelayEvent {
    pub tracker: TrackerId,
    pub progress: DelayProgress,
}

/// An event from a tracker that has since been superseded or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("stale delay event from attempt {} (delay token {:?})", .0.attempt, .0.delay_token)]
pub struct StaleResponse(pub TrackerId);

// =============================================================================
// HANDLE
// =============================================================================

pub struct DelayTimer {
    id: TrackerId,
    task: JoinHandle<()>,
    joined: bool,
}

impl DelayTimer {
    /// Spawn the driver task for `tracker`. Requires a tokio runtime.
    pub fn spawn(
        id: TrackerId,
        tracker: DelayTracker,
        api: Arc<dyn AuthApi>,
        period: Duration,
        events: mpsc::UnboundedSender<DelayEvent>,
    ) -> Self {
        tracing::debug!(attempt = id.attempt, pollable = tracker.session().pollable(), "starting delay timer");
        let task = tokio::spawn(drive(id.clone(), tracker, api, period, events));
        Self { id, task, joined: false }
    }

    #[must_use]
    pub fn id(&self) -> &TrackerId {
        &self.id
    }

    /// Stop ticking. Idempotent.
    pub fn cancel(&self) {
        if !self.task.is_finished() {
            tracing::debug!(attempt = self.id.attempt, "cancelling delay timer");
        }
        self.task.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.joined || self.task.is_finished()
    }

    /// Resolves once the driver task has exited, whether it resolved, was
    /// aborted, or panicked. Cancel safe.
    pub async fn stopped(&mut self) {
        if self.joined {
            return;
        }
        if let Err(e) = (&mut self.task).await {
            if e.is_panic() {
                tracing::error!(attempt = self.id.attempt, "delay task panicked");
            }
        }
        self.joined = true;
    }
}

impl Drop for DelayTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// =============================================================================
// DRIVER
// =============================================================================

struct Emitter {
    id: TrackerId,
    events: mpsc::UnboundedSender<DelayEvent>,
}

impl Emitter {
    /// Returns `false` once nobody is listening.
    fn emit(&self, progress: DelayProgress) -> bool {
        self.events
            .send(DelayEvent { tracker: self.id.clone(), progress })
            .is_ok()
    }
}

async fn drive(
    id: TrackerId,
    mut tracker: DelayTracker,
    api: Arc<dyn AuthApi>,
    period: Duration,
    events: mpsc::UnboundedSender<DelayEvent>,
) {
    let emitter = Emitter { id, events };
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let initial = match tracker.state() {
        DelayState::Counting(remaining) => Some(*remaining),
        _ => None,
    };
    let mut action = match initial {
        Some(0) => tracker.enter_verifying(),
        Some(remaining) => TickAction::Counting(remaining),
        None => TickAction::Idle,
    };

    loop {
        match action {
            TickAction::Counting(remaining) => {
                if !emitter.emit(DelayProgress::Counting(remaining)) {
                    return;
                }
            }
            TickAction::Poll(token) => {
                if !emitter.emit(DelayProgress::Verifying) {
                    return;
                }
                let state = match api.check_delay(&token).await {
                    Ok(raw) => tracker.apply_poll(classify_poll(raw.status, &raw.body)),
                    Err(err) => tracker.apply_poll_failure(&err),
                };
                match state {
                    DelayState::Counting(remaining) => {
                        let remaining = *remaining;
                        tracing::debug!(attempt = emitter.id.attempt, remaining, "server still waiting; resyncing countdown");
                        if !emitter.emit(DelayProgress::Counting(remaining)) {
                            return;
                        }
                        ticker.reset();
                    }
                    DelayState::Resolved(outcome) => {
                        finish(&emitter, outcome.clone());
                        return;
                    }
                    DelayState::Verifying => return,
                }
            }
            TickAction::Resolved => {
                if let Some(outcome) = tracker.outcome() {
                    finish(&emitter, outcome.clone());
                }
                return;
            }
            TickAction::Idle => {
                if tracker.is_resolved() {
                    return;
                }
            }
        }

        ticker.tick().await;
        action = tracker.tick();
    }
}

fn finish(emitter: &Emitter, outcome: LoginOutcome) {
    tracing::info!(attempt = emitter.id.attempt, outcome = outcome.kind(), "delayed login resolved");
    emitter.emit(DelayProgress::Resolved(outcome));
}

#[cfg(test)]
#[path = "timer_test.rs"]
mod tests;
