//! Scripted [`AuthApi`] mock shared by unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;

use crate::api::AuthApi;
use crate::api::types::{AuthError, RawResponse, Role};

pub type Reply = Result<RawResponse, AuthError>;

pub fn json_reply(status: u16, body: &Value) -> Reply {
    Ok(RawResponse::new(status, body.to_string()))
}

pub fn transport_error() -> Reply {
    Err(AuthError::Transport("connection refused".into()))
}

/// Replays queued responses in order and records every call.
#[derive(Default)]
pub struct MockApi {
    logins: Mutex<VecDeque<Reply>>,
    polls: Mutex<VecDeque<Reply>>,
    logouts: Mutex<VecDeque<Reply>>,
    profiles: Mutex<VecDeque<Reply>>,
    poll_latency: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_login(&self, reply: Reply) -> &Self {
        self.logins.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_poll(&self, reply: Reply) -> &Self {
        self.polls.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_logout(&self, reply: Reply) -> &Self {
        self.logouts.lock().unwrap().push_back(reply);
        self
    }

    pub fn push_profile(&self, reply: Reply) -> &Self {
        self.profiles.lock().unwrap().push_back(reply);
        self
    }

    pub fn set_poll_latency(&self, latency: Duration) {
        *self.poll_latency.lock().unwrap() = latency;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn pop(queue: &Mutex<VecDeque<Reply>>, what: &str) -> Reply {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AuthError::Transport(format!("no scripted {what} reply"))))
    }
}

#[async_trait::async_trait]
impl AuthApi for MockApi {
    async fn login(&self, role: Role, identifier: &str, _credential: &str) -> Result<RawResponse, AuthError> {
        self.record(format!("login:{role:?}:{identifier}"));
        Self::pop(&self.logins, "login")
    }

    async fn check_delay(&self, delay_token: &str) -> Result<RawResponse, AuthError> {
        self.record(format!("check_delay:{delay_token}"));
        let latency = *self.poll_latency.lock().unwrap();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        Self::pop(&self.polls, "poll")
    }

    async fn logout(&self, _role: Role, token: &str) -> Result<RawResponse, AuthError> {
        self.record(format!("logout:{token}"));
        let reply = self.logouts.lock().unwrap().pop_front();
        reply.unwrap_or_else(|| Ok(RawResponse::new(200, "{}")))
    }

    async fn profile(&self, _role: Role, token: &str) -> Result<RawResponse, AuthError> {
        self.record(format!("profile:{token}"));
        Self::pop(&self.profiles, "profile")
    }
}
