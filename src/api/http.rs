//! Portal HTTP client.
//!
//! Thin `reqwest` wrapper for the `/auth` and `/auth-admin` endpoints. Any
//! status code is returned to the caller as a [`RawResponse`]; only failures
//! to complete the exchange become [`AuthError::Transport`].

use std::time::Duration;

use serde_json::{Map, Value};

use super::AuthApi;
use super::types::{AuthError, RawResponse, Role};
use crate::config::{ClientConfig, Timeouts};

const CHECK_DELAY_PATH: &str = "/auth/login/check-delay";

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client for `base_url` (e.g. `http://127.0.0.1:5000/api`).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| AuthError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Ok(Self { http, base_url })
    }

    /// Build a client from typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &ClientConfig) -> Result<Self, AuthError> {
        Self::new(config.base_url.clone(), config.timeouts)
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn check_delay_url(&self, delay_token: &str) -> Result<reqwest::Url, AuthError> {
        let mut url = reqwest::Url::parse(&self.url(CHECK_DELAY_PATH))
            .map_err(|e| AuthError::ConfigParse(format!("invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| AuthError::ConfigParse(format!("base URL {} cannot carry a path", self.base_url)))?
            .push(delay_token);
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<RawResponse, AuthError> {
        let response = request
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, role: Role, identifier: &str, credential: &str) -> Result<RawResponse, AuthError> {
        let body = login_body(role, identifier, credential);
        let request = self.http.post(self.url(role.login_path())).json(&body);
        self.send(request).await
    }

    async fn check_delay(&self, delay_token: &str) -> Result<RawResponse, AuthError> {
        let url = self.check_delay_url(delay_token)?;
        self.send(self.http.get(url)).await
    }

    async fn logout(&self, role: Role, token: &str) -> Result<RawResponse, AuthError> {
        let request = self.http.post(self.url(role.logout_path())).bearer_auth(token);
        self.send(request).await
    }

    async fn profile(&self, role: Role, token: &str) -> Result<RawResponse, AuthError> {
        let request = self.http.get(self.url(role.profile_path())).bearer_auth(token);
        self.send(request).await
    }
}

// =============================================================================
// WIRE
// =============================================================================

fn login_body(role: Role, identifier: &str, credential: &str) -> Value {
    let mut body = Map::new();
    body.insert(role.identifier_field().to_owned(), Value::String(identifier.to_owned()));
    body.insert("password".to_owned(), Value::String(credential.to_owned()));
    Value::Object(body)
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
