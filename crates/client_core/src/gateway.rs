use std::{fmt, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{ChatMessage, OnlineUser, UserProfile},
    error::ApiErrorBody,
    protocol::{
        AuthResponse, HeartbeatAck, HeartbeatRequest, LoginRequest, RegisterRequest,
        SendMessageRequest, SendMessageResponse, UpdateProfileRequest,
    },
};
use tracing::debug;
use url::Url;

use crate::{
    error::{FetchError, FetchResult},
    session::Session,
};

const MAX_ERROR_DETAIL_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Register,
    Login,
    CurrentUser,
    ListMessages,
    SendMessage,
    OnlineUsers,
    Heartbeat,
    GetProfile,
    UpdateProfile,
}

impl Endpoint {
    pub fn method(self) -> Method {
        match self {
            Endpoint::Register
            | Endpoint::Login
            | Endpoint::SendMessage
            | Endpoint::Heartbeat => Method::POST,
            Endpoint::CurrentUser
            | Endpoint::ListMessages
            | Endpoint::OnlineUsers
            | Endpoint::GetProfile => Method::GET,
            Endpoint::UpdateProfile => Method::PUT,
        }
    }

    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Register => "/api/auth/register",
            Endpoint::Login => "/api/auth/login",
            Endpoint::CurrentUser => "/api/auth/me",
            Endpoint::ListMessages | Endpoint::SendMessage => "/api/messages",
            Endpoint::OnlineUsers => "/api/users/online",
            Endpoint::Heartbeat => "/api/users/heartbeat",
            Endpoint::GetProfile | Endpoint::UpdateProfile => "/api/profile",
        }
    }

    pub fn requires_auth(self) -> bool {
        !matches!(self, Endpoint::Register | Endpoint::Login)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method(), self.path())
    }
}

#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn list_messages(&self) -> FetchResult<Vec<ChatMessage>>;
    async fn send_message(&self, text: &str) -> FetchResult<SendMessageResponse>;
    async fn online_users(&self) -> FetchResult<Vec<OnlineUser>>;
    async fn heartbeat(&self) -> FetchResult<HeartbeatAck>;
}

#[async_trait]
pub trait AccountApi: Send + Sync {
    async fn register(&self, request: &RegisterRequest) -> FetchResult<AuthResponse>;
    async fn login(&self, request: &LoginRequest) -> FetchResult<AuthResponse>;
    async fn current_user(&self) -> FetchResult<UserProfile>;
    async fn get_profile(&self) -> FetchResult<UserProfile>;
    async fn update_profile(&self, request: &UpdateProfileRequest) -> FetchResult<UserProfile>;
}

pub struct HttpGateway {
    http: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl HttpGateway {
    pub fn new(server_url: &str, session: Arc<Session>, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(server_url.trim())
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            anyhow::bail!("server url must start with http:// or https://, got '{server_url}'");
        }
        // Endpoints join under the configured prefix, so it needs a trailing slash.
        if !base_url.path().ends_with('/') {
            let prefixed = format!("{}/", base_url.path());
            base_url.set_path(&prefixed);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: Endpoint) -> Result<Url, url::ParseError> {
        self.base_url.join(endpoint.path().trim_start_matches('/'))
    }

    async fn call<B, T>(&self, endpoint: Endpoint, body: Option<&B>) -> FetchResult<T>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let url = self
            .endpoint_url(endpoint)
            .map_err(|err| FetchError::transient(endpoint, format!("invalid url: {err}")))?;
        let mut request = self.http.request(endpoint.method(), url);

        if endpoint.requires_auth() {
            let Some(token) = self.session.token().await else {
                debug!(endpoint = %endpoint, "gateway: no session token, call not issued");
                return Err(FetchError::AuthFailure {
                    endpoint,
                    detail: None,
                });
            };
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|err| FetchError::transient(endpoint, format!("request failed: {err}")))?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let detail = response.text().await.ok().and_then(|b| describe_error_body(&b));
            return Err(FetchError::AuthFailure { endpoint, detail });
        }
        if !status.is_success() {
            let reason = response
                .text()
                .await
                .ok()
                .and_then(|b| describe_error_body(&b))
                .unwrap_or_else(|| format!("server returned {status}"));
            return Err(FetchError::Transient {
                endpoint,
                status: Some(status.as_u16()),
                reason,
            });
        }

        response.json::<T>().await.map_err(|err| FetchError::Transient {
            endpoint,
            status: Some(status.as_u16()),
            reason: format!("malformed response: {err}"),
        })
    }
}

#[async_trait]
impl ChatApi for HttpGateway {
    async fn list_messages(&self) -> FetchResult<Vec<ChatMessage>> {
        self.call::<(), _>(Endpoint::ListMessages, None).await
    }

    async fn send_message(&self, text: &str) -> FetchResult<SendMessageResponse> {
        let body = SendMessageRequest {
            text: text.to_string(),
        };
        self.call(Endpoint::SendMessage, Some(&body)).await
    }

    async fn online_users(&self) -> FetchResult<Vec<OnlineUser>> {
        self.call::<(), _>(Endpoint::OnlineUsers, None).await
    }

    async fn heartbeat(&self) -> FetchResult<HeartbeatAck> {
        self.call(Endpoint::Heartbeat, Some(&HeartbeatRequest::default()))
            .await
    }
}

#[async_trait]
impl AccountApi for HttpGateway {
    async fn register(&self, request: &RegisterRequest) -> FetchResult<AuthResponse> {
        self.call(Endpoint::Register, Some(request)).await
    }

    async fn login(&self, request: &LoginRequest) -> FetchResult<AuthResponse> {
        self.call(Endpoint::Login, Some(request)).await
    }

    async fn current_user(&self) -> FetchResult<UserProfile> {
        self.call::<(), _>(Endpoint::CurrentUser, None).await
    }

    async fn get_profile(&self) -> FetchResult<UserProfile> {
        self.call::<(), _>(Endpoint::GetProfile, None).await
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> FetchResult<UserProfile> {
        self.call(Endpoint::UpdateProfile, Some(request)).await
    }
}

/// Turns an error body into one line for the user. Understands
/// `{"error": ..}`, `{"detail": ..}` and per-field lists such as
/// `{"username": ["Username already exists"]}`.
fn describe_error_body(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    if let Ok(parsed) = serde_json::from_str::<ApiErrorBody>(body) {
        return Some(parsed.error);
    }
    let described = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(fields)) => {
            if let Some(serde_json::Value::String(detail)) = fields.get("detail") {
                detail.clone()
            } else {
                fields
                    .iter()
                    .map(|(field, value)| format!("{field}: {}", flatten_json_text(value)))
                    .collect::<Vec<_>>()
                    .join("; ")
            }
        }
        Ok(other) => flatten_json_text(&other),
        Err(_) => body.to_string(),
    };
    Some(described.chars().take(MAX_ERROR_DETAIL_CHARS).collect())
}

fn flatten_json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_json_text)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
