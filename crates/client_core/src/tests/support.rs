//! In-memory fakes shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::{
    domain::{ChatMessage, MessageId, OnlineUser, UserId, UserProfile},
    protocol::{
        AuthResponse, HeartbeatAck, LoginRequest, RegisterRequest, SendMessageResponse,
        UpdateProfileRequest,
    },
};
use tokio::time::Instant;

use crate::{
    error::{FetchError, FetchResult},
    gateway::{AccountApi, ChatApi, Endpoint},
    routes::{Navigator, Route},
    session::{Session, SessionGuard},
    token_store::MemoryTokenStore,
};

#[derive(Default)]
pub(crate) struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub(crate) fn routes(&self) -> Vec<Route> {
        self.routes.lock().expect("routes lock").clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().expect("routes lock").push(route);
    }
}

pub(crate) fn guard_with_token(
    token: Option<&str>,
) -> (Arc<SessionGuard>, Arc<RecordingNavigator>) {
    let store = match token {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::default(),
    };
    let session = Arc::new(Session::restore(Arc::new(store)));
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = Arc::new(SessionGuard::new(session, navigator.clone()));
    (guard, navigator)
}

pub(crate) fn message(id: i64, author: &str, text: &str) -> ChatMessage {
    ChatMessage {
        id: MessageId(id),
        author_name: author.to_string(),
        author: None,
        text: text.to_string(),
        created_at: Utc
            .timestamp_opt(1_700_000_000 + id, 0)
            .single()
            .expect("timestamp"),
    }
}

pub(crate) fn user(id: i64, username: &str) -> OnlineUser {
    OnlineUser {
        id: UserId(id),
        username: username.to_string(),
        full_name: None,
    }
}

pub(crate) fn profile(id: i64, username: &str, full_name: &str) -> UserProfile {
    UserProfile {
        id: UserId(id),
        username: username.to_string(),
        full_name: full_name.to_string(),
        created_at: None,
        last_seen: None,
    }
}

pub(crate) fn auth_failure(endpoint: Endpoint) -> FetchError {
    FetchError::AuthFailure {
        endpoint,
        detail: None,
    }
}

pub(crate) fn server_error(endpoint: Endpoint) -> FetchError {
    FetchError::Transient {
        endpoint,
        status: Some(500),
        reason: "server returned 500 Internal Server Error".into(),
    }
}

struct Scripted<T> {
    delay: Duration,
    result: FetchResult<T>,
}

/// Queued one-shot answers; when the queue is empty the fake falls back to
/// its server-side state.
struct Script<T> {
    queue: Mutex<VecDeque<Scripted<T>>>,
}

impl<T> Script<T> {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, delay: Duration, result: FetchResult<T>) {
        self.queue
            .lock()
            .expect("script lock")
            .push_back(Scripted { delay, result });
    }

    async fn next(&self) -> Option<FetchResult<T>> {
        let scripted = self.queue.lock().expect("script lock").pop_front()?;
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        Some(scripted.result)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Call {
    pub(crate) endpoint: Endpoint,
    pub(crate) at: Duration,
}

/// Chat server stand-in. Sent messages are appended to its list so a
/// following refresh sees them, like the real backend.
pub(crate) struct FakeChatApi {
    started: Instant,
    calls: Mutex<Vec<Call>>,
    server_messages: Mutex<Vec<ChatMessage>>,
    server_users: Mutex<Vec<OnlineUser>>,
    messages: Script<Vec<ChatMessage>>,
    send: Script<SendMessageResponse>,
    users: Script<Vec<OnlineUser>>,
    heartbeat: Script<HeartbeatAck>,
}

impl FakeChatApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            started: Instant::now(),
            calls: Mutex::new(Vec::new()),
            server_messages: Mutex::new(Vec::new()),
            server_users: Mutex::new(Vec::new()),
            messages: Script::new(),
            send: Script::new(),
            users: Script::new(),
            heartbeat: Script::new(),
        })
    }

    pub(crate) fn set_server_messages(&self, messages: Vec<ChatMessage>) {
        *self.server_messages.lock().expect("messages lock") = messages;
    }

    pub(crate) fn set_server_users(&self, users: Vec<OnlineUser>) {
        *self.server_users.lock().expect("users lock") = users;
    }

    pub(crate) fn script_messages(&self, delay: Duration, result: FetchResult<Vec<ChatMessage>>) {
        self.messages.push(delay, result);
    }

    pub(crate) fn script_send(&self, result: FetchResult<SendMessageResponse>) {
        self.send.push(Duration::ZERO, result);
    }

    pub(crate) fn script_users(&self, delay: Duration, result: FetchResult<Vec<OnlineUser>>) {
        self.users.push(delay, result);
    }

    pub(crate) fn script_heartbeat(&self, result: FetchResult<HeartbeatAck>) {
        self.heartbeat.push(Duration::ZERO, result);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn count(&self, endpoint: Endpoint) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .count()
    }

    pub(crate) fn times(&self, endpoint: Endpoint) -> Vec<Duration> {
        self.calls()
            .iter()
            .filter(|call| call.endpoint == endpoint)
            .map(|call| call.at)
            .collect()
    }

    fn record(&self, endpoint: Endpoint) {
        let at = self.started.elapsed();
        self.calls
            .lock()
            .expect("calls lock")
            .push(Call { endpoint, at });
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn list_messages(&self) -> FetchResult<Vec<ChatMessage>> {
        self.record(Endpoint::ListMessages);
        if let Some(result) = self.messages.next().await {
            return result;
        }
        Ok(self.server_messages.lock().expect("messages lock").clone())
    }

    async fn send_message(&self, text: &str) -> FetchResult<SendMessageResponse> {
        self.record(Endpoint::SendMessage);
        if let Some(result) = self.send.next().await {
            return result;
        }
        let mut messages = self.server_messages.lock().expect("messages lock");
        let id = messages.last().map(|m| m.id.0 + 1).unwrap_or(1);
        let created = message(id, "alice", text);
        messages.push(created.clone());
        Ok(SendMessageResponse::Created(created))
    }

    async fn online_users(&self) -> FetchResult<Vec<OnlineUser>> {
        self.record(Endpoint::OnlineUsers);
        if let Some(result) = self.users.next().await {
            return result;
        }
        Ok(self.server_users.lock().expect("users lock").clone())
    }

    async fn heartbeat(&self) -> FetchResult<HeartbeatAck> {
        self.record(Endpoint::Heartbeat);
        if let Some(result) = self.heartbeat.next().await {
            return result;
        }
        Ok(HeartbeatAck {
            status: Some("online".into()),
        })
    }
}

/// Account endpoints with fixed answers.
pub(crate) struct FakeAccountApi {
    pub(crate) register: Mutex<Option<FetchResult<AuthResponse>>>,
    pub(crate) login: Mutex<Option<FetchResult<AuthResponse>>>,
    pub(crate) profile: Mutex<Option<FetchResult<UserProfile>>>,
    pub(crate) calls: Mutex<Vec<Endpoint>>,
    pub(crate) last_update: Mutex<Option<String>>,
}

impl FakeAccountApi {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            register: Mutex::new(None),
            login: Mutex::new(None),
            profile: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
            last_update: Mutex::new(None),
        })
    }

    pub(crate) fn calls(&self) -> Vec<Endpoint> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, endpoint: Endpoint) {
        self.calls.lock().expect("calls lock").push(endpoint);
    }

    fn answer<T: Clone>(
        slot: &Mutex<Option<FetchResult<T>>>,
        endpoint: Endpoint,
    ) -> FetchResult<T> {
        slot.lock()
            .expect("answer lock")
            .clone()
            .unwrap_or_else(|| Err(FetchError::transient(endpoint, "no answer scripted")))
    }
}

#[async_trait]
impl AccountApi for FakeAccountApi {
    async fn register(&self, _request: &RegisterRequest) -> FetchResult<AuthResponse> {
        self.record(Endpoint::Register);
        Self::answer(&self.register, Endpoint::Register)
    }

    async fn login(&self, _request: &LoginRequest) -> FetchResult<AuthResponse> {
        self.record(Endpoint::Login);
        Self::answer(&self.login, Endpoint::Login)
    }

    async fn current_user(&self) -> FetchResult<UserProfile> {
        self.record(Endpoint::CurrentUser);
        Self::answer(&self.profile, Endpoint::CurrentUser)
    }

    async fn get_profile(&self) -> FetchResult<UserProfile> {
        self.record(Endpoint::GetProfile);
        Self::answer(&self.profile, Endpoint::GetProfile)
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> FetchResult<UserProfile> {
        self.record(Endpoint::UpdateProfile);
        *self.last_update.lock().expect("update lock") = Some(request.full_name.clone());
        Self::answer(&self.profile, Endpoint::UpdateProfile)
    }
}
