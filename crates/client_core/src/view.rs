use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::{
    error::FetchError,
    gateway::ChatApi,
    messages::MessageChannel,
    presence::PresenceChannel,
    scope::ViewScope,
    session::SessionGuard,
};

const VIEW_EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessagesUpdated { count: usize },
    UsersUpdated { count: usize },
    DraftChanged,
    SendFailed { reason: String },
    Closed,
}

/// Requests are numbered when issued; a response older than the last applied
/// one is dropped so an overtaken fetch cannot roll the view back.
#[derive(Debug)]
pub(crate) struct PolledSnapshot<T> {
    items: Vec<T>,
    issued: u64,
    applied: u64,
}

impl<T> PolledSnapshot<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: Vec::new(),
            issued: 0,
            applied: 0,
        }
    }

    pub(crate) fn begin(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    pub(crate) fn apply(&mut self, seq: u64, items: Vec<T>) -> bool {
        if seq <= self.applied {
            return false;
        }
        self.applied = seq;
        self.items = items;
        true
    }

    pub(crate) fn items(&self) -> &[T] {
        &self.items
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.applied > 0
    }
}

#[derive(Clone)]
pub(crate) struct ViewContext {
    pub(crate) api: Arc<dyn ChatApi>,
    pub(crate) guard: Arc<SessionGuard>,
    pub(crate) scope: ViewScope,
    events: broadcast::Sender<ChatEvent>,
}

impl ViewContext {
    pub(crate) fn emit(&self, event: ChatEvent) {
        let _ = self.events.send(event);
    }

    pub(crate) async fn handle_failure(&self, channel: &'static str, err: &FetchError) {
        if err.is_auth_failure() {
            self.expire(channel).await;
        } else {
            warn!(channel, error = %err, "sync: fetch failed, keeping current state");
        }
    }

    pub(crate) async fn expire(&self, channel: &'static str) {
        if !self.scope.is_active() {
            debug!(channel, "sync: ignoring auth failure for a closed view");
            return;
        }
        // Guard first: cancelling wakes the poller, which aborts this tick.
        self.guard.on_auth_failure().await;
        if self.scope.cancel() {
            debug!(channel, "sync: view stopped after credentials were rejected");
            self.emit(ChatEvent::Closed);
        }
    }
}

pub struct ChatView {
    ctx: ViewContext,
    messages: MessageChannel,
    presence: PresenceChannel,
}

impl ChatView {
    pub(crate) fn new(api: Arc<dyn ChatApi>, guard: Arc<SessionGuard>) -> Arc<Self> {
        let (events, _) = broadcast::channel(VIEW_EVENT_CAPACITY);
        let ctx = ViewContext {
            api,
            guard,
            scope: ViewScope::new(),
            events,
        };
        Arc::new(Self {
            messages: MessageChannel::new(ctx.clone()),
            presence: PresenceChannel::new(ctx.clone()),
            ctx,
        })
    }

    pub fn messages(&self) -> &MessageChannel {
        &self.messages
    }

    pub fn presence(&self) -> &PresenceChannel {
        &self.presence
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.ctx.events.subscribe()
    }

    pub fn is_mounted(&self) -> bool {
        self.ctx.scope.is_active()
    }

    pub(crate) fn scope(&self) -> &ViewScope {
        &self.ctx.scope
    }

    pub(crate) fn close(&self) -> bool {
        let closed = self.ctx.scope.cancel();
        if closed {
            self.ctx.emit(ChatEvent::Closed);
        }
        closed
    }
}
