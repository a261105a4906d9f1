use shared::{domain::ChatMessage, validation::validate_message_text};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{
    error::SendError,
    view::{ChatEvent, PolledSnapshot, ViewContext},
};

#[derive(Debug, Default)]
struct DraftState {
    text: String,
    send_error: Option<String>,
}

pub struct MessageChannel {
    ctx: ViewContext,
    snapshot: Mutex<PolledSnapshot<ChatMessage>>,
    draft: Mutex<DraftState>,
}

impl MessageChannel {
    pub(crate) fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            snapshot: Mutex::new(PolledSnapshot::new()),
            draft: Mutex::new(DraftState::default()),
        }
    }

    pub async fn refresh(&self) {
        if !self.ctx.scope.is_active() {
            return;
        }
        let seq = self.snapshot.lock().await.begin();

        match self.ctx.api.list_messages().await {
            Ok(messages) => {
                let count = {
                    let mut snapshot = self.snapshot.lock().await;
                    if !self.ctx.scope.is_active() {
                        debug!(seq, "sync: dropping messages that arrived after teardown");
                        return;
                    }
                    if !snapshot.apply(seq, messages) {
                        debug!(seq, "sync: dropping overtaken messages response");
                        return;
                    }
                    snapshot.items().len()
                };
                self.ctx.emit(ChatEvent::MessagesUpdated { count });
            }
            Err(err) => self.ctx.handle_failure("messages", &err).await,
        }
    }

    pub async fn send(&self, text: &str) -> Result<(), SendError> {
        validate_message_text(text)?;
        if !self.ctx.scope.is_active() {
            return Err(SendError::Detached);
        }

        match self.ctx.api.send_message(text).await {
            Ok(_) => {
                if !self.ctx.scope.is_active() {
                    return Ok(());
                }
                {
                    let mut draft = self.draft.lock().await;
                    draft.text.clear();
                    draft.send_error = None;
                }
                info!(chars = text.chars().count(), "sync: message sent");
                self.ctx.emit(ChatEvent::DraftChanged);
                self.refresh().await;
                Ok(())
            }
            Err(err) if err.is_auth_failure() => {
                self.ctx.expire("messages").await;
                Err(err.into())
            }
            Err(err) => {
                warn!(error = %err, "sync: send failed, draft kept for retry");
                if self.ctx.scope.is_active() {
                    let reason = err.to_string();
                    self.draft.lock().await.send_error = Some(reason.clone());
                    self.ctx.emit(ChatEvent::SendFailed { reason });
                }
                Err(err.into())
            }
        }
    }

    pub async fn send_draft(&self) -> Result<(), SendError> {
        let text = self.draft.lock().await.text.clone();
        self.send(&text).await
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.draft.lock().await.text = text.into();
        self.ctx.emit(ChatEvent::DraftChanged);
    }

    pub async fn draft(&self) -> String {
        self.draft.lock().await.text.clone()
    }

    pub async fn send_error(&self) -> Option<String> {
        self.draft.lock().await.send_error.clone()
    }

    pub async fn snapshot(&self) -> Vec<ChatMessage> {
        self.snapshot.lock().await.items().to_vec()
    }

    /// `true` until the first successful fetch.
    pub async fn is_loading(&self) -> bool {
        !self.snapshot.lock().await.is_loaded()
    }
}

#[cfg(test)]
#[path = "tests/messages_tests.rs"]
mod tests;
