use shared::domain::OnlineUser;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::view::{ChatEvent, PolledSnapshot, ViewContext};

/// What a single heartbeat achieved. Heartbeats never fail their caller:
/// a missed one only makes presence less accurate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    Acknowledged,
    Missed,
    SessionExpired,
    Skipped,
}

pub struct PresenceChannel {
    ctx: ViewContext,
    snapshot: Mutex<PolledSnapshot<OnlineUser>>,
}

impl PresenceChannel {
    pub(crate) fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            snapshot: Mutex::new(PolledSnapshot::new()),
        }
    }

    pub async fn refresh_users(&self) {
        if !self.ctx.scope.is_active() {
            return;
        }
        let seq = self.snapshot.lock().await.begin();

        match self.ctx.api.online_users().await {
            Ok(users) => {
                let count = {
                    let mut snapshot = self.snapshot.lock().await;
                    if !self.ctx.scope.is_active() {
                        debug!(seq, "sync: dropping online users that arrived after teardown");
                        return;
                    }
                    if !snapshot.apply(seq, users) {
                        debug!(seq, "sync: dropping overtaken online users response");
                        return;
                    }
                    snapshot.items().len()
                };
                self.ctx.emit(ChatEvent::UsersUpdated { count });
            }
            Err(err) => self.ctx.handle_failure("presence", &err).await,
        }
    }

    pub async fn heartbeat(&self) -> HeartbeatOutcome {
        if !self.ctx.scope.is_active() {
            return HeartbeatOutcome::Skipped;
        }
        match self.ctx.api.heartbeat().await {
            Ok(ack) => {
                debug!(status = ?ack.status, "sync: heartbeat acknowledged");
                HeartbeatOutcome::Acknowledged
            }
            Err(err) if err.is_auth_failure() => {
                self.ctx.expire("heartbeat").await;
                HeartbeatOutcome::SessionExpired
            }
            Err(err) => {
                warn!(error = %err, "sync: heartbeat missed");
                HeartbeatOutcome::Missed
            }
        }
    }

    pub async fn snapshot(&self) -> Vec<OnlineUser> {
        self.snapshot.lock().await.items().to_vec()
    }
}

#[cfg(test)]
#[path = "tests/presence_tests.rs"]
mod tests;
