use std::{future::Future, sync::Arc, time::Duration};

use tokio::{
    sync::Mutex,
    task::{JoinHandle, JoinSet},
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info};

use crate::{gateway::ChatApi, session::SessionGuard, view::ChatView};

const MIN_POLL_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingIntervals {
    pub messages: Duration,
    pub users: Duration,
    pub heartbeat: Duration,
}

impl Default for PollingIntervals {
    fn default() -> Self {
        Self {
            messages: Duration::from_secs(3),
            users: Duration::from_secs(5),
            heartbeat: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Active,
}

pub enum MountOutcome {
    Active(Arc<ChatView>),
    RedirectedToLogin,
}

struct ActiveView {
    view: Arc<ChatView>,
    pollers: Vec<JoinHandle<()>>,
}

impl Drop for ActiveView {
    fn drop(&mut self) {
        self.view.close();
        for poller in &self.pollers {
            poller.abort();
        }
    }
}

pub struct SyncScheduler {
    api: Arc<dyn ChatApi>,
    guard: Arc<SessionGuard>,
    intervals: PollingIntervals,
    active: Mutex<Option<ActiveView>>,
}

impl SyncScheduler {
    pub fn new(
        api: Arc<dyn ChatApi>,
        guard: Arc<SessionGuard>,
        intervals: PollingIntervals,
    ) -> Self {
        Self {
            api,
            guard,
            intervals,
            active: Mutex::new(None),
        }
    }

    pub async fn mount(&self) -> MountOutcome {
        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            debug!("sync: tearing down previous chat view before remount");
            drop(previous);
        }
        if !self.guard.require_session().await {
            return MountOutcome::RedirectedToLogin;
        }

        let view = ChatView::new(Arc::clone(&self.api), Arc::clone(&self.guard));
        let pollers = vec![
            spawn_poller(
                "messages",
                self.intervals.messages,
                Arc::clone(&view),
                |view| async move { view.messages().refresh().await },
            ),
            spawn_poller(
                "users",
                self.intervals.users,
                Arc::clone(&view),
                |view| async move { view.presence().refresh_users().await },
            ),
            spawn_poller(
                "heartbeat",
                self.intervals.heartbeat,
                Arc::clone(&view),
                |view| async move {
                    view.presence().heartbeat().await;
                },
            ),
        ];
        *active = Some(ActiveView {
            view: Arc::clone(&view),
            pollers,
        });
        info!(
            messages_ms = self.intervals.messages.as_millis() as u64,
            users_ms = self.intervals.users.as_millis() as u64,
            heartbeat_ms = self.intervals.heartbeat.as_millis() as u64,
            "sync: chat view mounted"
        );
        MountOutcome::Active(view)
    }

    pub async fn unmount(&self) -> bool {
        match self.active.lock().await.take() {
            Some(active) => {
                drop(active);
                info!("sync: chat view unmounted");
                true
            }
            None => false,
        }
    }

    /// `Active` only while a mounted view is still live; a view stopped by
    /// rejected credentials reports `Idle` even before it is unmounted.
    pub async fn state(&self) -> SchedulerState {
        match self.active.lock().await.as_ref() {
            Some(active) if active.view.is_mounted() => SchedulerState::Active,
            _ => SchedulerState::Idle,
        }
    }

    pub async fn current_view(&self) -> Option<Arc<ChatView>> {
        self.active
            .lock()
            .await
            .as_ref()
            .filter(|active| active.view.is_mounted())
            .map(|active| Arc::clone(&active.view))
    }
}

fn spawn_poller<F, Fut>(
    name: &'static str,
    period: Duration,
    view: Arc<ChatView>,
    tick: F,
) -> JoinHandle<()>
where
    F: Fn(Arc<ChatView>) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = period.max(MIN_POLL_PERIOD);
    let scope = view.scope().clone();
    tokio::spawn(async move {
        let mut in_flight = JoinSet::new();
        in_flight.spawn(tick(Arc::clone(&view)));

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = scope.cancelled() => break,
                _ = ticker.tick() => {
                    in_flight.spawn(tick(Arc::clone(&view)));
                }
                Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
            }
        }
        in_flight.abort_all();
        debug!(poller = name, "sync: poller stopped");
    })
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
