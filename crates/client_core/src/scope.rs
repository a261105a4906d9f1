use std::sync::Arc;

use tokio::sync::watch;

#[derive(Clone)]
pub struct ViewScope {
    cancelled: Arc<watch::Sender<bool>>,
}

impl ViewScope {
    pub fn new() -> Self {
        let (cancelled, _) = watch::channel(false);
        Self {
            cancelled: Arc::new(cancelled),
        }
    }

    pub fn is_active(&self) -> bool {
        !*self.cancelled.borrow()
    }

    pub fn cancel(&self) -> bool {
        !self.cancelled.send_replace(true)
    }

    pub async fn cancelled(&self) {
        let mut rx = self.cancelled.subscribe();
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::new()
    }
}
