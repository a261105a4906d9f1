use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    routes::{Navigator, Route},
    token_store::{MemoryTokenStore, TokenStore},
};

pub struct Session {
    token: RwLock<Option<String>>,
    store: Arc<dyn TokenStore>,
}

impl Session {
    pub fn restore(store: Arc<dyn TokenStore>) -> Self {
        let token = match store.load() {
            Ok(token) => token,
            Err(err) => {
                warn!(error = %err, "session: failed to load persisted token");
                None
            }
        };
        Self {
            token: RwLock::new(token),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::restore(Arc::new(MemoryTokenStore::default()))
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn establish(&self, token: String) {
        if let Err(err) = self.store.save(&token) {
            warn!(error = %err, "session: failed to persist token");
        }
        *self.token.write().await = Some(token);
    }

    /// Removes the token and returns it, so exactly one caller observes the
    /// transition from signed-in to signed-out.
    async fn clear(&self) -> Option<String> {
        let previous = self.token.write().await.take();
        if previous.is_some() {
            if let Err(err) = self.store.clear() {
                warn!(error = %err, "session: failed to clear persisted token");
            }
        }
        previous
    }
}

pub struct SessionGuard {
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
}

impl SessionGuard {
    pub fn new(session: Arc<Session>, navigator: Arc<dyn Navigator>) -> Self {
        Self { session, navigator }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn current_token(&self) -> Option<String> {
        self.session.token().await
    }

    pub async fn establish(&self, token: String) {
        self.session.establish(token).await;
        info!("session: established");
    }

    pub async fn require_session(&self) -> bool {
        if self.session.is_authenticated().await {
            return true;
        }
        debug!("session: no token, redirecting to login");
        self.navigator.navigate(Route::Login);
        false
    }

    pub async fn on_auth_failure(&self) -> bool {
        match self.session.clear().await {
            Some(_) => {
                warn!("session: credentials rejected, signing out");
                self.navigator.navigate(Route::Login);
                true
            }
            None => {
                debug!("session: auth failure after sign-out already happened");
                false
            }
        }
    }

    pub async fn logout(&self) {
        self.session.clear().await;
        info!("session: signed out");
        self.navigator.navigate(Route::Login);
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
