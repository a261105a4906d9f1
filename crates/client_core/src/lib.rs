use std::sync::Arc;

use anyhow::Result;

pub mod account;
pub mod config;
pub mod error;
pub mod gateway;
pub mod messages;
pub mod presence;
pub mod routes;
pub mod scheduler;
pub mod scope;
pub mod session;
pub mod token_store;
pub mod view;

pub use account::{AccountClient, RegistrationForm};
pub use config::{load_settings, Settings};
pub use error::{AccountError, FetchError, FetchResult, SendError};
pub use gateway::{AccountApi, ChatApi, Endpoint, HttpGateway};
pub use presence::HeartbeatOutcome;
pub use routes::{Navigator, Route};
pub use scheduler::{MountOutcome, PollingIntervals, SchedulerState, SyncScheduler};
pub use session::{Session, SessionGuard};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use view::{ChatEvent, ChatView};

pub struct ChatClient {
    pub guard: Arc<SessionGuard>,
    pub accounts: AccountClient,
    pub scheduler: SyncScheduler,
}

impl ChatClient {
    pub fn new(
        settings: &Settings,
        store: Arc<dyn TokenStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self> {
        let session = Arc::new(Session::restore(store));
        let gateway = Arc::new(HttpGateway::new(
            &settings.server_url,
            Arc::clone(&session),
            settings.request_timeout,
        )?);
        let guard = Arc::new(SessionGuard::new(session, Arc::clone(&navigator)));
        let accounts = AccountClient::new(gateway.clone(), Arc::clone(&guard), navigator);
        let scheduler = SyncScheduler::new(gateway, Arc::clone(&guard), settings.intervals);
        Ok(Self {
            guard,
            accounts,
            scheduler,
        })
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
pub(crate) mod test_support;
