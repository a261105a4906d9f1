use std::fmt;

use tokio::sync::mpsc;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Root,
    Register,
    Login,
    Chat,
    Profile,
}

impl Route {
    pub const ALL: [Route; 5] = [
        Route::Root,
        Route::Register,
        Route::Login,
        Route::Chat,
        Route::Profile,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Register => "/register",
            Route::Login => "/login",
            Route::Chat => "/chat",
            Route::Profile => "/profile",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            other => other,
        };
        Self::ALL
            .into_iter()
            .find(|route| route.path() == normalized)
    }

    pub fn resolve(self) -> Route {
        match self {
            Route::Root => Route::Login,
            other => other,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

impl Navigator for mpsc::UnboundedSender<Route> {
    fn navigate(&self, route: Route) {
        if self.send(route.resolve()).is_err() {
            warn!(route = %route, "navigation: no view binding is listening");
        }
    }
}
