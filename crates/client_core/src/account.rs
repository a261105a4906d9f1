use std::sync::Arc;

use shared::{
    domain::UserProfile,
    protocol::{LoginRequest, RegisterRequest, UpdateProfileRequest},
    validation::{validate_full_name, validate_login, validate_registration},
};
use tracing::{info, warn};

use crate::{
    error::{AccountError, FetchError},
    gateway::AccountApi,
    routes::{Navigator, Route},
    session::SessionGuard,
};

const DEFAULT_LOGIN_ERROR: &str = "Login failed. Check your username and password.";

#[derive(Debug, Clone)]
pub struct RegistrationForm {
    pub username: String,
    pub full_name: String,
    pub password: String,
}

pub struct AccountClient {
    api: Arc<dyn AccountApi>,
    guard: Arc<SessionGuard>,
    navigator: Arc<dyn Navigator>,
}

impl AccountClient {
    pub fn new(
        api: Arc<dyn AccountApi>,
        guard: Arc<SessionGuard>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            api,
            guard,
            navigator,
        }
    }

    pub async fn register(
        &self,
        form: &RegistrationForm,
    ) -> Result<Option<UserProfile>, AccountError> {
        validate_registration(&form.username, &form.full_name, &form.password)?;
        let request = RegisterRequest {
            username: form.username.clone(),
            full_name: form.full_name.clone(),
            password: form.password.clone(),
        };
        let response = self
            .api
            .register(&request)
            .await
            .map_err(|err| AccountError::Request(request_failure_text(&err)))?;

        self.guard.establish(response.token).await;
        info!(username = %form.username, "account: registered");
        self.navigator.navigate(Route::Chat);
        Ok(response.user)
    }

    pub async fn login(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<UserProfile>, AccountError> {
        validate_login(username, password)?;
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let response = self.api.login(&request).await.map_err(|err| match err {
            FetchError::AuthFailure { detail, .. } => AccountError::InvalidCredentials(
                detail.unwrap_or_else(|| DEFAULT_LOGIN_ERROR.to_string()),
            ),
            other => AccountError::Request(request_failure_text(&other)),
        })?;

        self.guard.establish(response.token).await;
        info!(%username, "account: logged in");
        self.navigator.navigate(Route::Chat);
        Ok(response.user)
    }

    pub async fn logout(&self) {
        self.guard.logout().await;
    }

    pub async fn current_user(&self) -> Result<UserProfile, AccountError> {
        if !self.guard.require_session().await {
            return Err(AccountError::SessionExpired);
        }
        let result = self.api.current_user().await;
        self.authenticated_outcome(result).await
    }

    pub async fn load_profile(&self) -> Result<UserProfile, AccountError> {
        if !self.guard.require_session().await {
            return Err(AccountError::SessionExpired);
        }
        let result = self.api.get_profile().await;
        self.authenticated_outcome(result).await
    }

    pub async fn update_profile(&self, full_name: &str) -> Result<UserProfile, AccountError> {
        validate_full_name(full_name)?;
        if !self.guard.require_session().await {
            return Err(AccountError::SessionExpired);
        }
        let request = UpdateProfileRequest {
            full_name: full_name.to_string(),
        };
        let result = self.api.update_profile(&request).await;
        let profile = self.authenticated_outcome(result).await?;
        info!(username = %profile.username, "account: profile updated");
        Ok(profile)
    }

    async fn authenticated_outcome<T>(
        &self,
        result: Result<T, FetchError>,
    ) -> Result<T, AccountError> {
        match result {
            Ok(value) => Ok(value),
            Err(err) if err.is_auth_failure() => {
                self.guard.on_auth_failure().await;
                Err(AccountError::SessionExpired)
            }
            Err(err) => {
                warn!(error = %err, "account: request failed");
                Err(AccountError::Request(request_failure_text(&err)))
            }
        }
    }
}

fn request_failure_text(err: &FetchError) -> String {
    match err {
        FetchError::Transient { reason, .. } => reason.clone(),
        FetchError::AuthFailure { detail, .. } => detail
            .clone()
            .unwrap_or_else(|| "credentials rejected".to_string()),
    }
}

#[cfg(test)]
#[path = "tests/account_tests.rs"]
mod tests;
