//! Auth configuration and shared state.

use super::session::SessionStore;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_MAX_LOGIN_FAILURES: i64 = 5;
const DEFAULT_FAILURE_WINDOW_SECONDS: i64 = 15 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    session_ttl_seconds: i64,
    max_login_failures: i64,
    failure_window_seconds: i64,
    secure_cookies: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            max_login_failures: DEFAULT_MAX_LOGIN_FAILURES,
            failure_window_seconds: DEFAULT_FAILURE_WINDOW_SECONDS,
            secure_cookies: false,
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_max_login_failures(mut self, failures: i64) -> Self {
        self.max_login_failures = failures;
        self
    }

    #[must_use]
    pub fn with_failure_window_seconds(mut self, seconds: i64) -> Self {
        self.failure_window_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn max_login_failures(&self) -> i64 {
        self.max_login_failures
    }

    #[must_use]
    pub fn failure_window_seconds(&self) -> i64 {
        self.failure_window_seconds
    }

    #[must_use]
    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared auth state: configuration plus the live session store.
pub struct AuthState {
    config: AuthConfig,
    sessions: SessionStore,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let sessions = SessionStore::new(config.session_ttl_seconds());
        Self { config, sessions }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = AuthConfig::new();

        assert_eq!(config.session_ttl_seconds(), DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(config.max_login_failures(), DEFAULT_MAX_LOGIN_FAILURES);
        assert_eq!(
            config.failure_window_seconds(),
            DEFAULT_FAILURE_WINDOW_SECONDS
        );
        assert!(!config.secure_cookies());

        let config = config
            .with_session_ttl_seconds(3_600)
            .with_max_login_failures(3)
            .with_failure_window_seconds(60)
            .with_secure_cookies(true);

        assert_eq!(config.session_ttl_seconds(), 3_600);
        assert_eq!(config.max_login_failures(), 3);
        assert_eq!(config.failure_window_seconds(), 60);
        assert!(config.secure_cookies());
    }

    #[tokio::test]
    async fn auth_state_owns_a_session_store() {
        let state = AuthState::new(AuthConfig::new().with_session_ttl_seconds(60));
        let token = state.sessions().create(0).await.expect("session");
        assert!(!token.is_empty());
    }
}
