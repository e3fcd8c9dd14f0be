// Credential store - owns the file-storage API token.
//
// Lifecycle of the token:
// - loaded from the token store on first use
// - returned unchanged while it is still valid
// - refreshed when expired and a refresh token is present
// - replaced by a full interactive authorization otherwise
// - persisted immediately after any change, before it is handed out
//
// NO HTTP or filesystem code here - that lives behind the two ports below.

use super::credential_models::AccessToken;
use async_trait::async_trait;
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or unreadable client-secret artifact. Nothing remote can work.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Token storage error: {0}")]
    Storage(String),
}

// ============================================================================
// PORTS
// ============================================================================

/// Durable storage for the access token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Returns `Ok(None)` when nothing usable is persisted.
    async fn load(&self) -> Result<Option<AccessToken>, AuthError>;

    async fn save(&self, token: &AccessToken) -> Result<(), AuthError>;
}

/// The identity provider side of the credential lifecycle.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Exchanges the token's refresh credential for a fresh access token.
    async fn refresh(&self, token: &AccessToken) -> Result<AccessToken, AuthError>;

    /// Runs the interactive consent flow. May block on a human.
    async fn authorize(&self, scopes: &[String]) -> Result<AccessToken, AuthError>;
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct CredentialStore<S: TokenStore, F: AuthorizationFlow> {
    store: S,
    flow: F,
    current: Option<AccessToken>,
    loaded: bool,
}

impl<S: TokenStore, F: AuthorizationFlow> CredentialStore<S, F> {
    pub fn new(store: S, flow: F) -> Self {
        Self {
            store,
            flow,
            current: None,
            loaded: false,
        }
    }

    /// Returns a usable token, refreshing or re-authorizing as needed.
    pub async fn obtain_token(&mut self, scopes: &[String]) -> Result<&AccessToken, AuthError> {
        if !self.loaded {
            self.current = match self.store.load().await {
                Ok(token) => token,
                Err(e) => {
                    tracing::warn!("Ignoring persisted token: {}", e);
                    None
                }
            };
            self.loaded = true;
        }

        if self.current.as_ref().is_some_and(|t| t.is_valid()) {
            return self.current_token();
        }

        let mut acquired = None;

        if let Some(existing) = self.current.as_ref().filter(|t| t.can_refresh()) {
            tracing::info!("Access token expired, refreshing");
            match self.flow.refresh(existing).await {
                Ok(token) => acquired = Some(token),
                Err(e) => {
                    tracing::warn!("Error refreshing token, re-authentication is needed: {}", e);
                }
            }
        }

        let token = match acquired {
            Some(token) => token,
            None => {
                tracing::info!("No usable token, starting interactive authorization");
                self.flow.authorize(scopes).await?
            }
        };

        self.store.save(&token).await?;
        self.current = Some(token);
        self.current_token()
    }

    fn current_token(&self) -> Result<&AccessToken, AuthError> {
        self.current
            .as_ref()
            .ok_or_else(|| AuthError::Authorization("no token available".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::auth::credential_models::DRIVE_READONLY_SCOPE;
    use chrono::{Duration, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct MemoryTokenStore {
        token: Mutex<Option<AccessToken>>,
        saves: AtomicUsize,
    }

    #[async_trait]
    impl TokenStore for Arc<MemoryTokenStore> {
        async fn load(&self) -> Result<Option<AccessToken>, AuthError> {
            Ok(self.token.lock().unwrap().clone())
        }

        async fn save(&self, token: &AccessToken) -> Result<(), AuthError> {
            *self.token.lock().unwrap() = Some(token.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeFlow {
        refresh_ok: bool,
        authorize_result: Result<String, String>,
        refreshes: AtomicUsize,
        authorizations: AtomicUsize,
    }

    impl FakeFlow {
        fn new(refresh_ok: bool) -> Self {
            Self {
                refresh_ok,
                authorize_result: Ok("authorized".to_string()),
                refreshes: AtomicUsize::new(0),
                authorizations: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl AuthorizationFlow for Arc<FakeFlow> {
        async fn refresh(&self, token: &AccessToken) -> Result<AccessToken, AuthError> {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
            if self.refresh_ok {
                Ok(AccessToken {
                    token: "refreshed".to_string(),
                    expiry: Some(Utc::now() + Duration::hours(1)),
                    ..token.clone()
                })
            } else {
                Err(AuthError::Authorization("invalid_grant".to_string()))
            }
        }

        async fn authorize(&self, scopes: &[String]) -> Result<AccessToken, AuthError> {
            self.authorizations.fetch_add(1, Ordering::SeqCst);
            match &self.authorize_result {
                Ok(value) => Ok(token(value, 3600, scopes.to_vec())),
                Err(msg) => Err(AuthError::Configuration(msg.clone())),
            }
        }
    }

    fn token(value: &str, expires_in_secs: i64, scopes: Vec<String>) -> AccessToken {
        AccessToken {
            token: value.to_string(),
            refresh_token: Some("refresh".to_string()),
            token_uri: None,
            client_id: None,
            client_secret: None,
            scopes,
            expiry: Some(Utc::now() + Duration::seconds(expires_in_secs)),
        }
    }

    fn scopes() -> Vec<String> {
        vec![DRIVE_READONLY_SCOPE.to_string()]
    }

    #[tokio::test]
    async fn test_valid_token_returned_unchanged() {
        let store = Arc::new(MemoryTokenStore::default());
        let persisted = token("persisted", 3600, scopes());
        *store.token.lock().unwrap() = Some(persisted.clone());
        let flow = Arc::new(FakeFlow::new(true));

        let mut credentials = CredentialStore::new(store.clone(), flow.clone());
        let obtained = credentials.obtain_token(&scopes()).await.unwrap().clone();

        assert_eq!(obtained, persisted);
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_and_persisted() {
        let store = Arc::new(MemoryTokenStore::default());
        *store.token.lock().unwrap() = Some(token("stale", -60, scopes()));
        let flow = Arc::new(FakeFlow::new(true));

        let mut credentials = CredentialStore::new(store.clone(), flow.clone());
        let obtained = credentials.obtain_token(&scopes()).await.unwrap().clone();

        assert_eq!(obtained.token, "refreshed");
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 0);
        assert_eq!(store.token.lock().unwrap().as_ref(), Some(&obtained));
    }

    #[tokio::test]
    async fn test_failed_refresh_falls_back_to_authorization() {
        let store = Arc::new(MemoryTokenStore::default());
        *store.token.lock().unwrap() = Some(token("stale", -60, scopes()));
        let flow = Arc::new(FakeFlow::new(false));

        let mut credentials = CredentialStore::new(store.clone(), flow.clone());
        let obtained = credentials.obtain_token(&scopes()).await.unwrap().clone();

        assert_eq!(obtained.token, "authorized");
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 1);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_token_runs_authorization() {
        let store = Arc::new(MemoryTokenStore::default());
        let flow = Arc::new(FakeFlow::new(true));

        let mut credentials = CredentialStore::new(store.clone(), flow.clone());
        let obtained = credentials.obtain_token(&scopes()).await.unwrap().clone();

        assert_eq!(obtained.token, "authorized");
        assert_eq!(obtained.scopes, scopes());
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 0);
        assert!(store.token.lock().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expired_token_without_refresh_skips_refresh() {
        let store = Arc::new(MemoryTokenStore::default());
        let mut stale = token("stale", -60, scopes());
        stale.refresh_token = None;
        *store.token.lock().unwrap() = Some(stale);
        let flow = Arc::new(FakeFlow::new(true));

        let mut credentials = CredentialStore::new(store, flow.clone());
        credentials.obtain_token(&scopes()).await.unwrap();

        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_configuration_error_is_fatal() {
        let store = Arc::new(MemoryTokenStore::default());
        let mut flow = FakeFlow::new(true);
        flow.authorize_result = Err("credentials.json not found".to_string());

        let mut credentials = CredentialStore::new(store.clone(), Arc::new(flow));
        let err = credentials.obtain_token(&scopes()).await.unwrap_err();

        assert!(matches!(err, AuthError::Configuration(_)));
        assert_eq!(store.saves.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_token_loaded_only_once() {
        let store = Arc::new(MemoryTokenStore::default());
        let flow = Arc::new(FakeFlow::new(true));

        let mut credentials = CredentialStore::new(store.clone(), flow.clone());
        credentials.obtain_token(&scopes()).await.unwrap();
        credentials.obtain_token(&scopes()).await.unwrap();

        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }

    struct CorruptTokenStore {
        saves: AtomicUsize,
    }

    #[async_trait]
    impl TokenStore for Arc<CorruptTokenStore> {
        async fn load(&self) -> Result<Option<AccessToken>, AuthError> {
            Err(AuthError::Storage("token.json: expected value at line 1 column 1".to_string()))
        }

        async fn save(&self, _token: &AccessToken) -> Result<(), AuthError> {
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unreadable_token_is_treated_as_absent() {
        let store = Arc::new(CorruptTokenStore {
            saves: AtomicUsize::new(0),
        });
        let flow = Arc::new(FakeFlow::new(true));

        let mut credentials = CredentialStore::new(store.clone(), flow.clone());
        let obtained = credentials.obtain_token(&scopes()).await.unwrap().clone();

        assert_eq!(obtained.token, "authorized");
        assert_eq!(flow.refreshes.load(Ordering::SeqCst), 0);
        assert_eq!(flow.authorizations.load(Ordering::SeqCst), 1);
        assert_eq!(store.saves.load(Ordering::SeqCst), 1);
    }
}
