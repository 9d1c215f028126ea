//! Session store
//!
//! Current user, connection flag and login timestamp. The CSRF token itself
//! lives in the shared [`ApiClient`].
//!
//! # Lifecycle
//!
//! ```text
//! login ──► POST /user/login/ ──► GET /user/me/ ──► connected
//!   │                                                  │
//!   └─ failure: notification, state cleared            ├─ handle_session_cookie_expiration
//!                                                      └─ logout ──► POST /user/logout/
//! ```

use crate::client::ApiClient;
use crate::error::{ApiError, Result};
use crate::guard::Route;
use crate::models::{RegisterRequest, User, UserRole};
use crate::notify::{Notification, Notifier};
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Persisted form of a session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub is_connected: bool,
    pub connection_timestamp: Option<DateTime<Utc>>,
    pub csrf: Option<String>,
    /// `Cookie` header for the API (holds the backend session id)
    pub cookies: Option<String>,
}

/// Authentication state of the console
pub struct SessionStore {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
    user: Option<User>,
    is_connected: bool,
    connection_timestamp: Option<DateTime<Utc>>,
    redirect: Option<Route>,
}

impl SessionStore {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            client,
            notifier,
            user: None,
            is_connected: false,
            connection_timestamp: None,
            redirect: None,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.is_connected
    }

    pub fn connection_timestamp(&self) -> Option<DateTime<Utc>> {
        self.connection_timestamp
    }

    pub fn csrf(&self) -> Option<String> {
        self.client.csrf_token()
    }

    /// Role of the connected user
    pub fn role(&self) -> Option<UserRole> {
        if !self.is_connected {
            return None;
        }
        self.user.as_ref().map(|u| u.role)
    }

    /// Where the console should go next, if an operation asked to move
    pub fn take_redirect(&mut self) -> Option<Route> {
        self.redirect.take()
    }

    /// Fetch a fresh CSRF token
    pub async fn get_csrf(&self) -> Result<String> {
        self.client.refresh_csrf().await
    }

    /// Log in. Returns whether the session is now connected.
    pub async fn login(&mut self, username: &str, password: &str) -> bool {
        self.clear();

        match self.authenticate(username, password).await {
            Ok(user) => {
                info!("Logged in as {} ({})", user.username, user.role);
                self.user = Some(user);
                self.is_connected = true;
                self.connection_timestamp = Some(Utc::now());
                self.redirect = Some(Route::Home);
                true
            }
            Err(e) => {
                warn!("Login failed for {}: {}", username, e);
                self.clear();
                self.notifier.notify(Notification::error(e.user_message()));
                false
            }
        }
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User> {
        let credentials = serde_json::json!({
            "username": username,
            "password": password,
        });
        self.client
            .mutate(Method::POST, "/user/login/", Some(&credentials))
            .await?;
        self.client.get_json("/user/me/").await
    }

    /// Log out. Local state, cookies and CSRF token are dropped whatever
    /// the server says.
    ///
    /// Returns whether the backend acknowledged the logout.
    pub async fn logout(&mut self) -> bool {
        let acknowledged = match self.client.mutate_empty(Method::POST, "/user/logout/").await {
            Ok(_) => true,
            Err(e) => {
                warn!("Logout request failed: {}", e);
                false
            }
        };

        if let Some(user) = &self.user {
            info!("Logged out {}", user.username);
        }
        self.clear();
        self.client.clear_session();
        self.redirect = Some(Route::Login);
        acknowledged
    }

    /// Force a logout once the session is older than the configured age.
    ///
    /// Polling check: call it periodically or on navigation. Returns whether
    /// a logout happened.
    pub async fn handle_session_cookie_expiration(&mut self) -> bool {
        self.handle_session_cookie_expiration_at(Utc::now()).await
    }

    /// `handle_session_cookie_expiration` against an explicit clock
    pub async fn handle_session_cookie_expiration_at(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_expired_at(now) {
            return false;
        }

        info!("Session older than {:?}, logging out", self.client.config().session_cookie_age);
        self.logout().await;
        true
    }

    /// Connected and past the max session age
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if !self.is_connected {
            return false;
        }

        let Some(since) = self.connection_timestamp else {
            // Connected without a timestamp: treat as infinitely old
            return true;
        };

        match (now - since).to_std() {
            Ok(elapsed) => elapsed > self.client.config().session_cookie_age,
            // Login timestamp in the future
            Err(_) => false,
        }
    }

    /// Create an account
    pub async fn register(&self, request: &RegisterRequest) -> bool {
        if request.password != request.password_validation {
            self.notifier
                .notify(Notification::error("Passwords do not match"));
            return false;
        }

        match self
            .client
            .mutate(Method::POST, "/user/register/", Some(request))
            .await
        {
            Ok(_) => {
                info!("Registered {}", request.username);
                true
            }
            Err(e) => {
                warn!("Registration failed: {}", e);
                self.notifier.notify(Notification::error(e.user_message()));
                false
            }
        }
    }

    /// Refetch the connected user's record
    pub async fn refresh_me(&mut self) -> Option<User> {
        if !self.is_connected {
            self.notifier
                .notify(Notification::error(ApiError::NotConnected.to_string()));
            return None;
        }

        match self.client.get_json::<User>("/user/me/").await {
            Ok(user) => {
                debug!("Refreshed user {}", user.username);
                self.user = Some(user.clone());
                Some(user)
            }
            Err(e) => {
                if matches!(e.status(), Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)) {
                    // Backend dropped the session
                    warn!("Session rejected by the backend");
                    self.clear();
                    self.redirect = Some(Route::Login);
                }
                self.notifier.notify(Notification::error(e.user_message()));
                None
            }
        }
    }

    fn clear(&mut self) {
        self.user = None;
        self.is_connected = false;
        self.connection_timestamp = None;
    }

    /// Current state, ready to be persisted
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            is_connected: self.is_connected,
            connection_timestamp: self.connection_timestamp,
            csrf: self.client.csrf_token(),
            cookies: self.client.cookie_header(),
        }
    }

    /// Rebuild a store from a snapshot
    pub fn restore(client: ApiClient, notifier: Arc<dyn Notifier>, snapshot: SessionSnapshot) -> Self {
        if let Some(cookies) = &snapshot.cookies {
            client.restore_cookies(cookies);
        }
        client.set_csrf_token(snapshot.csrf);

        let mut store = Self::new(client, notifier);
        // A connection without a user is not a connection
        store.is_connected = snapshot.is_connected && snapshot.user.is_some();
        store.user = snapshot.user;
        store.connection_timestamp = snapshot.connection_timestamp;
        store
    }

    /// Write the session to `path`.
    ///
    /// The file holds the backend session cookie, so on unix it is readable
    /// by its owner only.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let json = serde_json::to_vec_pretty(&self.snapshot())?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(path).await?;
        file.write_all(&json).await?;
        file.flush().await?;

        // `mode` only applies when the file is created
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
        }

        debug!("Session saved to {}", path.display());
        Ok(())
    }

    /// Load the session from `path`.
    ///
    /// A missing or undecodable file gives a fresh session, so `login` can
    /// always overwrite it. Other IO errors are returned.
    pub async fn load(client: ApiClient, notifier: Arc<dyn Notifier>, path: &Path) -> Result<Self> {
        let snapshot = match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Ignoring unreadable session file {}: {}", path.display(), e);
                    SessionSnapshot::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SessionSnapshot::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self::restore(client, notifier, snapshot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::notify::NotificationQueue;
    use chrono::Duration;

    fn user(role: UserRole) -> User {
        serde_json::from_value(serde_json::json!({
            "id": 1,
            "username": "alice",
            "role": role.as_str(),
            "max_device_nb": 2
        }))
        .unwrap()
    }

    fn store(age_secs: u64) -> SessionStore {
        let mut config = Config::new("http://gate.lan").unwrap();
        config.session_cookie_age = std::time::Duration::from_secs(age_secs);
        let client = ApiClient::new(config).unwrap();
        SessionStore::new(client, Arc::new(NotificationQueue::new()))
    }

    #[test]
    fn test_expiry_threshold() {
        let mut session = store(3600);
        let t0 = Utc::now();
        session.user = Some(user(UserRole::Player));
        session.is_connected = true;
        session.connection_timestamp = Some(t0);

        assert!(!session.is_expired_at(t0 + Duration::seconds(3599)));
        assert!(!session.is_expired_at(t0 + Duration::seconds(3600)));
        assert!(session.is_expired_at(t0 + Duration::seconds(3601)));
        // Clock went backwards
        assert!(!session.is_expired_at(t0 - Duration::seconds(10)));
    }

    #[test]
    fn test_disconnected_never_expires() {
        let session = store(1);
        assert!(!session.is_expired_at(Utc::now() + Duration::days(30)));
    }

    #[test]
    fn test_role_requires_connection() {
        let mut session = store(60);
        session.user = Some(user(UserRole::Admin));
        assert_eq!(session.role(), None);
        session.is_connected = true;
        assert_eq!(session.role(), Some(UserRole::Admin));
    }

    #[test]
    fn test_restore_drops_connection_without_user() {
        let client = ApiClient::new(Config::new("http://gate.lan").unwrap()).unwrap();
        let snapshot = SessionSnapshot {
            is_connected: true,
            csrf: Some("tok".to_string()),
            ..Default::default()
        };
        let session = SessionStore::restore(client, Arc::new(NotificationQueue::new()), snapshot);
        assert!(!session.is_connected());
        assert_eq!(session.csrf().as_deref(), Some("tok"));
    }
}
