//! Authentication session.
//!
//! ```text
//! Unauthenticated ──login──▶ Authenticating ──ok──▶ Authenticated
//!        ▲                        │                      │
//!        │                      error                logout /
//!        │                        ▼               profile failure
//!        └──dismiss/retry── FailedAuthentication         │
//!        ◀───────────────────────────────────────────────┘
//! ```
//!
//! The session owns the in-memory profile and login state. Base URL, token
//! and user id belong to the injected [`CredentialStore`]; they are written
//! together only after a successful login and cleared only by [`logout`].
//! A failed login points the client back at the server it used before, so
//! the previous session keeps working.
//!
//! [`logout`]: AuthenticationSession::logout

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::{
    User,
    async_result::AsyncResult,
    cache::Cache,
    error::{NetworkError, SessionError},
    repository::user::{UserRepository, UserSource},
};
use credentials::{Credential, CredentialStore, Credentials};

pub mod credentials;
pub mod server;

/// Endpoint configuration the session needs on top of the user endpoints.
pub trait AuthApi: UserSource {
    fn base_url(&self) -> Option<String>;

    fn set_base_url(&self, base_url: &str) -> Result<(), NetworkError>;

    fn set_token(&self, token: Option<&str>);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticating,
    FailedAuthentication,
    Authenticated,
}

/// What observers of the session see.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSnapshot {
    pub state: AuthState,
    pub user: AsyncResult<User, SessionError>,
    pub current_user: Option<User>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            state: AuthState::Unauthenticated,
            user: AsyncResult::Empty,
            current_user: None,
        }
    }
}

pub struct AuthenticationSession<A, C> {
    api: Arc<A>,
    users: UserRepository<A>,
    credentials: Arc<C>,
    cache: Option<Arc<Cache>>,
    snapshot: watch::Sender<SessionSnapshot>,
    // Login, registration and profile loads run one at a time.
    serial: Mutex<()>,
}

impl<A, C> AuthenticationSession<A, C>
where
    A: AuthApi,
    C: CredentialStore,
{
    pub fn new(api: Arc<A>, credentials: Arc<C>, cache: Option<Arc<Cache>>) -> Self {
        let (snapshot, _) = watch::channel(SessionSnapshot::default());
        Self {
            users: UserRepository::new(Arc::clone(&api), cache.clone()),
            api,
            credentials,
            cache,
            snapshot,
            serial: Mutex::new(()),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn state(&self) -> AuthState {
        self.snapshot.borrow().state
    }

    pub fn user(&self) -> AsyncResult<User, SessionError> {
        self.snapshot.borrow().user.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot.borrow().current_user.clone()
    }

    pub fn users(&self) -> &UserRepository<A> {
        &self.users
    }

    /// Logs in and loads the profile of the logged in user.
    pub async fn login(
        &self,
        server: &str,
        username: &str,
        password: &str,
    ) -> Result<User, SessionError> {
        let _serial = self.serial.lock().await;
        let previous = self.api.base_url();
        self.login_serialized(server, username, password, previous).await
    }

    /// Registers a new account and then logs in with it.
    ///
    /// A password mismatch fails before anything is sent to the server.
    pub async fn register(
        &self,
        server: &str,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<User, SessionError> {
        if password != confirm_password {
            self.snapshot
                .send_modify(|s| s.user.fail(SessionError::PasswordMismatch));
            return Err(SessionError::PasswordMismatch);
        }

        let _serial = self.serial.lock().await;
        let previous = self.api.base_url();
        let base_url = match self.point_at(server) {
            Ok(base_url) => base_url,
            Err(err) => return Err(self.fail_authentication(err, previous)),
        };

        self.begin_authentication();
        tracing::info!("registering {username} on {base_url}");
        if let Err(err) = self.users.register(username, email, password).await {
            tracing::warn!("registration failed: {err}");
            return Err(self.fail_authentication(err.into(), previous));
        }

        self.login_serialized(server, username, password, previous).await
    }

    /// Loads the profile of the stored user id.
    ///
    /// Fails with [`SessionError::Unauthenticated`] without any network call
    /// when no user id is stored. A failed load ends the in-memory session
    /// but keeps the stored token, so the load can be retried.
    pub async fn load_profile(&self) -> Result<User, SessionError> {
        let _serial = self.serial.lock().await;
        self.load_profile_serialized().await
    }

    /// Configures the client from the stored credentials and loads the
    /// profile if a user id is stored.
    pub async fn restore(&self) -> Result<User, SessionError> {
        let _serial = self.serial.lock().await;

        let base_url = self.credentials.get(Credential::BaseUrl);
        if !base_url.is_empty() {
            self.api.set_base_url(&base_url)?;
        }
        let token = self.credentials.get(Credential::Token);
        self.api.set_token(Some(token.as_str()).filter(|t| !t.is_empty()));

        self.load_profile_serialized().await
    }

    /// Forgets the token and user id, keeping the server address.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let _serial = self.serial.lock().await;

        self.credentials.set_all(&Credentials {
            base_url: self.credentials.get(Credential::BaseUrl),
            ..Credentials::default()
        })?;
        self.api.set_token(None);
        if let Some(cache) = &self.cache {
            cache.clear();
        }
        self.snapshot.send_replace(SessionSnapshot::default());
        tracing::info!("logged out");
        Ok(())
    }

    /// Leaves [`AuthState::FailedAuthentication`] after the error was shown.
    pub fn dismiss_failure(&self) {
        self.snapshot.send_if_modified(|s| {
            if s.state != AuthState::FailedAuthentication {
                return false;
            }
            s.state = AuthState::Unauthenticated;
            s.user.reset();
            true
        });
    }

    /// `previous` is the server the client used before this attempt.
    async fn login_serialized(
        &self,
        server: &str,
        username: &str,
        password: &str,
        previous: Option<String>,
    ) -> Result<User, SessionError> {
        let base_url = match self.point_at(server) {
            Ok(base_url) => base_url,
            Err(err) => return Err(self.fail_authentication(err, previous)),
        };

        self.begin_authentication();
        tracing::info!("logging in {username} on {base_url}");
        let response = match self.users.login(username, password).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!("login failed: {err}");
                return Err(self.fail_authentication(err.into(), previous));
            }
        };

        let persisted = self.credentials.set_all(&Credentials {
            base_url,
            token: response.token.clone(),
            user_id: response.user_id.clone(),
        });
        if let Err(err) = persisted {
            tracing::warn!("could not store credentials: {err}");
            return Err(self.fail_authentication(err, previous));
        }
        self.api.set_token(Some(response.token.as_str()));

        self.load_profile_serialized().await
    }

    async fn load_profile_serialized(&self) -> Result<User, SessionError> {
        let user_id = self.credentials.get(Credential::UserId);
        if user_id.is_empty() {
            self.end_session(SessionError::Unauthenticated);
            return Err(SessionError::Unauthenticated);
        }

        self.begin_authentication();
        match self.users.refresh(&user_id).await {
            Ok(user) => {
                tracing::info!("authenticated as {}", user.username);
                self.snapshot.send_modify(|s| {
                    s.state = AuthState::Authenticated;
                    s.user.succeed(user.clone());
                    s.current_user = Some(user.clone());
                });
                Ok(user)
            }
            Err(err) => {
                tracing::warn!("failed to load profile {user_id}: {err}");
                let err = SessionError::from(err);
                self.end_session(err.clone());
                Err(err)
            }
        }
    }

    /// Normalizes `server` and points the client at it.
    fn point_at(&self, server: &str) -> Result<String, SessionError> {
        let base_url = server::normalize_server(server)?;
        self.api.set_base_url(&base_url)?;
        Ok(base_url)
    }

    fn begin_authentication(&self) {
        self.snapshot.send_modify(|s| {
            s.state = AuthState::Authenticating;
            s.user.start();
        });
    }

    /// The previous server stays in use, and with it the token and profile
    /// of any session that was active before the attempt.
    fn fail_authentication(&self, err: SessionError, previous: Option<String>) -> SessionError {
        if let Some(previous) = previous {
            if let Err(restore) = self.api.set_base_url(&previous) {
                tracing::warn!("could not switch back to {previous}: {restore}");
            }
        }
        self.snapshot.send_modify(|s| {
            s.state = AuthState::FailedAuthentication;
            s.user.fail(err.clone());
        });
        err
    }

    fn end_session(&self, err: SessionError) {
        self.snapshot.send_modify(|s| {
            s.state = AuthState::Unauthenticated;
            s.user.fail(err);
            s.current_user = None;
        });
    }
}
