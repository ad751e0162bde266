//! Auth sub-client: login, registration, session restore, logout.

use crate::auth::{LoginRequest, RegisterRequest, TokenResponse, User};
use crate::client::BlotterClient;
use crate::error::SyncError;

/// Sub-client for authentication operations.
pub struct Auth<'a> {
    pub(crate) client: &'a BlotterClient,
}

impl<'a> Auth<'a> {
    /// Log in with username and password.
    ///
    /// On success the token and profile are persisted, cached data from any
    /// previous user is dropped, and `SessionEvent::LoggedIn` is emitted.
    pub async fn login(&self, username: &str, password: &str) -> Result<User, SyncError> {
        let request = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let resp: TokenResponse = self.client.http.post("/api/auth/login", &request).await?;
        self.establish(resp)
    }

    /// Create an account and log in as it.
    pub async fn register(&self, request: &RegisterRequest) -> Result<User, SyncError> {
        let resp: TokenResponse = self
            .client
            .http
            .post("/api/auth/register", request)
            .await?;
        self.establish(resp)
    }

    /// Validate a persisted session at startup.
    ///
    /// Returns `None` without contacting the server when nothing is stored.
    /// Otherwise the token is checked against `GET /api/auth/me`; the fresh
    /// profile replaces the stored one, and any failure clears the session.
    pub async fn restore(&self) -> Result<Option<User>, SyncError> {
        let session = &self.client.session;
        if !session.is_authenticated() {
            return Ok(None);
        }

        match self.client.http.get::<User>("/api/auth/me").await {
            Ok(user) => {
                session.update_user(&user)?;
                tracing::info!(user = %user.username, "Session restored");
                Ok(Some(user))
            }
            Err(e) => {
                tracing::warn!("Stored session is no longer valid: {}", e);
                session.clear();
                self.client.cache.clear();
                Ok(None)
            }
        }
    }

    /// Fetch the current user's profile and refresh the stored copy.
    pub async fn me(&self) -> Result<User, SyncError> {
        let user: User = self.client.http.get("/api/auth/me").await?;
        self.client.session.update_user(&user)?;
        Ok(user)
    }

    /// The stored profile, without contacting the server.
    pub fn current_user(&self) -> Option<User> {
        self.client.session.user()
    }

    /// Forget the credential and every cached response.
    pub fn logout(&self) {
        self.client.session.clear();
        self.client.cache.clear();
    }

    fn establish(&self, resp: TokenResponse) -> Result<User, SyncError> {
        if !resp.token_type.eq_ignore_ascii_case("bearer") {
            tracing::warn!("Unexpected token type {:?}, using it as a bearer token", resp.token_type);
        }
        self.client.cache.clear();
        self.client
            .session
            .establish(&resp.access_token, &resp.user)?;
        tracing::info!(user = %resp.user.username, role = %resp.user.role, "Logged in");
        Ok(resp.user)
    }
}
