use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::expiry::{self, now_ms};
use super::state::ClientState;
use super::store::SessionStore;
use crate::api::response::read_envelope;
use crate::error::{ClientError, ClientResult};
use crate::models::User;

/// Token material returned by `POST /api/v1/login`
#[derive(Debug, Clone)]
pub struct LoginData {
    pub token: String,
    pub refresh_token: String,
    pub expired_token: Option<String>,
    pub user: Option<User>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenPayload {
    token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expired_token: Option<Value>,
}

impl TokenPayload {
    // `expiredToken` is usually a duration string, occasionally a bare number
    fn expired_token(&self) -> Option<String> {
        match &self.expired_token {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Owns the bearer token for every request issuer.
///
/// The state lock is held for the whole refresh, so concurrent callers that
/// find the token expired wait for the one in-flight refresh and then reuse
/// its result instead of refreshing again.
pub struct TokenManager {
    http: Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
    state: Mutex<ClientState>,
}

impl TokenManager {
    pub fn new(http: Client, base_url: impl Into<String>, store: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let state = store.load()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            store,
            state: Mutex::new(state),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Copy of the current client state
    pub async fn state(&self) -> ClientState {
        self.state.lock().await.clone()
    }

    pub async fn current_user(&self) -> Option<User> {
        self.state.lock().await.user()
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<LoginData> {
        let url = format!("{}/api/v1/login", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;

        let envelope = read_envelope::<Value>(response).await?;
        let message = envelope.message_or_default();
        let data = envelope
            .data
            .ok_or_else(|| ClientError::invalid_response("Missing login data"))?;

        let payload: TokenPayload = serde_json::from_value(data.clone())?;
        let refresh_token = payload
            .refresh_token
            .clone()
            .ok_or_else(|| ClientError::invalid_response("Missing refresh token"))?;
        let expired_token = payload.expired_token();
        // The profile fields sit next to the tokens
        let user = serde_json::from_value::<User>(data).ok();

        let expires_at = Self::expiry_for(&payload.token, expired_token.as_deref(), now_ms());

        let mut state = self.state.lock().await;
        state.set_login(&payload.token, &refresh_token, expires_at, user.as_ref());
        self.store.save(&state)?;

        tracing::info!(username, expires_at, "logged in");

        Ok(LoginData {
            token: payload.token,
            refresh_token,
            expired_token,
            user,
            message,
        })
    }

    /// A usable bearer token, refreshed first when the stored one has expired
    pub async fn bearer(&self) -> ClientResult<String> {
        let mut state = self.state.lock().await;
        let token = state
            .token()
            .map(str::to_string)
            .ok_or(ClientError::Unauthenticated)?;

        if state.is_token_expired(now_ms()) {
            tracing::debug!("access token expired, refreshing");
            return self.refresh_locked(&mut state).await;
        }

        Ok(token)
    }

    /// Refresh regardless of the stored expiry
    pub async fn refresh(&self) -> ClientResult<String> {
        let mut state = self.state.lock().await;
        if !state.is_logged_in() && state.refresh_token().is_none() {
            return Err(ClientError::Unauthenticated);
        }
        self.refresh_locked(&mut state).await
    }

    pub async fn logout(&self) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        state.clear_auth();
        self.store.save(&state)?;
        tracing::info!("logged out");
        Ok(())
    }

    pub async fn set_locale(&self, locale: &str) -> ClientResult<()> {
        let mut state = self.state.lock().await;
        state.set_locale(locale);
        self.store.save(&state)
    }

    async fn refresh_locked(&self, state: &mut ClientState) -> ClientResult<String> {
        let Some(refresh_token) = state.refresh_token().map(str::to_string) else {
            return Err(self.expire(state, "No refresh token found"));
        };

        let url = format!("{}/api/v1/refresh-token", self.base_url);
        let result: ClientResult<Option<TokenPayload>> = async {
            let response = self
                .http
                .post(&url)
                .json(&json!({ "refreshToken": refresh_token }))
                .send()
                .await?;
            Ok(read_envelope::<TokenPayload>(response).await?.data)
        }
        .await;

        let payload = match result {
            Ok(Some(payload)) if !payload.token.is_empty() => payload,
            Ok(_) => return Err(self.expire(state, "Refresh returned an empty token")),
            Err(e) if e.rejects_credentials() => return Err(self.expire(state, &e.to_string())),
            Err(e) => {
                // Transport and server errors leave the session for a later retry
                tracing::warn!(error = %e, "token refresh failed, session kept");
                return Err(e);
            }
        };

        let expires_at = Self::expiry_for(&payload.token, payload.expired_token().as_deref(), now_ms());
        state.set_token(&payload.token, expires_at);
        self.store.save(state)?;

        tracing::info!(expires_at, "access token refreshed");
        Ok(payload.token)
    }

    // Unrecoverable refresh failure: forget the session so the user logs in again
    fn expire(&self, state: &mut ClientState, reason: &str) -> ClientError {
        tracing::warn!(reason, "token refresh failed, clearing session");
        state.clear_auth();
        if let Err(e) = self.store.save(state) {
            tracing::error!(error = %e, "failed to persist cleared session");
        }
        ClientError::SessionExpired(reason.to_string())
    }

    fn expiry_for(token: &str, expired_token: Option<&str>, now: i64) -> i64 {
        match expired_token {
            Some(raw) if !raw.trim().is_empty() => expiry::expires_at(raw, now),
            _ => expiry::jwt_expires_at(token).unwrap_or(0),
        }
    }
}
