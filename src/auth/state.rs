use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::expiry;
use crate::models::User;

pub const TOKEN: &str = "token";
pub const REFRESH_TOKEN: &str = "refresh_token";
pub const EXPIRED_TOKEN: &str = "expired_token";
pub const USER: &str = "user";
pub const LOCALE: &str = "locale";

const AUTH_COOKIES: [&str; 4] = [TOKEN, REFRESH_TOKEN, EXPIRED_TOKEN, USER];

/// Persisted client state: the same string-valued cookie set the dashboard
/// keeps in the browser (`token`, `refresh_token`, `expired_token` as UNIX ms,
/// `user` as JSON, `locale`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientState {
    cookies: BTreeMap<String, String>,
}

/// Attributes applied when the state is rendered as cookies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: String,
    pub same_site: &'static str,
    pub secure: bool,
}

impl CookieOptions {
    pub fn new(secure: bool) -> Self {
        Self {
            path: "/".to_string(),
            same_site: "Strict",
            secure,
        }
    }
}

impl ClientState {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str).filter(|v| !v.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.get(TOKEN)
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.get(REFRESH_TOKEN)
    }

    /// Token expiry in UNIX ms; `0` when unknown or unparseable
    pub fn expires_at(&self) -> i64 {
        self.get(EXPIRED_TOKEN)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    pub fn is_token_expired(&self, now: i64) -> bool {
        expiry::is_expired(self.expires_at(), now)
    }

    /// Stored profile; a corrupt value reads as no user
    pub fn user(&self) -> Option<User> {
        self.get(USER).and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn locale(&self) -> Option<&str> {
        self.get(LOCALE)
    }

    pub fn is_logged_in(&self) -> bool {
        self.token().is_some()
    }

    pub fn set_login(&mut self, token: &str, refresh_token: &str, expires_at: i64, user: Option<&User>) {
        self.set_token(token, expires_at);
        self.cookies.insert(REFRESH_TOKEN.into(), refresh_token.to_string());
        match user.and_then(|u| serde_json::to_string(u).ok()) {
            Some(json) => {
                self.cookies.insert(USER.into(), json);
            }
            None => {
                self.cookies.remove(USER);
            }
        }
    }

    pub fn set_token(&mut self, token: &str, expires_at: i64) {
        self.cookies.insert(TOKEN.into(), token.to_string());
        self.cookies.insert(EXPIRED_TOKEN.into(), expires_at.to_string());
    }

    pub fn set_locale(&mut self, locale: &str) {
        self.cookies.insert(LOCALE.into(), locale.to_string());
    }

    /// Drop every auth value; the locale survives logout
    pub fn clear_auth(&mut self) {
        for name in AUTH_COOKIES {
            self.cookies.remove(name);
        }
    }

    /// Render as `Set-Cookie` header values. Auth cookies carry a `Max-Age`
    /// matching the token expiry when one is known.
    pub fn set_cookie_headers(&self, options: &CookieOptions, now: i64) -> Vec<String> {
        let max_age = match self.expires_at() {
            0 => None,
            at => Some(((at - now) / 1000).max(0)),
        };

        self.cookies
            .iter()
            .map(|(name, value)| {
                let mut cookie = format!(
                    "{}={}; Path={}; SameSite={}",
                    name,
                    url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>(),
                    options.path,
                    options.same_site
                );
                if AUTH_COOKIES.contains(&name.as_str()) {
                    if let Some(secs) = max_age {
                        cookie.push_str(&format!("; Max-Age={}", secs));
                    }
                }
                if options.secure {
                    cookie.push_str("; Secure");
                }
                cookie
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User {
            id: "u-1".into(),
            username: "rina".into(),
            fullname: "Rina S".into(),
            phone: String::new(),
            email: "rina@example.com".into(),
            avatar_file: None,
            role: "Operator".into(),
            role_id: "r-7".into(),
            is_active: true,
        }
    }

    #[test]
    fn login_round_trips_through_cookie_strings() {
        let mut state = ClientState::default();
        state.set_login("tok", "ref", 5_000, Some(&user()));

        let json = serde_json::to_string(&state).unwrap();
        let back: ClientState = serde_json::from_str(&json).unwrap();

        assert_eq!(back.token(), Some("tok"));
        assert_eq!(back.refresh_token(), Some("ref"));
        assert_eq!(back.expires_at(), 5_000);
        assert_eq!(back.user().unwrap().role_id, "r-7");
        assert!(back.is_token_expired(5_000));
        assert!(!back.is_token_expired(4_999));
    }

    #[test]
    fn logout_keeps_locale() {
        let mut state = ClientState::default();
        state.set_locale("id");
        state.set_login("tok", "ref", 0, None);
        state.clear_auth();

        assert!(!state.is_logged_in());
        assert!(state.user().is_none());
        assert_eq!(state.locale(), Some("id"));
    }

    #[test]
    fn garbage_expiry_reads_as_unknown() {
        let state: ClientState =
            serde_json::from_str(r#"{"token":"t","expired_token":"tomorrow"}"#).unwrap();
        assert_eq!(state.expires_at(), 0);
        assert!(!state.is_token_expired(i64::MAX));
    }

    #[test]
    fn cookie_headers_carry_attributes() {
        let mut state = ClientState::default();
        state.set_token("abc", 61_000);
        state.set_locale("en");

        let headers = state.set_cookie_headers(&CookieOptions::new(true), 1_000);
        let token = headers.iter().find(|h| h.starts_with("token=")).unwrap();
        assert!(token.contains("Path=/"));
        assert!(token.contains("SameSite=Strict"));
        assert!(token.contains("Max-Age=60"));
        assert!(token.ends_with("; Secure"));

        let locale = headers.iter().find(|h| h.starts_with("locale=")).unwrap();
        assert!(!locale.contains("Max-Age"));
    }
}
