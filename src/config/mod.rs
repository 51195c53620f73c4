use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::poller::FailurePolicy;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub api: ApiConfig,
    pub poll: PollSettings,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub page_limit: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    pub job_interval_ms: u64,
    pub active_interval_ms: u64,
    pub failure_policy: FailurePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub cookie_secure: bool,
    pub default_locale: String,
}

impl ApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl PollSettings {
    pub fn job_interval(&self) -> Duration {
        Duration::from_millis(self.job_interval_ms)
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_millis(self.active_interval_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // API overrides
        if let Ok(v) = env::var("ELPIX_API_URL") {
            self.api.base_url = v.trim_end_matches('/').to_string();
        }
        if let Ok(v) = env::var("HTTP_TIMEOUT_SECS") {
            self.api.request_timeout_secs = v.parse().unwrap_or(self.api.request_timeout_secs);
        }
        if let Ok(v) = env::var("API_PAGE_LIMIT") {
            self.api.page_limit = v.parse().unwrap_or(self.api.page_limit);
        }

        // Poll overrides
        if let Ok(v) = env::var("POLL_JOB_INTERVAL_MS") {
            self.poll.job_interval_ms = v.parse().unwrap_or(self.poll.job_interval_ms);
        }
        if let Ok(v) = env::var("POLL_ACTIVE_INTERVAL_MS") {
            self.poll.active_interval_ms = v.parse().unwrap_or(self.poll.active_interval_ms);
        }
        if let Ok(v) = env::var("POLL_FAILURE_POLICY") {
            self.poll.failure_policy = match v.as_str() {
                "keep" | "keep-polling" | "continue" => FailurePolicy::KeepPolling,
                "stop" => FailurePolicy::Stop,
                _ => self.poll.failure_policy,
            };
        }

        // Session overrides
        if let Ok(v) = env::var("COOKIE_SECURE") {
            self.session.cookie_secure = v.parse().unwrap_or(self.session.cookie_secure);
        }
        if let Ok(v) = env::var("DEFAULT_LOCALE") {
            self.session.default_locale = v;
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            api: ApiConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_secs: 30,
                page_limit: 10,
            },
            poll: PollSettings {
                job_interval_ms: 5_000,
                active_interval_ms: 10_000,
                failure_policy: FailurePolicy::Stop,
            },
            session: SessionConfig {
                cookie_secure: false,
                default_locale: "en".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            api: ApiConfig {
                base_url: "https://staging-api.elpix.ai".to_string(),
                request_timeout_secs: 30,
                page_limit: 10,
            },
            poll: PollSettings {
                job_interval_ms: 5_000,
                active_interval_ms: 10_000,
                failure_policy: FailurePolicy::Stop,
            },
            session: SessionConfig {
                cookie_secure: true,
                default_locale: "en".to_string(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            api: ApiConfig {
                base_url: "https://api.elpix.ai".to_string(),
                request_timeout_secs: 60,
                page_limit: 10,
            },
            poll: PollSettings {
                job_interval_ms: 5_000,
                active_interval_ms: 10_000,
                failure_policy: FailurePolicy::Stop,
            },
            session: SessionConfig {
                cookie_secure: true,
                default_locale: "en".to_string(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
