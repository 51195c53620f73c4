use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ability::AbilityContext;
use crate::api::ApiClient;
use crate::auth::{FileSessionStore, SessionStore};
use crate::config::config;
use crate::models::User;

pub const SESSION_FILE: &str = "session.json";

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("ELPIX_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("elpix").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn session_store() -> anyhow::Result<Arc<dyn SessionStore>> {
    let path = get_config_dir()?.join(SESSION_FILE);
    Ok(Arc::new(FileSessionStore::new(path)))
}

/// Client against the configured backend, backed by the on-disk session
pub fn connect() -> anyhow::Result<ApiClient> {
    let settings = config();
    if crate::is_production!() && !settings.api.base_url.starts_with("https://") {
        tracing::warn!(base_url = %settings.api.base_url, "production backend is not using https");
    }
    let client = ApiClient::new(&settings.api.base_url, session_store()?, settings)?;
    Ok(client)
}

/// Logged-in user plus the ability derived from their role
pub struct Session {
    pub client: ApiClient,
    pub user: User,
    pub ability: AbilityContext<ApiClient>,
}

impl Session {
    pub async fn open() -> anyhow::Result<Self> {
        let client = connect()?;
        let user = client
            .tokens()
            .current_user()
            .await
            .ok_or_else(|| anyhow::anyhow!("Not logged in. Run `elpix auth login <username>` first"))?;

        let ability = AbilityContext::load(Arc::new(client.clone()), user.role_id.clone()).await?;

        Ok(Self { client, user, ability })
    }

    pub fn can(&self, action: &str, subject: &str) -> bool {
        self.ability.can(action, subject)
    }
}
