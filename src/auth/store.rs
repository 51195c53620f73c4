use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use super::state::ClientState;
use crate::error::ClientResult;

/// Where the client state lives between runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> ClientResult<ClientState>;
    fn save(&self, state: &ClientState) -> ClientResult<()>;
}

/// JSON file store, one object of cookie name to string value
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> ClientResult<ClientState> {
        if !self.path.exists() {
            return Ok(ClientState::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ClientState::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn save(&self, state: &ClientState) -> ClientResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

/// Process-local store, used by tests and embedders that persist elsewhere
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    state: Mutex<ClientState>,
}

impl MemorySessionStore {
    pub fn new(state: ClientState) -> Self {
        Self {
            state: Mutex::new(state),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> ClientResult<ClientState> {
        Ok(self.state.lock().map(|s| s.clone()).unwrap_or_default())
    }

    fn save(&self, state: &ClientState) -> ClientResult<()> {
        if let Ok(mut guard) = self.state.lock() {
            *guard = state.clone();
        }
        Ok(())
    }
}
