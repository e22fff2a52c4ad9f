//! Client-side persisted state: the token pair and the selected database.
//!
//! Every mutation is written through to disk immediately so a crash or a
//! second instance sees the same state.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::models::{Database, TokenPair};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientState {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub refresh: Option<String>,
    #[serde(default)]
    pub selected_database: Option<Database>,
}

#[derive(Debug)]
pub struct ClientStore {
    path: Option<PathBuf>,
    state: ClientState,
}

pub type SharedStore = Arc<Mutex<ClientStore>>;

impl ClientStore {
    /// Opens the store at `path`. A missing or unreadable file starts empty.
    pub fn open(path: PathBuf) -> Self {
        let state = std::fs::read_to_string(&path)
            .ok()
            .and_then(|contents| match serde_json::from_str(&contents) {
                Ok(state) => Some(state),
                Err(e) => {
                    tracing::warn!("Ignoring corrupt client state {}: {}", path.display(), e);
                    None
                }
            })
            .unwrap_or_default();

        Self {
            path: Some(path),
            state,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: ClientState::default(),
        }
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(crate::config::app_dir()?.join("state.json"))
    }

    pub fn shared(self) -> SharedStore {
        Arc::new(Mutex::new(self))
    }

    pub fn access_token(&self) -> Option<&str> {
        self.state.access.as_deref()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.state.refresh.as_deref()
    }

    pub fn set_tokens(&mut self, tokens: &TokenPair) -> Result<()> {
        self.state.access = Some(tokens.access.clone());
        self.state.refresh = Some(tokens.refresh.clone());
        self.save()
    }

    pub fn set_access_token(&mut self, access: String) -> Result<()> {
        self.state.access = Some(access);
        self.save()
    }

    pub fn selected_database(&self) -> Option<&Database> {
        self.state.selected_database.as_ref()
    }

    pub fn select_database(&mut self, database: Option<Database>) -> Result<()> {
        self.state.selected_database = database;
        self.save()
    }

    /// Forgets everything, as on logout.
    pub fn clear(&mut self) -> Result<()> {
        self.state = ClientState::default();
        self.save()
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&self.state)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

/// Locks the shared store, recovering the data if a previous holder panicked.
pub fn lock(store: &SharedStore) -> MutexGuard<'_, ClientStore> {
    store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("nlsql-tui-{}-{}.json", name, std::process::id()))
    }

    #[test]
    fn tokens_survive_reopen() {
        let path = temp_path("tokens");
        let _ = std::fs::remove_file(&path);

        let mut store = ClientStore::open(path.clone());
        store
            .set_tokens(&TokenPair {
                access: "a1".into(),
                refresh: "r1".into(),
            })
            .unwrap();
        store.set_access_token("a2".into()).unwrap();

        let reopened = ClientStore::open(path.clone());
        assert_eq!(reopened.access_token(), Some("a2"));
        assert_eq!(reopened.refresh_token(), Some("r1"));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn clear_forgets_selection_and_tokens() {
        let mut store = ClientStore::in_memory();
        store.set_access_token("a".into()).unwrap();
        store.clear().unwrap();
        assert!(store.access_token().is_none());
        assert!(store.selected_database().is_none());
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").unwrap();
        let store = ClientStore::open(path.clone());
        assert!(store.access_token().is_none());
        std::fs::remove_file(&path).unwrap();
    }
}
