//! Current-session identity: one file holding the active session id.
//!
//! The store is an explicit object constructed once at the application root
//! and passed to consumers; the session id is the only state shared between
//! the sidebar and the timeline.

use anyhow::Result;
use std::path::{Path, PathBuf};

/// Persists the current session id as a plain string in one file
/// (e.g. `~/.kgchat/session_id`). Single writer; no locking needed.
#[derive(Debug, Clone)]
pub struct SessionIdStore {
    path: PathBuf,
}

impl SessionIdStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store rooted at the default config directory.
    pub fn default_store() -> Self {
        Self::new(crate::config::session_id_path(
            &crate::config::default_config_path(),
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session id. Missing or empty file => None.
    pub fn current(&self) -> Option<String> {
        let s = std::fs::read_to_string(&self.path).ok()?;
        let id = s.trim().to_string();
        if id.is_empty() {
            None
        } else {
            Some(id)
        }
    }

    /// Persist the given id, or clear the stored value when None.
    pub fn set_current(&self, id: Option<&str>) -> Result<()> {
        match id {
            Some(id) => {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&self.path, id)?;
            }
            None => {
                if self.path.exists() {
                    std::fs::remove_file(&self.path)?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> SessionIdStore {
        let dir = std::env::temp_dir().join(format!("kgchat-session-test-{}", uuid::Uuid::new_v4()));
        SessionIdStore::new(dir.join("session_id"))
    }

    #[test]
    fn missing_file_is_none() {
        let store = temp_store();
        assert_eq!(store.current(), None);
    }

    #[test]
    fn set_then_read_roundtrip() {
        let store = temp_store();
        store.set_current(Some("sess-abc")).unwrap();
        assert_eq!(store.current(), Some("sess-abc".to_string()));
        store.set_current(Some("sess-def")).unwrap();
        assert_eq!(store.current(), Some("sess-def".to_string()));
    }

    #[test]
    fn clear_removes_file() {
        let store = temp_store();
        store.set_current(Some("sess-abc")).unwrap();
        store.set_current(None).unwrap();
        assert_eq!(store.current(), None);
        assert!(!store.path().exists());
        // Clearing twice is a no-op, not an error.
        store.set_current(None).unwrap();
    }

    #[test]
    fn whitespace_only_file_is_none() {
        let store = temp_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "  \n").unwrap();
        assert_eq!(store.current(), None);
    }
}
