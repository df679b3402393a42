//! Persisted session cache.
//!
//! The stored role is advisory: it decides which commands are offered, while
//! the backend stays the authority on what a user may actually do. The store
//! is handed to commands explicitly instead of being read ad hoc.

use crate::types::Session;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error on session file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub struct SessionStore {
    path: PathBuf,
    current: Mutex<Option<Session>>,
}

impl SessionStore {
    /// Open the store at `path`. A missing file means "signed out"; a file
    /// that cannot be parsed is treated the same way and overwritten on the
    /// next login.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<Session>(&content) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Discarding unreadable session file");
                    None
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(source) => return Err(SessionError::Io { path, source }),
        };

        debug!(path = %path.display(), signed_in = current.is_some(), "Session store loaded");
        Ok(Self {
            path,
            current: Mutex::new(current),
        })
    }

    /// The cached session, if one is stored and still marked authenticated.
    pub fn get_session(&self) -> Option<Session> {
        self.lock().clone().filter(|s| s.authenticated)
    }

    pub fn set_session(&self, session: Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| SessionError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let payload = serde_json::to_string_pretty(&session)?;
        fs::write(&self.path, payload).map_err(|source| SessionError::Io {
            path: self.path.clone(),
            source,
        })?;

        *self.lock() = Some(session);
        Ok(())
    }

    pub fn clear_session(&self) -> Result<()> {
        *self.lock() = None;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn test_missing_file_means_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::load(dir.path().join("session.json")).unwrap();
        assert_eq!(store.get_session(), None);
    }

    #[test]
    fn test_session_survives_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = SessionStore::load(&path).unwrap();
        let mut session = Session::new("1234", Role::Teacher);
        session.subject = Some("Chemistry".to_string());
        store.set_session(session.clone()).unwrap();

        let reopened = SessionStore::load(&path).unwrap();
        assert_eq!(reopened.get_session(), Some(session));
    }

    #[test]
    fn test_clear_session_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::load(&path).unwrap();
        store.set_session(Session::new("20231", Role::Student)).unwrap();

        store.clear_session().unwrap();
        assert_eq!(store.get_session(), None);
        assert!(!path.exists());

        // clearing twice is fine
        store.clear_session().unwrap();
    }

    #[test]
    fn test_unauthenticated_record_is_not_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::load(dir.path().join("session.json")).unwrap();
        let mut session = Session::new("20231", Role::Student);
        session.authenticated = false;
        store.set_session(session).unwrap();
        assert_eq!(store.get_session(), None);
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let store = SessionStore::load(&path).unwrap();
        assert_eq!(store.get_session(), None);
    }
}
