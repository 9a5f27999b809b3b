use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const TOKEN_KEY: &str = "token";
pub const USER_KEY: &str = "user";
pub const STUDENT_TOKEN_KEY: &str = "studentToken";
pub const STUDENT_DATA_KEY: &str = "studentData";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot access session file {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("session file {path} is not a string map")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Key/value file holding the persisted login state, one string per key.
#[derive(Clone, Debug)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, SessionError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| SessionError::Format {
                path: self.path.clone(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionError> {
        let io_error = |source| SessionError::Io {
            path: self.path.clone(),
            source,
        };
        let bytes = serde_json::to_vec_pretty(entries).map_err(|source| SessionError::Format {
            path: self.path.clone(),
            source,
        })?;
        std::fs::write(&self.path, bytes).map_err(io_error)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), SessionError> {
        let mut entries = self.read()?;
        entries.insert(key.to_owned(), value.to_owned());
        self.write(&entries)
    }
}

/// Login state read once at start-up and handed to whoever talks to the API.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthSession {
    token: Option<String>,
    user: Option<String>,
    student_token: Option<String>,
    student_data: Option<String>,
}

impl AuthSession {
    pub fn init(storage: &SessionStorage) -> Result<Self, SessionError> {
        let mut entries = storage.read()?;
        let mut take = |key: &str| entries.remove(key).filter(|v| !v.is_empty());
        let session = Self {
            token: take(TOKEN_KEY),
            user: take(USER_KEY),
            student_token: take(STUDENT_TOKEN_KEY),
            student_data: take(STUDENT_DATA_KEY),
        };
        debug!(
            path = %storage.path().display(),
            authenticated = session.is_authenticated(),
            "session loaded"
        );
        Ok(session)
    }

    /// Forget every persisted key, as a logout does.
    pub fn clear(storage: &SessionStorage) -> Result<Self, SessionError> {
        match std::fs::remove_file(storage.path()) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(source) => {
                return Err(SessionError::Io {
                    path: storage.path().to_owned(),
                    source,
                });
            }
        }
        debug!(path = %storage.path().display(), "session cleared");
        Ok(Self::default())
    }

    #[cfg(test)]
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
            ..Self::default()
        }
    }

    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_student(&self) -> bool {
        self.student_token.is_some()
    }

    pub fn student_data(&self) -> Option<&str> {
        self.student_data.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_anonymous() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path().join("session.json"));
        let session = AuthSession::init(&storage).unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session, AuthSession::default());
    }

    #[test]
    fn test_init_then_clear() {
        let dir = tempfile::tempdir().unwrap();
        let storage = SessionStorage::new(dir.path().join("session.json"));
        storage.set(TOKEN_KEY, "abc").unwrap();
        storage.set(USER_KEY, r#"{"name":"admin"}"#).unwrap();
        let session = AuthSession::init(&storage).unwrap();
        assert_eq!(session.bearer_token(), Some("abc"));
        assert_eq!(session.user(), Some(r#"{"name":"admin"}"#));
        assert!(!session.is_student());

        let cleared = AuthSession::clear(&storage).unwrap();
        assert!(!cleared.is_authenticated());
        assert!(!AuthSession::init(&storage).unwrap().is_authenticated());
        // Clearing twice is harmless.
        AuthSession::clear(&storage).unwrap();
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            AuthSession::init(&SessionStorage::new(path)),
            Err(SessionError::Format { .. })
        ));
    }
}
