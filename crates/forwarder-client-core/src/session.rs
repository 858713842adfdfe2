//! Persistent client state: the verified phone, the chat-name lookup, the
//! subscription flag, and a process-scoped "code verified" marker.
//!
//! The long-lived fields survive restarts. The verified marker behaves like a
//! session cookie: it lives only as long as the store instance.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::input::mask_phone;

pub const SESSION_SCHEMA_VERSION: u32 = 1;
pub const SESSION_FILE_NAME: &str = "session.v1.json";
const APP_DIR_NAME: &str = "telegram-forwarder";
const LOG_TARGET: &str = "forwarder.session_store";

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session store io failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session store encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub chat_names: BTreeMap<String, String>,
    #[serde(default)]
    pub subscribed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl PersistedSession {
    #[must_use]
    pub fn phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

/// Snapshot of the active account as the flow controller sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub phone: Option<String>,
    pub verified: bool,
    pub subscribed: bool,
}

pub trait SessionStore: Send + Sync {
    /// Prepares backing storage. Safe to call more than once.
    fn init(&self) -> Result<(), SessionStoreError>;
    fn load_session(&self) -> Result<PersistedSession, SessionStoreError>;
    fn persist_session(&self, session: &PersistedSession) -> Result<(), SessionStoreError>;
    /// Drops every persisted field and the verified marker.
    fn clear_session(&self) -> Result<(), SessionStoreError>;
    fn verified_marker(&self) -> bool;
    fn set_verified_marker(&self, verified: bool);
}

/// Load, mutate, persist.
pub fn update_session<S>(
    store: &S,
    apply: impl FnOnce(&mut PersistedSession),
) -> Result<PersistedSession, SessionStoreError>
where
    S: SessionStore + ?Sized,
{
    let mut session = store.load_session()?;
    apply(&mut session);
    session.updated_at = Some(Utc::now().to_rfc3339());
    store.persist_session(&session)?;
    Ok(session)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionDocument {
    version: u32,
    session: PersistedSession,
}

#[derive(Debug)]
pub struct FileSessionStore {
    path: PathBuf,
    verified: AtomicBool,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            verified: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn load_default() -> Self {
        Self::new(default_session_path())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    fn io_error(&self, source: io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SessionStore for FileSessionStore {
    fn init(&self) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|error| self.io_error(error))?;
        }
        Ok(())
    }

    fn load_session(&self) -> Result<PersistedSession, SessionStoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(PersistedSession::default());
            }
            Err(error) => return Err(self.io_error(error)),
        };

        match serde_json::from_str::<SessionDocument>(&raw) {
            Ok(document) if document.version == SESSION_SCHEMA_VERSION => Ok(document.session),
            Ok(document) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    path = %self.path.display(),
                    version = document.version,
                    "unsupported session document version; starting from an empty session",
                );
                Ok(PersistedSession::default())
            }
            Err(error) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    path = %self.path.display(),
                    error = %error,
                    "failed to parse session document; starting from an empty session",
                );
                Ok(PersistedSession::default())
            }
        }
    }

    fn persist_session(&self, session: &PersistedSession) -> Result<(), SessionStoreError> {
        self.init()?;
        let payload = serde_json::to_vec_pretty(&SessionDocument {
            version: SESSION_SCHEMA_VERSION,
            session: session.clone(),
        })?;
        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, payload).map_err(|error| self.io_error(error))?;
        fs::rename(&temp_path, &self.path).map_err(|error| self.io_error(error))?;
        tracing::debug!(
            target: LOG_TARGET,
            path = %self.path.display(),
            phone = %session.phone().map(mask_phone).unwrap_or_default(),
            chats = session.chat_names.len(),
            "session persisted",
        );
        Ok(())
    }

    fn clear_session(&self) -> Result<(), SessionStoreError> {
        self.verified.store(false, Ordering::SeqCst);
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn verified_marker(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    fn set_verified_marker(&self, verified: bool) {
        self.verified.store(verified, Ordering::SeqCst);
    }
}

/// In-memory stand-in with the same semantics as the file store.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<PersistedSession>,
    verified: AtomicBool,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_session(session: PersistedSession) -> Self {
        Self {
            session: Mutex::new(session),
            verified: AtomicBool::new(false),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn init(&self) -> Result<(), SessionStoreError> {
        Ok(())
    }

    fn load_session(&self) -> Result<PersistedSession, SessionStoreError> {
        Ok(self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn persist_session(&self, session: &PersistedSession) -> Result<(), SessionStoreError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = session.clone();
        Ok(())
    }

    fn clear_session(&self) -> Result<(), SessionStoreError> {
        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = PersistedSession::default();
        self.verified.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn verified_marker(&self) -> bool {
        self.verified.load(Ordering::SeqCst)
    }

    fn set_verified_marker(&self, verified: bool) {
        self.verified.store(verified, Ordering::SeqCst);
    }
}

#[must_use]
pub fn default_session_path() -> PathBuf {
    if let Some(mut data_dir) = dirs::data_local_dir() {
        data_dir.push(APP_DIR_NAME);
        data_dir.push(SESSION_FILE_NAME);
        return data_dir;
    }

    if let Some(mut home_dir) = dirs::home_dir() {
        home_dir.push(format!(".{APP_DIR_NAME}"));
        home_dir.push(SESSION_FILE_NAME);
        return home_dir;
    }

    PathBuf::from(SESSION_FILE_NAME)
}
