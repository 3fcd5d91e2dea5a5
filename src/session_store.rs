//! File-backed session persistence
//!
//! One pretty-printed JSON file per session, named
//! `YYYYMMDD_HHMMSS_<id prefix>.json` so directory order follows creation
//! time. Every save rewrites the whole file.

use crate::session::Session;
use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

const ID_PREFIX_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("session storage I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("session file {path} is not valid: {source}")]
    Serde {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no session matching '{0}'")]
    NotFound(String),
    #[error("'{0}' matches more than one session")]
    Ambiguous(String),
}

/// Listing entry, enough to pick a session without loading every turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub turn_count: usize,
    pub path: PathBuf,
}

/// Directory of session files
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn io_err(path: &Path) -> impl FnOnce(io::Error) -> SessionStoreError + '_ {
        move |source| SessionStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// File that holds (or will hold) the given session
    pub fn path_for(&self, session: &Session) -> PathBuf {
        let prefix: String = session.id.chars().take(ID_PREFIX_LEN).collect();
        self.dir.join(format!(
            "{}_{prefix}.json",
            session.created_at.format("%Y%m%d_%H%M%S")
        ))
    }

    /// Write the full session, replacing any previous version.
    pub fn save(&self, session: &Session) -> Result<PathBuf, SessionStoreError> {
        fs::create_dir_all(&self.dir).map_err(Self::io_err(&self.dir))?;

        let path = self.path_for(session);
        let json = serde_json::to_string_pretty(session).map_err(|source| {
            SessionStoreError::Serde {
                path: path.clone(),
                source,
            }
        })?;

        // Write beside the target then rename, so a crash never leaves half a file
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(Self::io_err(&tmp))?;
        fs::rename(&tmp, &path).map_err(Self::io_err(&path))?;

        tracing::debug!(session = %session.id, path = %path.display(), "Session saved");
        Ok(path)
    }

    fn read(path: &Path) -> Result<Session, SessionStoreError> {
        let data = fs::read_to_string(path).map_err(Self::io_err(path))?;
        serde_json::from_str(&data).map_err(|source| SessionStoreError::Serde {
            path: path.to_path_buf(),
            source,
        })
    }

    fn session_files(&self) -> Result<Vec<PathBuf>, SessionStoreError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_err(&self.dir)(e)),
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        files.sort();
        Ok(files)
    }

    /// Every readable session, most recently updated first. Corrupt files are
    /// skipped with a warning.
    pub fn list(&self) -> Result<Vec<SessionSummary>, SessionStoreError> {
        let mut summaries: Vec<SessionSummary> = self
            .session_files()?
            .into_iter()
            .filter_map(|path| match Self::read(&path) {
                Ok(session) => Some(SessionSummary {
                    turn_count: session.turns().len(),
                    id: session.id,
                    title: session.title,
                    created_at: session.created_at,
                    updated_at: session.updated_at,
                    path,
                }),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable session file");
                    None
                }
            })
            .collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(summaries)
    }

    /// Load by full id or unique id prefix.
    pub fn load(&self, id_or_prefix: &str) -> Result<Session, SessionStoreError> {
        let wanted = id_or_prefix.trim();
        if wanted.is_empty() {
            return Err(SessionStoreError::NotFound(String::new()));
        }

        let matches: Vec<SessionSummary> = self
            .list()?
            .into_iter()
            .filter(|s| s.id.starts_with(wanted))
            .collect();

        match matches.as_slice() {
            [] => Err(SessionStoreError::NotFound(wanted.to_string())),
            [only] => Self::read(&only.path),
            _ => match matches.iter().find(|s| s.id == wanted) {
                Some(exact) => Self::read(&exact.path),
                None => Err(SessionStoreError::Ambiguous(wanted.to_string())),
            },
        }
    }

    /// The most recently updated session, if any
    pub fn latest(&self) -> Result<Option<Session>, SessionStoreError> {
        match self.list()?.first() {
            Some(summary) => Self::read(&summary.path).map(Some),
            None => Ok(None),
        }
    }

    pub fn delete(&self, id_or_prefix: &str) -> Result<(), SessionStoreError> {
        let session = self.load(id_or_prefix)?;
        let path = self.path_for(&session);
        fs::remove_file(&path).map_err(Self::io_err(&path))
    }
}
