use serde::Serialize;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(
        "Session \"{0}\" not found. Use search_memory() or list_recent() to find valid session IDs."
    )]
    SessionNotFound(String),

    #[error("Session file not found on disk: {}", .0.display())]
    SourceMissing(PathBuf),

    #[error(
        "Chapter {requested} not found. This session has {} chapters: [{}]",
        .available.len(),
        .available.join(", ")
    )]
    ChapterOutOfRange {
        requested: usize,
        available: Vec<String>,
    },

    #[error("Turn {requested} out of range. This session has {total} user turns.")]
    TurnOutOfRange { requested: usize, total: usize },

    #[error(
        "Specify how to navigate: chapter=N, turn=N, or start/end range. Use list_chapters() first to see available chapters."
    )]
    NoNavigation,

    #[error("Failed to extract {}: {reason}", .path.display())]
    Extraction { path: PathBuf, reason: String },

    #[error("Note persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lock error")]
    Lock,
}

/// Caller-facing failure classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    OutOfRange,
    InvalidRequest,
    ExtractionFailure,
    PersistenceFailure,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SessionNotFound(_) | Error::SourceMissing(_) => ErrorKind::NotFound,
            Error::ChapterOutOfRange { .. } | Error::TurnOutOfRange { .. } => ErrorKind::OutOfRange,
            Error::NoNavigation => ErrorKind::InvalidRequest,
            Error::Extraction { .. } => ErrorKind::ExtractionFailure,
            Error::Persistence(_) => ErrorKind::PersistenceFailure,
            Error::Io(_) | Error::Json(_) | Error::Lock => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Lock a mutex, converting a poisoned-lock panic into `Error::Lock`.
pub fn lock_mutex<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    mutex.lock().map_err(|_| Error::Lock)
}
