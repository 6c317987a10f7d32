use crate::storage::file_lock::{FileLock, FileLockGuard};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Session id to breadcrumb notes, in insertion order per session.
pub type NoteDocument = BTreeMap<String, Vec<String>>;

/// Breadcrumb notes persisted as a single JSON document.
///
/// The document is re-read before every read or mutation and rewritten in
/// full after every mutation. Load failures degrade to an empty document;
/// save failures are logged and swallowed, so an `add` can be lost silently.
pub struct NoteStore {
    path: PathBuf,
    lock: FileLock,
}

impl NoteStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = FileLock::for_document(&path);
        Self { path, lock }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire(&self, exclusive: bool) -> Option<FileLockGuard> {
        let guard = if exclusive {
            self.lock.lock_exclusive()
        } else {
            self.lock.lock_shared()
        };
        match guard {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!(path = ?self.lock.path(), error = %e, "proceeding without note lock");
                None
            }
        }
    }

    fn read_document(&self) -> Result<NoteDocument, crate::Error> {
        if !self.path.exists() {
            return Ok(NoteDocument::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    fn load_unlocked(&self) -> NoteDocument {
        self.read_document().unwrap_or_else(|e| {
            tracing::warn!(path = ?self.path, error = %e, "error loading notes");
            NoteDocument::new()
        })
    }

    /// Load the whole document.
    pub fn load(&self) -> NoteDocument {
        let _guard = self.acquire(false);
        self.load_unlocked()
    }

    /// Write the document via a temp file and rename.
    fn save(&self, document: &NoteDocument) -> Result<(), crate::Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(document)
            .map_err(|e| crate::Error::Persistence(e.to_string()))?;

        let mut temp_name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);

        let write_result = (|| -> Result<(), crate::Error> {
            let mut temp_file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;

            temp_file.write_all(content.as_bytes())?;
            temp_file.flush()?;
            temp_file.sync_all()?;
            Ok(())
        })();

        if let Err(e) = write_result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }

        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    /// Append a note and return how many notes the session now has.
    pub fn add(&self, session_id: &str, note: &str) -> usize {
        let _guard = self.acquire(true);

        let mut document = self.load_unlocked();
        let notes = document.entry(session_id.to_string()).or_default();
        notes.push(note.to_string());
        let total = notes.len();

        // TODO: surface save failures to the caller once the response shape can carry a warning.
        if let Err(e) = self.save(&document) {
            tracing::warn!(path = ?self.path, error = %e, "error saving notes");
        }

        total
    }

    /// Notes for one session, oldest first.
    pub fn get(&self, session_id: &str) -> Vec<String> {
        self.load().remove(session_id).unwrap_or_default()
    }
}
