use crate::constants::{MAX_CHAPTER_COMMANDS, MAX_CHAPTER_URLS};
use crate::error::lock_mutex;
use crate::extract::{SessionExtractor, SnowballStemmer, Stemmer, TranscriptExtractor};
use crate::navigate::NavigationEngine;
use crate::search::SearchEngine;
use crate::storage::transcript;
use crate::storage::{NoteStore, SessionRecordStore};
use crate::types::{
    ChapterListing, Config, MessageWindow, NoteAdded, PendingItem, ReadRequest, RecentOptions,
    RefreshReport, SearchOptions, SearchResponse, SessionSummary, TodoStatus,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Retrieval engine over a directory of session transcripts.
///
/// Every read operation first brings the record cache up to date with the
/// transcripts on disk. Notes live in a separate JSON document and are
/// re-read on each access, so several processes can share one notes file.
pub struct Retrace {
    config: Config,
    store: Mutex<SessionRecordStore>,
    notes: NoteStore,
    search: SearchEngine,
    navigation: NavigationEngine,
}

impl Retrace {
    pub fn new(config: Config) -> Self {
        Self::with_stemmer(config, Arc::new(SnowballStemmer::english()))
    }

    /// Use `stemmer` for both extraction and query normalization.
    pub fn with_stemmer(config: Config, stemmer: Arc<dyn Stemmer>) -> Self {
        let extractor = TranscriptExtractor::new(Arc::clone(&stemmer));
        Self::with_extractor(config, Box::new(extractor), stemmer)
    }

    /// Plug in a custom extraction algorithm. `stemmer` must normalize query
    /// text the same way the extractor normalized the stored stems.
    pub fn with_extractor(
        config: Config,
        extractor: Box<dyn SessionExtractor>,
        stemmer: Arc<dyn Stemmer>,
    ) -> Self {
        Self {
            store: Mutex::new(SessionRecordStore::new(&config.projects_path, extractor)),
            notes: NoteStore::new(&config.notes_path),
            search: SearchEngine::new(stemmer),
            navigation: NavigationEngine::new(),
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lock the record cache after re-extracting anything stale.
    fn fresh_store(&self) -> Result<MutexGuard<'_, SessionRecordStore>, crate::Error> {
        let mut store = lock_mutex(&self.store)?;
        let report = store.ensure_fresh();
        log_report(&report);
        Ok(store)
    }

    /// Run a freshness pass and report what it did.
    pub async fn refresh(&self) -> Result<RefreshReport, crate::Error> {
        let mut store = lock_mutex(&self.store)?;
        let report = store.ensure_fresh();
        log_report(&report);
        Ok(report)
    }

    pub async fn list_recent(
        &self,
        options: RecentOptions,
    ) -> Result<Vec<SessionSummary>, crate::Error> {
        let store = self.fresh_store()?;
        let notes = self.notes.load();
        Ok(self.search.recent(store.get_all(), &notes, &options))
    }

    pub async fn search_memory(
        &self,
        query: &str,
        options: SearchOptions,
    ) -> Result<SearchResponse, crate::Error> {
        let store = self.fresh_store()?;
        let notes = self.notes.load();
        Ok(self.search.search(store.get_all(), &notes, query, &options))
    }

    /// Attach a breadcrumb note. The session does not have to exist.
    pub async fn add_note(&self, session_id: &str, note: &str) -> Result<NoteAdded, crate::Error> {
        let total_notes = self.notes.add(session_id, note);
        tracing::info!(session_id, total_notes, "note added");

        Ok(NoteAdded {
            session_id: session_id.to_string(),
            note: note.to_string(),
            total_notes,
        })
    }

    pub async fn list_chapters(&self, session_id: &str) -> Result<ChapterListing, crate::Error> {
        let store = self.fresh_store()?;
        let record = store.get(session_id)?;

        let todos = &record.final_todos;
        let pending_work = todos
            .pending
            .iter()
            .map(|title| PendingItem {
                title: title.clone(),
                status: TodoStatus::Pending,
            })
            .chain(todos.in_progress.iter().map(|title| PendingItem {
                title: title.clone(),
                status: TodoStatus::InProgress,
            }))
            .collect();

        Ok(ChapterListing {
            session_id: session_id.to_string(),
            chapters: record.chapters.clone(),
            pending_work,
            notes: self.notes.get(session_id),
            files_touched: record.files_touched.clone(),
            commands_run: record.commands_run.iter().take(MAX_CHAPTER_COMMANDS).cloned().collect(),
            urls_fetched: record.urls_fetched.iter().take(MAX_CHAPTER_URLS).cloned().collect(),
            total_messages: record.message_count,
            user_turns: record.user_message_count,
        })
    }

    /// Read a window of messages, re-derived from the transcript itself.
    pub async fn read_messages(
        &self,
        session_id: &str,
        request: ReadRequest,
    ) -> Result<MessageWindow, crate::Error> {
        let store = self.fresh_store()?;
        let record = store.get(session_id)?;

        let path = &record.file_path;
        if path.as_os_str().is_empty() || !path.exists() {
            return Err(crate::Error::SourceMissing(path.clone()));
        }

        let messages = transcript::read_messages(path).map_err(|e| crate::Error::Extraction {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        self.navigation.resolve(session_id, record, messages, &request)
    }

    /// Names of the project directories under the projects root, sorted.
    pub async fn list_projects(&self) -> Result<Vec<String>, crate::Error> {
        let entries = match std::fs::read_dir(&self.config.projects_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut projects: Vec<String> = entries
            .flatten()
            .filter(|entry| entry.path().is_dir())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        projects.sort();
        Ok(projects)
    }
}

fn log_report(report: &RefreshReport) {
    for failure in &report.failures {
        tracing::warn!(path = ?failure.path, error = %failure.error, "failed to extract session");
    }
    if !report.extracted.is_empty() {
        tracing::info!(
            scanned = report.scanned,
            extracted = report.extracted.len(),
            "refreshed session records"
        );
    }
}
