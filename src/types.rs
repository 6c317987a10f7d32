use crate::constants::{
    DEFAULT_NOTES_FILE, DEFAULT_PROJECTS_SUBDIR, NOTES_PATH_ENV, PROJECTS_PATH_ENV,
};
use crate::extract::StemSet;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Final todo-list state of a session, split by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTodos {
    pub completed: Vec<String>,
    pub in_progress: Vec<String>,
    pub pending: Vec<String>,
}

impl FinalTodos {
    /// Completed, then in-progress, then pending titles.
    pub fn all(&self) -> impl Iterator<Item = &String> {
        self.completed
            .iter()
            .chain(self.in_progress.iter())
            .chain(self.pending.iter())
    }
}

/// A contiguous message range tied to a completed todo.
///
/// `message_range` is half-open and 0-based over the session's message
/// sequence as produced by the extraction that created it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    pub message_range: (usize, usize),
}

/// Structured summary of one session transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub project: String,
    pub timestamp: String,
    pub message_count: usize,
    pub user_message_count: usize,
    pub first_message: String,
    pub user_message_arc: Vec<String>,
    pub final_todos: FinalTodos,
    pub chapters: Vec<Chapter>,
    pub files_touched: Vec<String>,
    pub commands_run: Vec<String>,
    pub urls_fetched: Vec<String>,
    pub stemmed_todos: StemSet,
    pub stemmed_terms: StemSet,
    /// Source modification time as of the extraction that produced this record.
    pub mtime: SystemTime,
    pub file_path: PathBuf,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            project: String::new(),
            timestamp: String::new(),
            message_count: 0,
            user_message_count: 0,
            first_message: String::new(),
            user_message_arc: Vec::new(),
            final_todos: FinalTodos::default(),
            chapters: Vec::new(),
            files_touched: Vec::new(),
            commands_run: Vec::new(),
            urls_fetched: Vec::new(),
            stemmed_todos: StemSet::default(),
            stemmed_terms: StemSet::default(),
            mtime: SystemTime::UNIX_EPOCH,
            file_path: PathBuf::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One user or assistant message, derived on demand from the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    /// 1-based position among user/assistant events.
    pub index: usize,
    /// Number of user messages seen so far, including this one.
    pub user_turn: usize,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
#[clap(rename_all = "lower")]
pub enum SearchMode {
    #[default]
    Smart,
    Todos,
    Full,
    Files,
}

impl SearchMode {
    pub fn searches_todos(self) -> bool {
        matches!(self, SearchMode::Smart | SearchMode::Todos)
    }

    pub fn searches_files(self) -> bool {
        matches!(self, SearchMode::Smart | SearchMode::Files)
    }

    /// Commands and the full-text fallback share the same gate.
    pub fn searches_full_text(self) -> bool {
        matches!(self, SearchMode::Smart | SearchMode::Full)
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchMode::Smart => write!(f, "smart"),
            SearchMode::Todos => write!(f, "todos"),
            SearchMode::Full => write!(f, "full"),
            SearchMode::Files => write!(f, "files"),
        }
    }
}

/// Project and time-window filters shared by recency listing and search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionFilter {
    /// Substring the record's project must contain.
    pub project: Option<String>,
    /// ISO-8601 lower bound.
    pub after: Option<String>,
    /// ISO-8601 upper bound.
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentOptions {
    pub limit: usize,
    pub filter: SessionFilter,
}

impl Default for RecentOptions {
    fn default() -> Self {
        Self {
            limit: crate::constants::DEFAULT_LIMIT,
            filter: SessionFilter::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    pub limit: usize,
    pub mode: SearchMode,
    pub filter: SessionFilter,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: crate::constants::DEFAULT_LIMIT,
            mode: SearchMode::default(),
            filter: SessionFilter::default(),
        }
    }
}

/// Addressing fields of a `read_messages` request. The first populated mode
/// wins, in the order chapter, turn, range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    pub chapter: Option<usize>,
    pub turn: Option<usize>,
    pub start: Option<usize>,
    pub end: Option<usize>,
    pub expand: usize,
    pub include_assistant: bool,
}

impl Default for ReadRequest {
    fn default() -> Self {
        Self {
            chapter: None,
            turn: None,
            start: None,
            end: None,
            expand: 0,
            include_assistant: true,
        }
    }
}

impl ReadRequest {
    pub fn chapter(chapter: usize) -> Self {
        Self {
            chapter: Some(chapter),
            ..Self::default()
        }
    }

    pub fn turn(turn: usize) -> Self {
        Self {
            turn: Some(turn),
            ..Self::default()
        }
    }

    pub fn range(start: usize, end: usize) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Self::default()
        }
    }
}

/// One row of `list_recent`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub project: String,
    pub timestamp: String,
    pub summary: String,
    pub completed: Vec<String>,
    pub in_progress: Vec<String>,
    pub pending: Vec<String>,
    pub message_count: usize,
    pub user_message_count: usize,
    pub has_chapters: bool,
    pub files_touched: Vec<String>,
    pub has_notes: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub session_id: String,
    pub score: u32,
    pub match_source: Vec<String>,
    pub matched_todos: Vec<String>,
    pub matched_files: Vec<String>,
    pub matched_notes: Vec<String>,
    pub summary: String,
    pub project: String,
    pub timestamp: String,
    pub user_message_count: usize,
    pub has_chapters: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    /// Hit count before truncation to the requested limit.
    pub total_matches: usize,
    pub search_mode: SearchMode,
    pub query_stems: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteAdded {
    pub session_id: String,
    pub note: String,
    pub total_notes: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    Pending,
    InProgress,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingItem {
    pub title: String,
    pub status: TodoStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterListing {
    pub session_id: String,
    pub chapters: Vec<Chapter>,
    pub pending_work: Vec<PendingItem>,
    pub notes: Vec<String>,
    pub files_touched: Vec<String>,
    pub commands_run: Vec<String>,
    pub urls_fetched: Vec<String>,
    pub total_messages: usize,
    pub user_turns: usize,
}

/// How a message window was addressed, with the paging state for that mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "navigationMode", rename_all = "camelCase")]
pub enum WindowSpan {
    #[serde(rename_all = "camelCase")]
    Chapter {
        chapter: usize,
        message_range: (usize, usize),
        can_expand_before: bool,
        can_expand_after: bool,
    },
    #[serde(rename_all = "camelCase")]
    Turn {
        requested_turn: usize,
        turn_range: (usize, usize),
        can_page_backward: bool,
        can_page_forward: bool,
    },
    #[serde(rename_all = "camelCase")]
    Range {
        message_range: (usize, usize),
        can_expand_before: bool,
        can_expand_after: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageWindow {
    pub session_id: String,
    #[serde(flatten)]
    pub span: WindowSpan,
    pub messages: Vec<Message>,
    pub total_messages: usize,
    pub total_user_turns: usize,
}

/// A source file that could not be extracted during a refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of one freshness pass over the source root.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReport {
    pub scanned: usize,
    /// Session ids re-extracted during this pass.
    pub extracted: Vec<String>,
    pub failures: Vec<RefreshFailure>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Root holding one directory per project, one transcript per session.
    pub projects_path: PathBuf,
    /// JSON document holding breadcrumb notes.
    pub notes_path: PathBuf,
}

impl Config {
    pub fn new(projects_path: impl Into<PathBuf>, notes_path: impl Into<PathBuf>) -> Self {
        Self {
            projects_path: projects_path.into(),
            notes_path: notes_path.into(),
        }
    }

    /// Defaults overridden by `CLAUDE_PROJECTS_PATH` and `CLAUDE_MEMORY_NOTES_PATH`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            projects_path: std::env::var_os(PROJECTS_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.projects_path),
            notes_path: std::env::var_os(NOTES_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.notes_path),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| Path::new(".").to_path_buf());
        Self {
            projects_path: home.join(DEFAULT_PROJECTS_SUBDIR),
            notes_path: home.join(DEFAULT_NOTES_FILE),
        }
    }
}
