//! # Retrace
//!
//! Cross-session memory for coding agents, read straight from the
//! transcripts the agent already writes.
//!
//! Every session is a JSONL transcript under a per-project directory. Retrace
//! condenses each transcript into a [`SessionRecord`] (final todo list,
//! chapters, touched files, commands, fetched URLs, stemmed vocabulary) and
//! keeps those records fresh against file modification times. On top of the
//! records it offers recency listing, multi-channel ranked search, and
//! navigation into a session by chapter, user turn or raw message range.
//! Agents can also leave short breadcrumb notes on a session; notes are
//! searchable alongside the extracted content.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use retrace::{Config, ReadRequest, Retrace, SearchOptions};
//!
//! # async fn example() -> Result<(), retrace::Error> {
//! let memory = Retrace::new(Config::from_env());
//!
//! let response = memory.search_memory("oauth refresh", SearchOptions::default()).await?;
//! for hit in &response.results {
//!     println!("{} [{}] {}", hit.session_id, hit.score, hit.summary);
//! }
//!
//! if let Some(hit) = response.results.first() {
//!     let chapters = memory.list_chapters(&hit.session_id).await?;
//!     if !chapters.chapters.is_empty() {
//!         let window = memory.read_messages(&hit.session_id, ReadRequest::chapter(1)).await?;
//!         println!("{} messages", window.messages.len());
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Source layout
//!
//! | Path                                   | Purpose                          |
//! |----------------------------------------|----------------------------------|
//! | `<projects>/<project>/<session>.jsonl` | One transcript per session       |
//! | `<notes>`                              | JSON map of session id to notes  |
//! | `<notes>.lock`                         | Advisory lock for note writers   |
//!
//! Records are held in memory only and rebuilt from the transcripts on demand.

pub mod api;
pub mod constants;
pub mod error;
pub mod extract;
pub mod navigate;
pub mod search;
pub mod storage;
pub mod timestamp;
pub mod types;

pub use api::Retrace;
pub use constants::{APP_NAME, DEFAULT_LIMIT};
pub use error::{Error, ErrorKind, Result, lock_mutex};
pub use extract::{SessionExtractor, SnowballStemmer, StemSet, Stemmer, TranscriptExtractor};
pub use types::{
    Chapter, ChapterListing, Config, FinalTodos, Message, MessageWindow, NoteAdded, ReadRequest,
    RecentOptions, RefreshReport, Role, SearchHit, SearchMode, SearchOptions, SearchResponse,
    SessionFilter, SessionRecord, SessionSummary, WindowSpan,
};
