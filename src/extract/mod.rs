//! Turns a raw transcript into a [`SessionRecord`].
//!
//! The record store only depends on the [`SessionExtractor`] trait; the
//! shipped [`TranscriptExtractor`] fills the record schema from the tool
//! invocations found in the transcript.

pub mod stem;

pub use stem::{SnowballStemmer, StemSet, Stemmer};

use crate::storage::transcript::{self, ContentBlock, MessageContent, MessageCursor};
use crate::timestamp::parse_timestamp;
use crate::types::{Chapter, FinalTodos, Role, SessionRecord};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

const TODO_TOOL: &str = "TodoWrite";
const SHELL_TOOL: &str = "Bash";
const FETCH_TOOL: &str = "WebFetch";
const FILE_TOOLS: &[&str] = &["Read", "Edit", "Write", "MultiEdit"];
const NOTEBOOK_TOOLS: &[&str] = &["NotebookEdit", "NotebookRead"];

/// Produces a structured summary of one session transcript.
///
/// Implementations leave `mtime` and `file_path` at their defaults; the
/// record store stamps both after a successful extraction.
pub trait SessionExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<SessionRecord, crate::Error>;
}

#[derive(Debug, Deserialize)]
struct TodoInput {
    #[serde(default)]
    todos: Vec<TodoItem>,
}

#[derive(Debug, Deserialize)]
struct TodoItem {
    content: String,
    status: String,
}

/// Order-preserving set of strings.
#[derive(Default)]
struct Ledger {
    seen: HashSet<String>,
    items: Vec<String>,
}

impl Ledger {
    fn push(&mut self, value: &str) {
        if !value.is_empty() && self.seen.insert(value.to_string()) {
            self.items.push(value.to_string());
        }
    }
}

pub struct TranscriptExtractor {
    stemmer: Arc<dyn Stemmer>,
}

impl TranscriptExtractor {
    pub fn new(stemmer: Arc<dyn Stemmer>) -> Self {
        Self { stemmer }
    }
}

impl Default for TranscriptExtractor {
    fn default() -> Self {
        Self::new(Arc::new(SnowballStemmer::english()))
    }
}

fn input_str<'a>(block: &'a ContentBlock, key: &str) -> Option<&'a str> {
    block.input.as_ref()?.get(key)?.as_str()
}

fn final_todos_from(items: &[TodoItem]) -> FinalTodos {
    let mut todos = FinalTodos::default();
    for item in items {
        match item.status.as_str() {
            "completed" => todos.completed.push(item.content.clone()),
            "in_progress" => todos.in_progress.push(item.content.clone()),
            _ => todos.pending.push(item.content.clone()),
        }
    }
    todos
}

impl SessionExtractor for TranscriptExtractor {
    fn extract(&self, path: &Path) -> Result<SessionRecord, crate::Error> {
        let events = transcript::read_events(path).map_err(|e| crate::Error::Extraction {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let project = path
            .parent()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut cursor = MessageCursor::new();
        let mut message_count = 0usize;
        let mut earliest: Option<(chrono::DateTime<chrono::Utc>, String)> = None;
        let mut first_raw_timestamp: Option<String> = None;
        let mut prompts: Vec<String> = Vec::new();
        let mut final_todos = FinalTodos::default();
        let mut completed_seen: HashSet<String> = HashSet::new();
        let mut chapters: Vec<Chapter> = Vec::new();
        let mut chapter_start = 0usize;
        let mut files = Ledger::default();
        let mut commands = Ledger::default();
        let mut urls = Ledger::default();
        let mut stemmed_terms = StemSet::new();

        for event in &events {
            if let Some(raw) = event.timestamp.as_deref().filter(|t| !t.is_empty()) {
                first_raw_timestamp.get_or_insert_with(|| raw.to_string());
                if let Some(parsed) = parse_timestamp(raw)
                    && earliest.as_ref().is_none_or(|(current, _)| parsed < *current)
                {
                    earliest = Some((parsed, raw.to_string()));
                }
            }

            let Some(message) = cursor.advance(event) else {
                continue;
            };
            message_count += 1;
            stemmed_terms.merge(self.stemmer.stem_text(&message.content));

            if message.role == Role::User {
                if let Some(MessageContent::Text(text)) = event.content()
                    && !text.trim().is_empty()
                {
                    prompts.push(text.clone());
                }
                continue;
            }

            let Some(content) = event.content() else {
                continue;
            };
            for block in content.blocks().iter().filter(|b| b.is_tool_use()) {
                let name = block.name.as_deref().unwrap_or_default();
                match name {
                    TODO_TOOL => {
                        let Some(input) = block.input.clone() else {
                            continue;
                        };
                        let Ok(todo_input) = serde_json::from_value::<TodoInput>(input) else {
                            tracing::trace!(path = ?path, "skipping malformed todo list");
                            continue;
                        };

                        let mut closed_any = false;
                        for item in todo_input.todos.iter().filter(|t| t.status == "completed") {
                            if completed_seen.insert(item.content.clone()) {
                                chapters.push(Chapter {
                                    title: item.content.clone(),
                                    message_range: (chapter_start, message_count),
                                });
                                closed_any = true;
                            }
                        }
                        if closed_any {
                            chapter_start = message_count;
                        }
                        final_todos = final_todos_from(&todo_input.todos);
                    }
                    SHELL_TOOL => {
                        if let Some(command) = input_str(block, "command") {
                            commands.push(command);
                        }
                    }
                    FETCH_TOOL => {
                        if let Some(url) = input_str(block, "url") {
                            urls.push(url);
                        }
                    }
                    _ if FILE_TOOLS.contains(&name) => {
                        if let Some(file) = input_str(block, "file_path") {
                            files.push(file);
                        }
                    }
                    _ if NOTEBOOK_TOOLS.contains(&name) => {
                        if let Some(file) = input_str(block, "notebook_path") {
                            files.push(file);
                        }
                    }
                    _ => {}
                }
            }
        }

        let mut stemmed_todos = StemSet::new();
        for todo in final_todos.all() {
            stemmed_todos.merge(self.stemmer.stem_text(todo));
        }

        let user_message_arc = match prompts.as_slice() {
            [] => Vec::new(),
            [only] => vec![only.clone()],
            [first, .., last] => vec![first.clone(), last.clone()],
        };

        Ok(SessionRecord {
            project,
            timestamp: earliest
                .map(|(_, raw)| raw)
                .or(first_raw_timestamp)
                .unwrap_or_default(),
            message_count,
            user_message_count: cursor.user_turns(),
            first_message: prompts.first().cloned().unwrap_or_default(),
            user_message_arc,
            final_todos,
            chapters,
            files_touched: files.items,
            commands_run: commands.items,
            urls_fetched: urls.items,
            stemmed_todos,
            stemmed_terms,
            ..SessionRecord::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_session(dir: &Path, lines: &[&str]) -> std::path::PathBuf {
        let project = dir.join("-home-dev-app");
        std::fs::create_dir_all(&project).unwrap();
        let path = project.join("abc123.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        path
    }

    #[test]
    fn test_extract_todos_chapters_and_activity() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_session(
            dir.path(),
            &[
                r#"{"type":"user","timestamp":"2025-02-01T10:00:05Z","message":{"content":"add oauth login"}}"#,
                r#"{"type":"assistant","timestamp":"2025-02-01T10:00:00Z","message":{"content":[{"type":"tool_use","name":"TodoWrite","input":{"todos":[{"content":"Implement oauth login","status":"in_progress"},{"content":"Write tests","status":"pending"}]}}]}}"#,
                r#"{"type":"assistant","timestamp":"2025-02-01T10:01:00Z","message":{"content":[{"type":"tool_use","name":"Edit","input":{"file_path":"src/auth.rs"}},{"type":"tool_use","name":"Bash","input":{"command":"cargo test"}},{"type":"tool_use","name":"Edit","input":{"file_path":"src/auth.rs"}}]}}"#,
                r#"{"type":"assistant","timestamp":"2025-02-01T10:02:00Z","message":{"content":[{"type":"tool_use","name":"TodoWrite","input":{"todos":[{"content":"Implement oauth login","status":"completed"},{"content":"Write tests","status":"pending"}]}}]}}"#,
                r#"{"type":"user","timestamp":"2025-02-01T10:03:00Z","message":{"content":"now the docs"}}"#,
                r#"{"type":"assistant","timestamp":"2025-02-01T10:04:00Z","message":{"content":[{"type":"tool_use","name":"WebFetch","input":{"url":"https://example.com/docs"}}]}}"#,
            ],
        );

        let record = TranscriptExtractor::default().extract(&path).unwrap();

        assert_eq!(record.project, "-home-dev-app");
        assert_eq!(record.timestamp, "2025-02-01T10:00:00Z");
        assert_eq!(record.message_count, 6);
        assert_eq!(record.user_message_count, 2);
        assert_eq!(record.first_message, "add oauth login");
        assert_eq!(record.user_message_arc, vec!["add oauth login", "now the docs"]);
        assert_eq!(record.final_todos.completed, vec!["Implement oauth login"]);
        assert_eq!(record.final_todos.pending, vec!["Write tests"]);
        assert_eq!(
            record.chapters,
            vec![Chapter {
                title: "Implement oauth login".to_string(),
                message_range: (0, 4),
            }]
        );
        assert_eq!(record.files_touched, vec!["src/auth.rs"]);
        assert_eq!(record.commands_run, vec!["cargo test"]);
        assert_eq!(record.urls_fetched, vec!["https://example.com/docs"]);
        assert!(record.stemmed_todos.contains("oauth"));
    }

    #[test]
    fn test_extract_missing_file_is_extraction_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = TranscriptExtractor::default()
            .extract(&dir.path().join("gone.jsonl"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ExtractionFailure);
    }
}
