//! Multi-channel scoring and ranking of session records.
//!
//! Channels, in evaluation order: todos (exact terms, falling back to todo
//! stems), notes, touched files, run commands, and a full-text fallback that
//! only runs while the accumulated score is still zero. Each contributing
//! channel is recorded once in the hit's `match_source`.

use crate::constants::{
    ARC_MESSAGE_WEIGHT, COMMAND_WEIGHT, FILE_WEIGHT, FULL_TEXT_STEM_WEIGHT, MAX_MATCHED_FILES,
    MAX_MATCHED_NOTES, MAX_MATCHED_TODOS, MAX_RECENT_FILES, NOTE_TERM_WEIGHT,
    SUMMARY_ARC_PAIR_CHARS, SUMMARY_ARC_SINGLE_CHARS, SUMMARY_FIRST_MESSAGE_CHARS, SUMMARY_TODOS,
    TODO_STEM_WEIGHT, TODO_TERM_WEIGHT,
};
use crate::extract::{StemSet, Stemmer};
use crate::storage::NoteDocument;
use crate::timestamp::parse_timestamp;
use crate::types::{
    RecentOptions, SearchHit, SearchMode, SearchOptions, SearchResponse, SessionFilter,
    SessionRecord, SessionSummary,
};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

/// Match-source labels.
pub const SOURCE_TODOS: &str = "todos";
pub const SOURCE_TODOS_STEMMED: &str = "todos_stemmed";
pub const SOURCE_NOTES: &str = "notes";
pub const SOURCE_FILES: &str = "files";
pub const SOURCE_COMMANDS: &str = "commands";
pub const SOURCE_FULL_TEXT: &str = "full_text";
pub const SOURCE_MESSAGES: &str = "messages";

/// A query split into lowercase whitespace terms and normalized stems.
#[derive(Debug, Clone)]
pub struct Query {
    pub terms: Vec<String>,
    pub stems: StemSet,
}

impl Query {
    fn count_in(&self, text: &str) -> usize {
        let lowered = text.to_lowercase();
        self.terms.iter().filter(|term| lowered.contains(term.as_str())).count()
    }

    fn any_in(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        self.terms.iter().any(|term| lowered.contains(term.as_str()))
    }
}

/// Score of one record plus the evidence behind it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scored {
    pub score: u32,
    pub match_source: Vec<String>,
    pub matched_todos: Vec<String>,
    pub matched_files: Vec<String>,
    pub matched_notes: Vec<String>,
}

impl Scored {
    fn credit(&mut self, points: u32, source: &str) {
        self.score += points;
        if !self.match_source.iter().any(|s| s == source) {
            self.match_source.push(source.to_string());
        }
    }
}

/// Parsed `after`/`before` bounds and project filter.
///
/// A bound that fails to parse is ignored. A record whose own timestamp
/// fails to parse is never excluded by the bounds.
struct FilterBounds<'a> {
    project: Option<&'a str>,
    after: Option<DateTime<Utc>>,
    before: Option<DateTime<Utc>>,
}

impl<'a> FilterBounds<'a> {
    fn new(filter: &'a SessionFilter) -> Self {
        Self {
            project: filter.project.as_deref(),
            after: filter.after.as_deref().and_then(parse_timestamp),
            before: filter.before.as_deref().and_then(parse_timestamp),
        }
    }

    fn admits(&self, record: &SessionRecord) -> bool {
        if let Some(project) = self.project
            && !record.project.contains(project)
        {
            return false;
        }

        let Some(ts) = parse_timestamp(&record.timestamp) else {
            return true;
        };
        let after_ok = self.after.is_none_or(|after| ts >= after);
        let before_ok = self.before.is_none_or(|before| ts <= before);
        after_ok && before_ok
    }
}

/// Newest first; records with empty or unparsable timestamps last.
pub fn timestamp_order_desc(a: &str, b: &str) -> Ordering {
    match (parse_timestamp(a).is_some(), parse_timestamp(b).is_some()) {
        (true, true) => b.cmp(a),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

/// Summary shown in recency listings: completed todos, else the user arc,
/// else the first message.
pub fn recent_summary(record: &SessionRecord) -> String {
    let completed = &record.final_todos.completed;
    if !completed.is_empty() {
        return completed.iter().take(SUMMARY_TODOS).cloned().collect::<Vec<_>>().join(", ");
    }

    match record.user_message_arc.as_slice() {
        [only] => format!("[1 turn] {only}"),
        [first, last] => format!(
            "[{} turns] {first} ... {last}",
            record.user_message_count
        ),
        _ if record.first_message.is_empty() => "No todos".to_string(),
        _ => record.first_message.clone(),
    }
}

/// Summary shown on search hits; arc and first-message text is truncated.
pub fn search_summary(record: &SessionRecord) -> String {
    let completed = &record.final_todos.completed;
    if !completed.is_empty() {
        return completed.iter().take(SUMMARY_TODOS).cloned().collect::<Vec<_>>().join(", ");
    }

    let turns = record.user_message_count;
    match record.user_message_arc.as_slice() {
        [first, last] => format!(
            "[{turns} turns] {} ... {}",
            truncate_chars(first, SUMMARY_ARC_PAIR_CHARS),
            truncate_chars(last, SUMMARY_ARC_PAIR_CHARS)
        ),
        [only] => format!(
            "[{turns} turns] {}",
            truncate_chars(only, SUMMARY_ARC_SINGLE_CHARS)
        ),
        _ => truncate_chars(&record.first_message, SUMMARY_FIRST_MESSAGE_CHARS).to_string(),
    }
}

pub struct SearchEngine {
    stemmer: Arc<dyn Stemmer>,
}

impl SearchEngine {
    pub fn new(stemmer: Arc<dyn Stemmer>) -> Self {
        Self { stemmer }
    }

    pub fn parse_query(&self, query: &str) -> Query {
        Query {
            terms: query.to_lowercase().split_whitespace().map(String::from).collect(),
            stems: self.stemmer.stem_text(query),
        }
    }

    /// Score one record against a parsed query.
    pub fn score(
        &self,
        record: &SessionRecord,
        notes: &[String],
        query: &Query,
        mode: SearchMode,
    ) -> Scored {
        let mut scored = Scored::default();

        if mode.searches_todos() {
            for todo in record.final_todos.all() {
                let matches = query.count_in(todo) as u32;
                if matches > 0 {
                    scored.credit(matches * TODO_TERM_WEIGHT, SOURCE_TODOS);
                    scored.matched_todos.push(todo.clone());
                }
            }

            if scored.matched_todos.is_empty() {
                let shared = query.stems.intersection_count(&record.stemmed_todos) as u32;
                if shared > 0 {
                    scored.credit(shared * TODO_STEM_WEIGHT, SOURCE_TODOS_STEMMED);
                }
            }
        }

        for note in notes {
            let matches = query.count_in(note) as u32;
            if matches > 0 {
                scored.credit(matches * NOTE_TERM_WEIGHT, SOURCE_NOTES);
                scored.matched_notes.push(note.clone());
            }
        }

        if mode.searches_files() {
            for file in &record.files_touched {
                if query.any_in(file) {
                    scored.credit(FILE_WEIGHT, SOURCE_FILES);
                    scored.matched_files.push(file.clone());
                }
            }
        }

        if mode.searches_full_text() {
            for command in &record.commands_run {
                if query.any_in(command) {
                    scored.credit(COMMAND_WEIGHT, SOURCE_COMMANDS);
                }
            }

            if scored.score == 0 {
                let shared = query.stems.intersection_count(&record.stemmed_terms) as u32;
                if shared > 0 {
                    scored.credit(shared * FULL_TEXT_STEM_WEIGHT, SOURCE_FULL_TEXT);
                }

                for message in &record.user_message_arc {
                    if query.any_in(message) {
                        scored.credit(ARC_MESSAGE_WEIGHT, SOURCE_MESSAGES);
                    }
                }
            }
        }

        scored
    }

    /// Rank every admitted record with a positive score.
    pub fn search(
        &self,
        records: &HashMap<String, SessionRecord>,
        notes: &NoteDocument,
        query: &str,
        options: &SearchOptions,
    ) -> SearchResponse {
        let parsed = self.parse_query(query);
        let bounds = FilterBounds::new(&options.filter);

        let mut hits: Vec<SearchHit> = records
            .iter()
            .filter(|(_, record)| bounds.admits(record))
            .filter_map(|(session_id, record)| {
                let session_notes = notes.get(session_id).map(Vec::as_slice).unwrap_or(&[]);
                let scored = self.score(record, session_notes, &parsed, options.mode);
                if scored.score == 0 {
                    return None;
                }

                Some(SearchHit {
                    session_id: session_id.clone(),
                    score: scored.score,
                    match_source: scored.match_source,
                    matched_todos: truncated(scored.matched_todos, MAX_MATCHED_TODOS),
                    matched_files: truncated(scored.matched_files, MAX_MATCHED_FILES),
                    matched_notes: truncated(scored.matched_notes, MAX_MATCHED_NOTES),
                    summary: search_summary(record),
                    project: record.project.clone(),
                    timestamp: record.timestamp.clone(),
                    user_message_count: record.user_message_count,
                    has_chapters: !record.chapters.is_empty(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| timestamp_order_desc(&a.timestamp, &b.timestamp))
                .then_with(|| a.session_id.cmp(&b.session_id))
        });

        let total_matches = hits.len();
        hits.truncate(options.limit);

        tracing::debug!(query, total_matches, mode = %options.mode, "search complete");

        SearchResponse {
            results: hits,
            total_matches,
            search_mode: options.mode,
            query_stems: parsed.stems.to_vec(),
        }
    }

    /// Admitted records, newest first.
    pub fn recent(
        &self,
        records: &HashMap<String, SessionRecord>,
        notes: &NoteDocument,
        options: &RecentOptions,
    ) -> Vec<SessionSummary> {
        let bounds = FilterBounds::new(&options.filter);

        let mut sessions: Vec<SessionSummary> = records
            .iter()
            .filter(|(_, record)| bounds.admits(record))
            .map(|(session_id, record)| SessionSummary {
                session_id: session_id.clone(),
                project: record.project.clone(),
                timestamp: record.timestamp.clone(),
                summary: recent_summary(record),
                completed: record.final_todos.completed.clone(),
                in_progress: record.final_todos.in_progress.clone(),
                pending: record.final_todos.pending.clone(),
                message_count: record.message_count,
                user_message_count: record.user_message_count,
                has_chapters: !record.chapters.is_empty(),
                files_touched: record.files_touched.iter().take(MAX_RECENT_FILES).cloned().collect(),
                has_notes: notes.get(session_id).is_some_and(|n| !n.is_empty()),
            })
            .collect();

        sessions.sort_by(|a, b| {
            timestamp_order_desc(&a.timestamp, &b.timestamp)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions.truncate(options.limit);
        sessions
    }
}

fn truncated(mut items: Vec<String>, max: usize) -> Vec<String> {
    items.truncate(max);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::SnowballStemmer;
    use crate::types::FinalTodos;

    fn engine() -> SearchEngine {
        SearchEngine::new(Arc::new(SnowballStemmer::english()))
    }

    fn record(timestamp: &str) -> SessionRecord {
        SessionRecord {
            project: "-home-dev-app".to_string(),
            timestamp: timestamp.to_string(),
            ..SessionRecord::default()
        }
    }

    fn with_completed(mut record: SessionRecord, todos: &[&str]) -> SessionRecord {
        let stemmer = SnowballStemmer::english();
        record.final_todos = FinalTodos {
            completed: todos.iter().map(|t| t.to_string()).collect(),
            ..FinalTodos::default()
        };
        for todo in todos {
            record.stemmed_todos.merge(stemmer.stem_text(todo));
        }
        record
    }

    fn records(entries: Vec<(&str, SessionRecord)>) -> HashMap<String, SessionRecord> {
        entries.into_iter().map(|(id, r)| (id.to_string(), r)).collect()
    }

    #[test]
    fn test_todos_mode_ignores_full_text_only_sessions() {
        let engine = engine();
        let stemmer = SnowballStemmer::english();
        let a = with_completed(record("2025-01-02T00:00:00Z"), &["Implement oauth login"]);
        let mut b = record("2025-01-03T00:00:00Z");
        b.stemmed_terms = stemmer.stem_text("oauth2 refresh");
        b.user_message_arc = vec!["fix the oauth2 refresh".to_string()];

        let options = SearchOptions {
            mode: SearchMode::Todos,
            ..SearchOptions::default()
        };
        let response = engine.search(
            &records(vec![("A", a), ("B", b)]),
            &NoteDocument::new(),
            "oauth",
            &options,
        );

        assert_eq!(response.total_matches, 1);
        assert_eq!(response.results[0].session_id, "A");
        assert_eq!(response.results[0].score, 3);
        assert_eq!(response.results[0].match_source, vec!["todos"]);
    }

    #[test]
    fn test_stem_fallback_only_without_exact_todo_match() {
        let engine = engine();
        let r = with_completed(record(""), &["Refactoring caches"]);
        let query = engine.parse_query("refactored cache");

        let scored = engine.score(&r, &[], &query, SearchMode::Todos);
        // "cache" is a substring of "caches", so the exact channel wins.
        assert_eq!(scored.score, 3);
        assert_eq!(scored.match_source, vec!["todos"]);

        let query = engine.parse_query("refactored");
        let scored = engine.score(&r, &[], &query, SearchMode::Todos);
        assert_eq!(scored.score, 2);
        assert_eq!(scored.match_source, vec!["todos_stemmed"]);
    }

    #[test]
    fn test_notes_score_in_every_mode() {
        let engine = engine();
        let r = record("2025-01-01T00:00:00Z");
        let notes = vec!["picked redis for session cache".to_string()];
        let query = engine.parse_query("redis cache");

        for mode in [SearchMode::Smart, SearchMode::Todos, SearchMode::Full, SearchMode::Files] {
            let scored = engine.score(&r, &notes, &query, mode);
            assert_eq!(scored.score, 6, "mode {mode}");
            assert_eq!(scored.matched_notes, notes);
        }
    }

    #[test]
    fn test_full_text_fallback_is_gated_on_zero_score() {
        let engine = engine();
        let stemmer = SnowballStemmer::english();
        let mut r = record("2025-01-01T00:00:00Z");
        r.commands_run = vec!["cargo build --release".to_string()];
        r.stemmed_terms = stemmer.stem_text("release build pipeline");
        r.user_message_arc = vec!["cut a release".to_string()];

        let query = engine.parse_query("release");
        let scored = engine.score(&r, &[], &query, SearchMode::Smart);
        assert_eq!(scored.score, 1);
        assert_eq!(scored.match_source, vec!["commands"]);

        r.commands_run.clear();
        let scored = engine.score(&r, &[], &query, SearchMode::Smart);
        assert_eq!(scored.score, 2);
        assert_eq!(scored.match_source, vec!["full_text", "messages"]);

        let scored = engine.score(&r, &[], &query, SearchMode::Files);
        assert_eq!(scored.score, 0);
    }

    #[test]
    fn test_files_channel_counts_each_matching_path() {
        let engine = engine();
        let mut r = record("");
        r.files_touched = vec![
            "src/server.rs".to_string(),
            "tests/server_test.rs".to_string(),
            "README.md".to_string(),
        ];
        let query = engine.parse_query("server");
        let scored = engine.score(&r, &[], &query, SearchMode::Files);
        assert_eq!(scored.score, 4);
        assert_eq!(scored.matched_files.len(), 2);
    }

    #[test]
    fn test_ranking_by_score_then_timestamp() {
        let engine = engine();
        let strong = with_completed(record("2025-01-01T00:00:00Z"), &["oauth login flow"]);
        let weak_old = with_completed(record("2025-01-02T00:00:00Z"), &["oauth setup"]);
        let weak_new = with_completed(record("2025-01-05T00:00:00Z"), &["oauth docs"]);
        let weak_undated = with_completed(record("not a date"), &["oauth notes"]);

        let response = engine.search(
            &records(vec![
                ("old", weak_old),
                ("undated", weak_undated),
                ("strong", strong),
                ("new", weak_new),
            ]),
            &NoteDocument::new(),
            "oauth login",
            &SearchOptions::default(),
        );

        let order: Vec<&str> = response.results.iter().map(|h| h.session_id.as_str()).collect();
        assert_eq!(order, vec!["strong", "new", "old", "undated"]);
        assert_eq!(response.results[0].score, 6);
    }

    #[test]
    fn test_limit_truncates_but_total_counts_all() {
        let engine = engine();
        let recs = records(
            (0..5)
                .map(|i| {
                    let id: &'static str = ["a", "b", "c", "d", "e"][i];
                    (id, with_completed(record(&format!("2025-01-0{}T00:00:00Z", i + 1)), &["deploy"]))
                })
                .collect(),
        );
        let options = SearchOptions {
            limit: 2,
            ..SearchOptions::default()
        };
        let response = engine.search(&recs, &NoteDocument::new(), "deploy", &options);
        assert_eq!(response.total_matches, 5);
        assert_eq!(response.results.len(), 2);
        assert_eq!(response.results[0].session_id, "e");
    }

    #[test]
    fn test_date_filters_keep_unparsable_records() {
        let engine = engine();
        let recs = records(vec![
            ("early", with_completed(record("2025-01-01T00:00:00Z"), &["deploy"])),
            ("late", with_completed(record("2025-03-01T00:00:00Z"), &["deploy"])),
            ("undated", with_completed(record(""), &["deploy"])),
        ]);

        let options = SearchOptions {
            filter: SessionFilter {
                after: Some("2025-02-01".to_string()),
                ..SessionFilter::default()
            },
            ..SearchOptions::default()
        };
        let response = engine.search(&recs, &NoteDocument::new(), "deploy", &options);
        let ids: Vec<&str> = response.results.iter().map(|h| h.session_id.as_str()).collect();
        assert_eq!(ids, vec!["late", "undated"]);

        let options = SearchOptions {
            filter: SessionFilter {
                before: Some("2025-02-01".to_string()),
                project: Some("dev-app".to_string()),
                ..SessionFilter::default()
            },
            ..SearchOptions::default()
        };
        let response = engine.search(&recs, &NoteDocument::new(), "deploy", &options);
        let ids: Vec<&str> = response.results.iter().map(|h| h.session_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "undated"]);

        let options = SearchOptions {
            filter: SessionFilter {
                project: Some("other".to_string()),
                ..SessionFilter::default()
            },
            ..SearchOptions::default()
        };
        assert_eq!(
            engine.search(&recs, &NoteDocument::new(), "deploy", &options).total_matches,
            0
        );
    }

    #[test]
    fn test_search_summary_fallbacks() {
        let mut r = record("");
        r.first_message = "x".repeat(150);
        assert_eq!(search_summary(&r).chars().count(), 100);

        r.user_message_count = 4;
        r.user_message_arc = vec!["a".repeat(120), "b".repeat(120)];
        let summary = search_summary(&r);
        assert!(summary.starts_with("[4 turns] "));
        assert_eq!(summary.matches('a').count(), 80);
        assert_eq!(summary.matches('b').count(), 80);

        let r = with_completed(r, &["one", "two", "three", "four"]);
        assert_eq!(search_summary(&r), "one, two, three");
    }

    #[test]
    fn test_recent_summary_and_order() {
        let engine = engine();
        let mut single = record("2025-01-02T00:00:00Z");
        single.user_message_arc = vec!["just one".to_string()];
        let mut pair = record("2025-01-03T00:00:00Z");
        pair.user_message_count = 7;
        pair.user_message_arc = vec!["start".to_string(), "finish".to_string()];
        let bare = record("");

        let mut notes = NoteDocument::new();
        notes.insert("pair".to_string(), vec!["remember this".to_string()]);

        let sessions = engine.recent(
            &records(vec![("single", single), ("bare", bare), ("pair", pair)]),
            &notes,
            &RecentOptions::default(),
        );

        let ids: Vec<&str> = sessions.iter().map(|s| s.session_id.as_str()).collect();
        assert_eq!(ids, vec!["pair", "single", "bare"]);
        assert_eq!(sessions[0].summary, "[7 turns] start ... finish");
        assert!(sessions[0].has_notes);
        assert_eq!(sessions[1].summary, "[1 turn] just one");
        assert_eq!(sessions[2].summary, "No todos");
    }
}
