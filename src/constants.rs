/// Application name, used for the binary and log targets.
pub const APP_NAME: &str = "retrace";

/// Environment variable overriding the transcript source root.
pub const PROJECTS_PATH_ENV: &str = "CLAUDE_PROJECTS_PATH";

/// Environment variable overriding the note document location.
pub const NOTES_PATH_ENV: &str = "CLAUDE_MEMORY_NOTES_PATH";

/// Default source root, relative to the home directory.
pub const DEFAULT_PROJECTS_SUBDIR: &str = ".claude/projects";

/// Default note document, relative to the home directory.
pub const DEFAULT_NOTES_FILE: &str = ".claude/memory-notes.json";

/// Extension of per-session transcript files.
pub(crate) const SESSION_EXTENSION: &str = "jsonl";

/// Default page size for recency listing and search.
pub const DEFAULT_LIMIT: usize = 20;

/// User turns of context on each side of a requested turn.
pub(crate) const TURN_CONTEXT: usize = 2;

// Search channel weights.
pub(crate) const TODO_TERM_WEIGHT: u32 = 3;
pub(crate) const TODO_STEM_WEIGHT: u32 = 2;
pub(crate) const NOTE_TERM_WEIGHT: u32 = 3;
pub(crate) const FILE_WEIGHT: u32 = 2;
pub(crate) const COMMAND_WEIGHT: u32 = 1;
pub(crate) const FULL_TEXT_STEM_WEIGHT: u32 = 1;
pub(crate) const ARC_MESSAGE_WEIGHT: u32 = 1;

// Excerpt bounds.
pub(crate) const MAX_MATCHED_TODOS: usize = 5;
pub(crate) const MAX_MATCHED_FILES: usize = 5;
pub(crate) const MAX_MATCHED_NOTES: usize = 3;
pub(crate) const MAX_RECENT_FILES: usize = 5;
pub(crate) const MAX_CHAPTER_COMMANDS: usize = 10;
pub(crate) const MAX_CHAPTER_URLS: usize = 10;
pub(crate) const SUMMARY_TODOS: usize = 3;
pub(crate) const SUMMARY_ARC_PAIR_CHARS: usize = 80;
pub(crate) const SUMMARY_ARC_SINGLE_CHARS: usize = 100;
pub(crate) const SUMMARY_FIRST_MESSAGE_CHARS: usize = 100;
