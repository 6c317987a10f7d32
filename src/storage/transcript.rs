//! Reader for per-session transcript files: one JSON event per line.

use crate::types::{Message, Role};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Buffer size for transcript reads; sessions routinely exceed several MB.
const BUFFER_SIZE: usize = 64 * 1024;

/// One line of a transcript. Only the fields the indexer consults are typed.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptEvent {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub timestamp: Option<String>,
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

/// Message content is either a plain string or a list of typed blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: Option<String>,
    pub text: Option<String>,
    pub name: Option<String>,
    pub input: Option<serde_json::Value>,
}

impl ContentBlock {
    pub fn is_text(&self) -> bool {
        self.block_type.as_deref() == Some("text")
    }

    pub fn is_tool_use(&self) -> bool {
        self.block_type.as_deref() == Some("tool_use")
    }
}

impl MessageContent {
    /// Plain text of the message: the string itself, or text blocks joined by newlines.
    pub fn text(&self) -> String {
        match self {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter(|block| block.is_text())
                .filter_map(|block| block.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

impl TranscriptEvent {
    /// Role for user/assistant events; `None` for every other event type.
    pub fn role(&self) -> Option<Role> {
        match self.kind.as_deref() {
            Some("user") => Some(Role::User),
            Some("assistant") => Some(Role::Assistant),
            _ => None,
        }
    }

    pub fn content(&self) -> Option<&MessageContent> {
        self.message.as_ref().and_then(|m| m.content.as_ref())
    }
}

/// Read every parseable event from a transcript.
///
/// Lines that are empty, not valid UTF-8, or not valid JSON are skipped.
pub fn read_events(path: &Path) -> Result<Vec<TranscriptEvent>, crate::Error> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(BUFFER_SIZE, file);

    let mut events = Vec::new();
    for (line_no, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        match serde_json::from_slice::<TranscriptEvent>(&line) {
            Ok(event) => events.push(event),
            Err(e) => {
                tracing::trace!(path = ?path, line = line_no + 1, error = %e, "skipping malformed transcript line");
            }
        }
    }

    Ok(events)
}

/// Walks user/assistant events and assigns message indices and user turns.
///
/// Every user/assistant event consumes an index, even one without a message
/// payload; such events produce no message. Other event types consume nothing.
#[derive(Debug, Default)]
pub struct MessageCursor {
    index: usize,
    user_turns: usize,
}

impl MessageCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, event: &TranscriptEvent) -> Option<Message> {
        let role = event.role()?;
        self.index += 1;

        let message = event.message.as_ref()?;
        if role == Role::User {
            self.user_turns += 1;
        }

        Some(Message {
            role,
            content: message.content.as_ref().map(MessageContent::text).unwrap_or_default(),
            timestamp: event.timestamp.clone().unwrap_or_default(),
            index: self.index,
            user_turn: self.user_turns,
        })
    }

    pub fn user_turns(&self) -> usize {
        self.user_turns
    }
}

pub fn messages_from_events(events: &[TranscriptEvent]) -> Vec<Message> {
    let mut cursor = MessageCursor::new();
    events.iter().filter_map(|event| cursor.advance(event)).collect()
}

/// Re-derive the full message sequence of a transcript.
pub fn read_messages(path: &Path) -> Result<Vec<Message>, crate::Error> {
    let events = read_events(path)?;
    Ok(messages_from_events(&events))
}
