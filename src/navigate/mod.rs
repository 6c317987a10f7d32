//! Resolves a [`ReadRequest`] into a window over a session's messages.
//!
//! Three addressing modes, first populated wins: chapter (1-based, from the
//! record's chapter list), turn (1-based user turn with surrounding context)
//! and raw range (half-open positions in the message sequence). Chapter and
//! range windows can be widened with `expand`; turn windows page by turns.

use crate::constants::TURN_CONTEXT;
use crate::types::{Message, MessageWindow, ReadRequest, Role, SessionRecord, WindowSpan};

/// The addressing mode selected from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Chapter(usize),
    Turn(usize),
    Range { start: usize, end: usize },
}

impl Navigation {
    /// Pick the mode for a request. A range needs both bounds.
    pub fn from_request(request: &ReadRequest) -> crate::Result<Self> {
        if let Some(chapter) = request.chapter {
            return Ok(Navigation::Chapter(chapter));
        }
        if let Some(turn) = request.turn {
            return Ok(Navigation::Turn(turn));
        }
        match (request.start, request.end) {
            (Some(start), Some(end)) => Ok(Navigation::Range { start, end }),
            _ => Err(crate::Error::NoNavigation),
        }
    }
}

pub struct NavigationEngine {
    turn_context: usize,
}

impl Default for NavigationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationEngine {
    pub fn new() -> Self {
        Self {
            turn_context: TURN_CONTEXT,
        }
    }

    /// Build the window for `request` over `messages`, the freshly re-read
    /// message sequence of the session `record` describes.
    pub fn resolve(
        &self,
        session_id: &str,
        record: &SessionRecord,
        messages: Vec<Message>,
        request: &ReadRequest,
    ) -> crate::Result<MessageWindow> {
        let navigation = Navigation::from_request(request)?;
        let total_messages = messages.len();
        let total_user_turns = messages.iter().filter(|m| m.role == Role::User).count();

        let (span, selected) = match navigation {
            Navigation::Chapter(number) => {
                let chapter = number
                    .checked_sub(1)
                    .and_then(|i| record.chapters.get(i))
                    .ok_or_else(|| crate::Error::ChapterOutOfRange {
                        requested: number,
                        available: record
                            .chapters
                            .iter()
                            .enumerate()
                            .map(|(i, c)| format!("{}: {}", i + 1, c.title))
                            .collect(),
                    })?;

                let (start, end) = chapter.message_range;
                let (start, end, selected) =
                    widen(&messages, start, end, request.expand, request.include_assistant);
                let span = WindowSpan::Chapter {
                    chapter: number,
                    message_range: (start, end),
                    can_expand_before: start > 0,
                    can_expand_after: end < total_messages,
                };
                (span, selected)
            }
            Navigation::Turn(turn) => {
                if turn < 1 || turn > total_user_turns {
                    return Err(crate::Error::TurnOutOfRange {
                        requested: turn,
                        total: total_user_turns,
                    });
                }

                let lo = turn.saturating_sub(self.turn_context).max(1);
                let hi = (turn + self.turn_context).min(total_user_turns);
                let selected = messages
                    .iter()
                    .filter(|m| (lo..=hi).contains(&m.user_turn))
                    .filter(|m| request.include_assistant || m.role == Role::User)
                    .cloned()
                    .collect();

                let span = WindowSpan::Turn {
                    requested_turn: turn,
                    turn_range: (lo, hi),
                    can_page_backward: lo > 1,
                    can_page_forward: hi < total_user_turns,
                };
                (span, selected)
            }
            Navigation::Range { start, end } => {
                let end = end.min(total_messages);
                let (start, end, selected) =
                    widen(&messages, start, end, request.expand, request.include_assistant);
                let span = WindowSpan::Range {
                    message_range: (start, end),
                    can_expand_before: start > 0,
                    can_expand_after: end < total_messages,
                };
                (span, selected)
            }
        };

        tracing::debug!(session_id, ?span, returned = selected.len(), "resolved message window");

        Ok(MessageWindow {
            session_id: session_id.to_string(),
            span,
            messages: selected,
            total_messages,
            total_user_turns,
        })
    }
}

/// Widen `[start, end)` by `expand` on both sides, clamp to the sequence,
/// and select the covered messages. An inverted window selects nothing.
fn widen(
    messages: &[Message],
    start: usize,
    end: usize,
    expand: usize,
    include_assistant: bool,
) -> (usize, usize, Vec<Message>) {
    let total = messages.len();
    let start = start.saturating_sub(expand);
    let end = end.saturating_add(expand).min(total);

    let selected = messages
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .filter(|m| include_assistant || m.role == Role::User)
        .cloned()
        .collect();

    (start, end, selected)
}
