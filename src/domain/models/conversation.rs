//! Serialized conversation history and its turn grammar.
//!
//! The pipeline receives history as a single string. Each turn is a role
//! header line, the content lines, and the `###END###` delimiter:
//!
//! ```text
//! ###USER###
//! How do I code the snake game in python?
//! ###END###
//! ```
//!
//! Headers are accepted with or without the surrounding `###` markers.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::{PipelineError, PipelineResult};

/// Delimiter closing every turn.
pub const TURN_DELIMITER: &str = "###END###";

/// What a delimiter inside turn content is rewritten to when serializing.
pub const ESCAPED_DELIMITER: &str = "### END ###";

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Ai,
}

impl Role {
    /// Tag written in the header line.
    pub const fn as_tag(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Ai => "AI",
        }
    }

    fn from_header(header: &str) -> Option<Self> {
        let tag = header.trim().trim_start_matches('#').trim_end_matches('#').trim();
        match tag.to_ascii_uppercase().as_str() {
            "USER" | "HUMAN" => Some(Self::User),
            "AI" | "ASSISTANT" => Some(Self::Ai),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// One turn of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// A validated conversation history.
///
/// Keeps the string exactly as received; templates are rendered with the
/// raw form so prompt text matches what the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationHistory {
    raw: String,
    turns: Vec<Turn>,
}

impl ConversationHistory {
    /// Parse and validate a serialized history.
    pub fn parse(raw: &str) -> PipelineResult<Self> {
        if !raw.contains(TURN_DELIMITER) {
            return Err(malformed("no turn delimiter found"));
        }

        let mut segments: Vec<&str> = raw.split(TURN_DELIMITER).collect();
        // split() always yields the text after the final delimiter
        let trailing = segments.pop().unwrap_or_default();
        if !trailing.trim().is_empty() {
            return Err(malformed("text found after the last turn delimiter"));
        }

        let turns = segments
            .iter()
            .enumerate()
            .map(|(index, segment)| parse_turn(index, segment))
            .collect::<PipelineResult<Vec<_>>>()?;

        match turns.last() {
            Some(turn) if turn.role != Role::User => {
                Err(malformed("the last turn must be the user's message"))
            }
            Some(turn) if turn.content.trim().is_empty() => {
                Err(malformed("the user's message is empty"))
            }
            Some(_) => Ok(Self {
                raw: raw.to_string(),
                turns,
            }),
            None => Err(malformed("no turns found")),
        }
    }

    /// Build a history from structured turns, validating the result.
    pub fn from_turns(turns: &[Turn]) -> PipelineResult<Self> {
        Self::parse(&serialize_turns(turns))
    }

    /// The history string as received.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The user's current message.
    pub fn last_user_message(&self) -> &str {
        // parse() guarantees a final user turn
        self.turns.last().map_or("", |turn| turn.content.as_str())
    }
}

/// Write turns in the canonical delimiter grammar.
///
/// Content that itself contains the delimiter, such as a reply quoting an
/// earlier history, has it rewritten to [`ESCAPED_DELIMITER`] so the result
/// always parses back into the same number of turns.
pub fn serialize_turns(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| {
            let content = turn.content.replace(TURN_DELIMITER, ESCAPED_DELIMITER);
            format!("###{}###\n{content}\n{TURN_DELIMITER}\n", turn.role.as_tag())
        })
        .collect()
}

fn parse_turn(index: usize, segment: &str) -> PipelineResult<Turn> {
    let segment = segment.trim_matches(|c: char| c == '\n' || c == '\r' || c == ' ' || c == '\t');
    if segment.is_empty() {
        return Err(malformed(&format!("turn {} is empty", index + 1)));
    }

    let (header, content) = segment.split_once('\n').unwrap_or((segment, ""));
    let role = Role::from_header(header).ok_or_else(|| {
        malformed(&format!(
            "turn {} has an unrecognized role header '{}'",
            index + 1,
            header.trim()
        ))
    })?;

    Ok(Turn {
        role,
        content: content.trim_end_matches(['\n', '\r']).to_string(),
    })
}

fn malformed(reason: &str) -> PipelineError {
    PipelineError::MalformedHistory(reason.to_string())
}
