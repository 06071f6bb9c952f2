//! Conversation history rendering for the chat prompt.

use crate::host::HistoryTurn;
use crate::error::{RekindleError, Result};

/// Number of most recent turns included in the chat prompt.
pub const HISTORY_TURNS: usize = 5;

/// Substituted for `{history_text}` when no history can be read.
pub const NO_HISTORY_PLACEHOLDER: &str = "no history available";

/// Parse a serialized turn list and keep the last [`HISTORY_TURNS`] entries.
///
/// # Errors
///
/// Returns [`RekindleError::HistoryFetch`] if `serialized` is not a JSON list
/// of turn objects.
pub fn recent_turns(serialized: &str) -> Result<Vec<HistoryTurn>> {
    let mut turns: Vec<HistoryTurn> = serde_json::from_str(serialized)
        .map_err(|e| RekindleError::HistoryFetch(format!("cannot parse history: {e}")))?;
    let skip = turns.len().saturating_sub(HISTORY_TURNS);
    turns.drain(..skip);
    Ok(turns)
}

/// Render turns one per line as `User: ...` / `You: ...`.
///
/// Turns are addressed to the model, so its own turns are "You". Returns
/// `None` for an empty list.
pub fn format_turns(turns: &[HistoryTurn]) -> Option<String> {
    if turns.is_empty() {
        return None;
    }
    let lines: Vec<String> = turns
        .iter()
        .map(|turn| {
            let speaker = if turn.role == "user" { "User" } else { "You" };
            format!("{speaker}: {}", turn.content)
        })
        .collect();
    Some(lines.join("\n"))
}
