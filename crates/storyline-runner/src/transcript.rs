//! Chat transcript input.
//!
//! The host hands over the visible branch of a chat: one entry per message,
//! already resolved to its active swipe.

use std::path::Path;

use serde::{Deserialize, Serialize};
use storyline_types::BranchPosition;

use crate::error::RunnerError;

/// One visible chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message index.
    pub id: u32,
    /// Active swipe.
    #[serde(default)]
    pub swipe_id: u32,
    /// Speaker display name.
    pub speaker: String,
    /// Whether the user wrote it.
    #[serde(default)]
    pub is_user: bool,
    /// Message text.
    pub text: String,
}

impl ChatMessage {
    /// Branch position of this message.
    pub const fn position(&self) -> BranchPosition {
        BranchPosition::new(self.id, self.swipe_id)
    }
}

/// The visible branch, ordered by message id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
}

impl Transcript {
    /// Build from messages in any order. Later duplicates of an id win.
    pub fn new(mut messages: Vec<ChatMessage>) -> Self {
        messages.reverse();
        messages.sort_by_key(|m| m.id);
        messages.dedup_by_key(|m| m.id);
        Self { messages }
    }

    /// Load a transcript JSON array from disk.
    pub fn from_file(path: &Path) -> Result<Self, RunnerError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            RunnerError::Transcript(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::parse(&contents)
    }

    /// Parse a transcript JSON array.
    pub fn parse(json: &str) -> Result<Self, RunnerError> {
        let messages: Vec<ChatMessage> = serde_json::from_str(json)
            .map_err(|e| RunnerError::Transcript(format!("invalid transcript: {e}")))?;
        Ok(Self::new(messages))
    }

    /// All messages, oldest first.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The first message, if any.
    pub fn first(&self) -> Option<&ChatMessage> {
        self.messages.first()
    }

    /// Up to `len` messages ending at `message_id` (inclusive).
    pub fn window(&self, message_id: u32, len: u32) -> &[ChatMessage] {
        let end = self.messages.partition_point(|m| m.id <= message_id);
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        let start = end.saturating_sub(len);
        self.messages.get(start..end).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: u32, swipe_id: u32, text: &str) -> ChatMessage {
        ChatMessage {
            id,
            swipe_id,
            speaker: if id % 2 == 0 { "Narrator" } else { "You" }.to_owned(),
            is_user: id % 2 == 1,
            text: text.to_owned(),
        }
    }

    #[test]
    fn parses_host_json() {
        let json = r#"[
            {"id": 1, "swipe_id": 2, "speaker": "You", "is_user": true, "text": "Hello"},
            {"id": 0, "speaker": "Narrator", "text": "The inn is warm."}
        ]"#;
        let transcript = Transcript::parse(json).unwrap_or_default();
        let ids: Vec<u32> = transcript.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(
            transcript.messages().get(1).map(ChatMessage::position),
            Some(BranchPosition::new(1, 2))
        );
    }

    #[test]
    fn malformed_json_is_a_transcript_error() {
        assert!(matches!(
            Transcript::parse("{\"id\": 0}"),
            Err(RunnerError::Transcript(_))
        ));
    }

    #[test]
    fn window_ends_at_message() {
        let transcript = Transcript::new((0..10).map(|id| message(id, 0, "x")).collect());
        let ids = |w: &[ChatMessage]| w.iter().map(|m| m.id).collect::<Vec<_>>();

        assert_eq!(ids(transcript.window(5, 3)), vec![3, 4, 5]);
        assert_eq!(ids(transcript.window(1, 12)), vec![0, 1]);
        assert_eq!(ids(transcript.window(9, 1)), vec![9]);
        assert!(transcript.window(5, 0).is_empty());
    }

    #[test]
    fn later_duplicate_wins() {
        let transcript = Transcript::new(vec![message(0, 0, "old"), message(0, 1, "new")]);
        assert_eq!(transcript.messages().len(), 1);
        assert_eq!(transcript.first().map(|m| m.text.as_str()), Some("new"));
    }
}
