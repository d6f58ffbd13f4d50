//! Shared conversation transcript.
//!
//! One entry per exchange. The greeting row (if configured) has no user
//! text; every accepted round carries the winning bot's identifier.

use serde::{Deserialize, Serialize};

/// A single transcript row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// The user's message. `None` for the greeting row.
    pub user: Option<String>,
    /// The reply text shown to the user.
    pub reply: Option<String>,
    /// Identifier of the bot that produced the reply. `None` for the
    /// greeting, which predates the roster competition.
    pub bot_id: Option<String>,
}

impl HistoryEntry {
    pub fn greeting(text: impl Into<String>) -> Self {
        HistoryEntry {
            user: None,
            reply: Some(text.into()),
            bot_id: None,
        }
    }

    pub fn round(
        user: impl Into<String>,
        reply: impl Into<String>,
        bot_id: impl Into<String>,
    ) -> Self {
        HistoryEntry {
            user: Some(user.into()),
            reply: Some(reply.into()),
            bot_id: Some(bot_id.into()),
        }
    }
}

/// Ordered transcript shared by every bot in a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatHistory {
    entries: Vec<HistoryEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        ChatHistory::default()
    }

    /// Start a transcript, seeding the greeting row when one is configured.
    pub fn with_greeting(greeting: Option<&str>) -> Self {
        let mut history = ChatHistory::new();
        if let Some(text) = greeting {
            history.entries.push(HistoryEntry::greeting(text));
        }
        history
    }

    /// Append an accepted round.
    pub fn push_round(&mut self, user: &str, reply: &str, bot_id: &str) {
        self.entries.push(HistoryEntry::round(user, reply, bot_id));
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of completed rounds (entries with user text).
    pub fn rounds(&self) -> usize {
        self.entries.iter().filter(|e| e.user.is_some()).count()
    }
}
