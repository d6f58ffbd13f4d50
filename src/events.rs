//! Live events for host UIs.
//!
//! When an event sender is attached, the arena narrates each round over an
//! unbounded channel so a UI can render streaming progress ("reply N of K")
//! without polling snapshots. Delta events carry the full partial text so
//! far; partials only ever grow.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Channel end handed to the arena for event emission.
pub type EventSender = mpsc::UnboundedSender<ArenaEvent>;

/// One observable step in the session/round lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArenaEvent {
    SessionStarted {
        session_id: String,
        bot_count: usize,
        greeting: Option<String>,
    },
    RoundStarted {
        user_message: String,
        bot_count: usize,
    },
    /// A prefix-extending partial reply. `position` is 1-based within the
    /// round's display order.
    ReplyDelta {
        bot_id: String,
        position: usize,
        total: usize,
        text: String,
    },
    ReplyComplete {
        bot_id: String,
        position: usize,
        total: usize,
    },
    /// All replies are in; `order` is the display permutation.
    VoteRequested { order: Vec<String> },
    ReplyAccepted {
        bot_id: String,
        votes: u64,
        rounds_completed: u64,
    },
    RoundAborted { reason: String },
    SessionStopped,
}
