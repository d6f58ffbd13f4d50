//! Crate-level error taxonomy.
//!
//! Configuration and selection errors are synchronous and never mutate
//! session state. A generator failure aborts the whole round; it is
//! session-scoped and never fatal to the process.

use thiserror::Error;

use crate::generator::GeneratorError;
use crate::Step;

/// Errors surfaced by the arena command methods.
#[derive(Debug, Error)]
pub enum ArenaError {
    /// The session configuration is unusable (no enabled bots, empty
    /// identifier, roster over the cap).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A command was invoked in a turn state that does not permit it.
    #[error("{operation} is not valid in state {state:?}")]
    InvalidState {
        operation: &'static str,
        state: Step,
    },

    /// `accept_reply` referenced a bot with no pending reply this round.
    #[error("no pending reply from bot '{0}'")]
    InvalidSelection(String),

    /// The reply generator failed mid-round. The round was discarded.
    #[error("generation failed for bot '{bot}'")]
    Generator {
        bot: String,
        #[source]
        source: GeneratorError,
    },
}

impl ArenaError {
    /// True for errors that are guaranteed to leave session state untouched.
    pub fn is_synchronous(&self) -> bool {
        !matches!(self, ArenaError::Generator { .. })
    }
}
