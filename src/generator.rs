//! The reply generator seam.
//!
//! The arena never talks to a model directly. It hands a [`GenerationRequest`]
//! to an injected [`ReplyGenerator`] and consumes the returned stream of
//! partial reply texts. The stream contract:
//!
//! - finite and non-restartable; it must terminate
//! - each item is the *full* partial text so far (prefix-extending, never a
//!   rewind)
//! - the last successful item is the final reply
//! - cancellation is the consumer dropping the stream; no cleanup protocol

use std::pin::Pin;

use futures_util::Stream;
use thiserror::Error;

use crate::history::ChatHistory;
use crate::presets::GenerationParams;

/// Everything one bot needs to produce one reply. Bots never see each
/// other's replies from the in-flight round: `history` stops at the previous
/// accepted round.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub user_message: String,
    /// The bot's persistent context (system-prompt fragment).
    pub context: String,
    /// Prompt-side name of the user, shared across bots.
    pub user_name: String,
    /// Prompt-side name of the bot, shared across bots.
    pub bot_name: String,
    pub history: ChatHistory,
    pub params: GenerationParams,
}

/// Lazy, finite sequence of prefix-extending partial replies.
pub type ReplyStream = Pin<Box<dyn Stream<Item = Result<String, GeneratorError>> + Send>>;

/// Produces one reply stream per request.
pub trait ReplyGenerator: Send + Sync {
    fn generate(&self, request: GenerationRequest) -> ReplyStream;
}

/// Failure modes of a reply generator.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("backend transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned HTTP {status}")]
    Http { status: u16 },

    #[error("malformed stream payload: {0}")]
    Protocol(String),

    #[error("stream ended before producing any reply text")]
    Empty,

    #[error("stream closed unexpectedly")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn test_request_carries_params_untouched() {
        let mut params = GenerationParams::default();
        params.insert("temperature", serde_json::json!(0.7));
        let request = GenerationRequest {
            user_message: "hi".to_string(),
            context: "ctx".to_string(),
            user_name: "You".to_string(),
            bot_name: "Bot".to_string(),
            history: ChatHistory::new(),
            params: params.clone(),
        };
        assert_eq!(request.params, params);
    }

    #[tokio::test]
    async fn test_boxed_iter_stream_satisfies_reply_stream() {
        let partials = vec![
            Ok("he".to_string()),
            Ok("hell".to_string()),
            Ok("hello".to_string()),
        ];
        let mut stream: ReplyStream = Box::pin(tokio_stream::iter(partials));
        let mut last = None;
        while let Some(item) = stream.next().await {
            last = Some(item.unwrap());
        }
        assert_eq!(last.as_deref(), Some("hello"));
    }

    #[test]
    fn test_generator_error_display() {
        assert!(GeneratorError::Http { status: 502 }
            .to_string()
            .contains("502"));
        assert!(GeneratorError::Empty.to_string().contains("any reply"));
        assert!(GeneratorError::Protocol("oops".to_string())
            .to_string()
            .contains("oops"));
    }
}
