//! Chatbot arena: configure several bot personalities, run each user message
//! against all of them, vote blind on the best reply, and track win rates.
//!
//! ## Design
//! - `Arena` owns one session at a time and exposes command-style methods
//!   (`start_session`, `submit_message`, `accept_reply`, `stop_session`);
//!   any UI layer drives it and renders the returned state.
//! - Replies come from an injected [`ReplyGenerator`]; bots are visited
//!   sequentially in a random permutation so a streaming UI can show
//!   "reply N of K" progress, and the same permutation is the display
//!   order at vote time.
//! - Bots never see each other's replies from the in-flight round; the
//!   shared history only ever contains accepted replies.
//! - Nothing is persisted: stopping a session deletes all messages and
//!   statistics.

pub mod backend;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod generator;
pub mod history;
pub mod presets;
pub mod stats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use tokio_stream::StreamExt;
use uuid::Uuid;

pub use config::{BotConfig, BotSlot, CommonConfig, SessionConfig};
pub use error::ArenaError;
pub use events::{ArenaEvent, EventSender};
pub use generator::{GenerationRequest, GeneratorError, ReplyGenerator, ReplyStream};
pub use history::{ChatHistory, HistoryEntry};
pub use presets::GenerationParams;
pub use stats::{BotStats, RankingEntry, TableRow};

// ---------------------------------------------------------------------------
// Turn state machine
// ---------------------------------------------------------------------------

/// Where the session is in its turn cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Step {
    /// No session.
    Idle,
    /// Session active, ready for a new user message.
    AwaitingMessage,
    /// Replies are being produced.
    Generating,
    /// All replies in; waiting for the user's pick.
    AwaitingVote,
}

/// How a submitted round ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// Every bot replied; the session is waiting for a vote.
    AwaitingVote,
    /// The round was abandoned via the abort handle; no vote will happen.
    Aborted,
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// A bot in the live roster: immutable config plus its vote counter.
#[derive(Debug, Clone)]
struct Bot {
    config: BotConfig,
    stats: BotStats,
}

/// A generated-but-not-yet-voted-on reply.
#[derive(Debug, Clone, Serialize)]
pub struct PendingReply {
    pub bot_id: String,
    pub text: String,
    /// Roster slot, kept so duplicate identifiers still credit the right
    /// counter.
    #[serde(skip)]
    slot: usize,
}

#[derive(Debug)]
struct Session {
    id: Uuid,
    common: CommonConfig,
    bots: Vec<Bot>,
    step: Step,
    history: ChatHistory,
    /// Current round's replies, in display (permutation) order.
    pending: Vec<PendingReply>,
    /// The user message of the round awaiting a vote.
    pending_user: Option<String>,
    rounds_completed: u64,
}

/// Read-only view of everything a host renders.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub step: Step,
    pub session_id: Option<String>,
    pub history: Vec<HistoryEntry>,
    pub pending: Vec<PendingReply>,
    pub stats: Vec<TableRow>,
    pub rounds_completed: u64,
}

/// Cloneable flag for cancelling a round from outside the controller.
///
/// Raising it stops the round before the next bot starts; an in-flight
/// stream is abandoned wholesale between chunks. The flag clears itself
/// when a new round begins.
#[derive(Debug, Clone)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Arena — the controller
// ---------------------------------------------------------------------------

/// The arena controller: roster, turn state machine, randomized ordering,
/// vote tallying. One instance per logical session; instances share nothing.
pub struct Arena<G: ReplyGenerator> {
    generator: G,
    rng: Box<dyn RngCore + Send>,
    session: Option<Session>,
    event_tx: Option<EventSender>,
    abort: Arc<AtomicBool>,
}

impl<G: ReplyGenerator> Arena<G> {
    pub fn new(generator: G) -> Self {
        Arena::with_rng(generator, StdRng::from_entropy())
    }

    /// Construct with an explicit random source (deterministic tests).
    pub fn with_rng(generator: G, rng: impl RngCore + Send + 'static) -> Self {
        Arena {
            generator,
            rng: Box::new(rng),
            session: None,
            event_tx: None,
            abort: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attach a live event channel and return its receiving end.
    pub fn event_stream(&mut self) -> tokio::sync::mpsc::UnboundedReceiver<ArenaEvent> {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        self.event_tx = Some(tx);
        rx
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle(Arc::clone(&self.abort))
    }

    pub fn step(&self) -> Step {
        self.session.as_ref().map_or(Step::Idle, |s| s.step)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Idle → AwaitingMessage. Fails on an unusable roster or when a
    /// session is already running.
    pub fn start_session(&mut self, config: SessionConfig) -> Result<(), ArenaError> {
        if self.session.is_some() {
            return Err(ArenaError::InvalidState {
                operation: "start_session",
                state: self.step(),
            });
        }
        config.validate()?;

        let SessionConfig { common, bots, .. } = config;
        let id = Uuid::new_v4();
        let greeting = common.greeting.clone();
        let bot_count = bots.len();
        tracing::info!(session = %id, bots = bot_count, "session started");

        self.session = Some(Session {
            id,
            history: ChatHistory::with_greeting(common.greeting.as_deref()),
            common,
            bots: bots
                .into_iter()
                .map(|config| Bot {
                    config,
                    stats: BotStats::default(),
                })
                .collect(),
            step: Step::AwaitingMessage,
            pending: Vec::new(),
            pending_user: None,
            rounds_completed: 0,
        });
        self.abort.store(false, Ordering::SeqCst);
        self.emit(ArenaEvent::SessionStarted {
            session_id: id.to_string(),
            bot_count,
            greeting,
        });
        Ok(())
    }

    /// AwaitingMessage → Generating → AwaitingVote (or back to
    /// AwaitingMessage on abort/failure).
    ///
    /// Visits every enabled bot once, in a fresh uniform permutation, and
    /// streams each bot's partial replies out as [`ArenaEvent::ReplyDelta`].
    /// A generator failure aborts the whole round: no partial vote rounds.
    pub async fn submit_message(&mut self, text: &str) -> Result<RoundOutcome, ArenaError> {
        let state = self.step();
        if state != Step::AwaitingMessage {
            return Err(ArenaError::InvalidState {
                operation: "submit_message",
                state,
            });
        }
        self.abort.store(false, Ordering::SeqCst);

        let (order, total, history_snapshot, common) = {
            let session = self.session.as_mut().expect("state checked above");
            session.step = Step::Generating;
            session.pending.clear();
            session.pending_user = Some(text.to_string());

            let mut order: Vec<usize> = (0..session.bots.len()).collect();
            order.shuffle(&mut *self.rng);
            (
                order,
                session.bots.len(),
                session.history.clone(),
                session.common.clone(),
            )
        };
        tracing::info!(bots = total, "round started");
        self.emit(ArenaEvent::RoundStarted {
            user_message: text.to_string(),
            bot_count: total,
        });

        let mut replies: Vec<PendingReply> = Vec::with_capacity(total);
        for (index, &slot) in order.iter().enumerate() {
            if self.abort.load(Ordering::SeqCst) {
                return self.abort_round("abort requested before next bot");
            }
            let position = index + 1;
            let (bot_id, request) = {
                let session = self.session.as_ref().expect("session present mid-round");
                let bot = &session.bots[slot];
                (
                    bot.config.identifier.clone(),
                    GenerationRequest {
                        user_message: text.to_string(),
                        context: bot.config.context.clone(),
                        user_name: common.user_name.clone(),
                        bot_name: common.bot_name.clone(),
                        history: history_snapshot.clone(),
                        params: bot.config.params.clone(),
                    },
                )
            };
            tracing::debug!(bot = %bot_id, position, total, "generating reply");

            let mut stream = self.generator.generate(request);
            let mut final_text: Option<String> = None;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(partial) => {
                        self.emit(ArenaEvent::ReplyDelta {
                            bot_id: bot_id.clone(),
                            position,
                            total,
                            text: partial.clone(),
                        });
                        final_text = Some(partial);
                    }
                    Err(source) => {
                        drop(stream);
                        return self.fail_round(bot_id, source);
                    }
                }
                if self.abort.load(Ordering::SeqCst) {
                    // Abandon the in-flight stream wholesale; nothing from
                    // this bot is committed anywhere.
                    drop(stream);
                    return self.abort_round("abort requested mid-reply");
                }
            }

            let Some(final_text) = final_text else {
                return self.fail_round(bot_id, GeneratorError::Empty);
            };
            self.emit(ArenaEvent::ReplyComplete {
                bot_id: bot_id.clone(),
                position,
                total,
            });
            replies.push(PendingReply {
                bot_id,
                text: final_text,
                slot,
            });
        }

        let session = self.session.as_mut().expect("session present mid-round");
        session.pending = replies;
        session.step = Step::AwaitingVote;
        let display_order: Vec<String> = session
            .pending
            .iter()
            .map(|reply| reply.bot_id.clone())
            .collect();
        self.emit(ArenaEvent::VoteRequested {
            order: display_order,
        });
        Ok(RoundOutcome::AwaitingVote)
    }

    /// AwaitingVote → AwaitingMessage. Credits the chosen bot, appends the
    /// winning reply to the shared history, and discards the losers.
    pub fn accept_reply(&mut self, bot_id: &str) -> Result<(), ArenaError> {
        let state = self.step();
        if state != Step::AwaitingVote {
            return Err(ArenaError::InvalidState {
                operation: "accept_reply",
                state,
            });
        }
        let session = self.session.as_mut().expect("state checked above");

        // First pending match wins: duplicate identifiers resolve in
        // display order.
        let Some(chosen) = session
            .pending
            .iter()
            .find(|reply| reply.bot_id == bot_id)
            .cloned()
        else {
            return Err(ArenaError::InvalidSelection(bot_id.to_string()));
        };

        let user = session.pending_user.take().unwrap_or_default();
        session
            .history
            .push_round(&user, &chosen.text, &chosen.bot_id);
        session.bots[chosen.slot].stats.record_win();
        session.pending.clear();
        session.rounds_completed += 1;
        session.step = Step::AwaitingMessage;

        let votes = session.bots[chosen.slot].stats.votes;
        let rounds_completed = session.rounds_completed;
        debug_assert_eq!(
            session.bots.iter().map(|b| b.stats.votes).sum::<u64>(),
            rounds_completed
        );
        tracing::info!(bot = %chosen.bot_id, votes, "reply accepted");
        self.emit(ArenaEvent::ReplyAccepted {
            bot_id: chosen.bot_id,
            votes,
            rounds_completed,
        });
        Ok(())
    }

    /// Any state → Idle, discarding all session data. Idempotent.
    pub fn stop_session(&mut self) {
        if let Some(session) = self.session.take() {
            tracing::info!(
                session = %session.id,
                rounds = session.rounds_completed,
                "session stopped; messages and statistics discarded"
            );
            self.emit(ArenaEvent::SessionStopped);
        }
        self.abort.store(false, Ordering::SeqCst);
    }

    // -----------------------------------------------------------------------
    // Observable state
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        match &self.session {
            None => Snapshot {
                step: Step::Idle,
                session_id: None,
                history: Vec::new(),
                pending: Vec::new(),
                stats: Vec::new(),
                rounds_completed: 0,
            },
            Some(session) => Snapshot {
                step: session.step,
                session_id: Some(session.id.to_string()),
                history: session.history.entries().to_vec(),
                pending: session.pending.clone(),
                stats: stats::vote_table(&self.vote_counts()),
                rounds_completed: session.rounds_completed,
            },
        }
    }

    /// Current ranking; empty until the first vote is cast.
    pub fn ranking(&self) -> Vec<RankingEntry> {
        stats::ranking(&self.vote_counts())
    }

    fn vote_counts(&self) -> Vec<(String, u64)> {
        self.session
            .as_ref()
            .map(|session| {
                session
                    .bots
                    .iter()
                    .map(|bot| (bot.config.identifier.clone(), bot.stats.votes))
                    .collect()
            })
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Round teardown helpers
    // -----------------------------------------------------------------------

    fn abort_round(&mut self, reason: &str) -> Result<RoundOutcome, ArenaError> {
        self.abort.store(false, Ordering::SeqCst);
        self.discard_round();
        tracing::warn!(reason, "round aborted");
        self.emit(ArenaEvent::RoundAborted {
            reason: reason.to_string(),
        });
        Ok(RoundOutcome::Aborted)
    }

    fn fail_round(
        &mut self,
        bot: String,
        source: GeneratorError,
    ) -> Result<RoundOutcome, ArenaError> {
        self.discard_round();
        tracing::warn!(bot = %bot, error = %source, "generator failed; round discarded");
        self.emit(ArenaEvent::RoundAborted {
            reason: format!("generation failed for '{}'", bot),
        });
        Err(ArenaError::Generator { bot, source })
    }

    fn discard_round(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pending.clear();
            session.pending_user = None;
            session.step = Step::AwaitingMessage;
        }
    }

    fn emit(&self, event: ArenaEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
