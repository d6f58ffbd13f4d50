//! Vote tallying and ranking.
//!
//! Pure functions over (identifier, votes) pairs; the arena owns the
//! counters and calls in here for display data.

use serde::{Deserialize, Serialize};

/// Per-bot vote counter. Owned 1:1 by a session bot; only `accept_reply`
/// increments it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotStats {
    pub votes: u64,
}

impl BotStats {
    pub fn record_win(&mut self) {
        self.votes = self.votes.saturating_add(1);
    }
}

/// One row of the relative-preference ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    pub identifier: String,
    /// This bot's share of all votes, in `[0, 1]`.
    pub share: f64,
}

/// One row of the raw statistics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub identifier: String,
    pub votes: u64,
    /// Integer percentage, rounded half away from zero. Rows sum to ~100;
    /// rounding drift is tolerated, not corrected.
    pub percent: u32,
}

/// Vote shares per bot, in roster order. Empty when no votes have been cast
/// yet (the ranking is undefined, and there is nothing to divide by).
pub fn ranking(votes: &[(String, u64)]) -> Vec<RankingEntry> {
    let total: u64 = votes.iter().map(|(_, v)| v).sum();
    if total == 0 {
        return Vec::new();
    }
    votes
        .iter()
        .map(|(identifier, count)| RankingEntry {
            identifier: identifier.clone(),
            share: *count as f64 / total as f64,
        })
        .collect()
}

/// Raw table rows per bot, in roster order. Percentages are zero when no
/// votes have been cast.
pub fn vote_table(votes: &[(String, u64)]) -> Vec<TableRow> {
    let total: u64 = votes.iter().map(|(_, v)| v).sum();
    votes
        .iter()
        .map(|(identifier, count)| TableRow {
            identifier: identifier.clone(),
            votes: *count,
            percent: if total == 0 {
                0
            } else {
                (*count as f64 / total as f64 * 100.0).round() as u32
            },
        })
        .collect()
}
