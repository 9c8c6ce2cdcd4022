//! Bounded, most-recent-first history of settled bets.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use uuid::Uuid;

use crate::types::{Color, Outcome};

/// Default number of settled bets retained.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// One settled bet. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bet {
    pub id: Uuid,
    pub round: u64,
    pub amount: Decimal,
    /// Color the player backed.
    pub backed_color: Color,
    /// Color of the card actually drawn.
    pub result_color: Color,
    pub outcome: Outcome,
    pub balance_after: Decimal,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Bet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} {:.3} on {} -> {} (balance {:.3})",
            self.round,
            self.outcome,
            self.amount,
            self.backed_color,
            self.result_color,
            self.balance_after,
        )
    }
}

/// Point-in-time copy of the ledger for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerView {
    pub bets: Vec<Bet>,
    pub capacity: usize,
    pub net_result: Decimal,
}

#[derive(Debug, Clone)]
pub struct BetLedger {
    entries: VecDeque<Bet>,
    capacity: usize,
}

impl Default for BetLedger {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_LIMIT)
    }
}

impl BetLedger {
    /// A ledger keeping at most `capacity` bets (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Prepend a bet, dropping the oldest entry once full.
    pub fn append(&mut self, bet: Bet) {
        if self.entries.len() == self.capacity {
            self.entries.pop_back();
        }
        self.entries.push_front(bet);
    }

    /// Copies of all retained bets, most recent first.
    pub fn snapshot(&self) -> Vec<Bet> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The retained bets together with the retention bound and net result.
    pub fn view(&self) -> LedgerView {
        LedgerView {
            bets: self.snapshot(),
            capacity: self.capacity,
            net_result: self.net_result(),
        }
    }

    /// Net result of the retained bets for the player.
    pub fn net_result(&self) -> Decimal {
        self.entries
            .iter()
            .map(|b| match b.outcome {
                Outcome::Win => b.amount,
                Outcome::Loss => -b.amount,
            })
            .sum()
    }
}
