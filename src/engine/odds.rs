//! Odds calculator.
//!
//! Live probability of each color being drawn next, derived purely from
//! the remaining shoe composition.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::types::{Color, GameError, RemainingCounts};

/// Both colors' odds as percentages with one decimal place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsSnapshot {
    pub black: Decimal,
    pub red: Decimal,
}

pub struct OddsCalculator;

impl OddsCalculator {
    /// `remaining(color) / total * 100`, rounded to one decimal place.
    pub fn odds_for(counts: RemainingCounts, color: Color) -> Result<Decimal, GameError> {
        let total = counts.total();
        if total == 0 {
            return Err(GameError::DivideByZero);
        }
        let pct = Decimal::from(counts.of(color) as u64) * Decimal::ONE_HUNDRED
            / Decimal::from(total as u64);
        Ok(pct.round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn snapshot(counts: RemainingCounts) -> Result<OddsSnapshot, GameError> {
        Ok(OddsSnapshot {
            black: Self::odds_for(counts, Color::Black)?,
            red: Self::odds_for(counts, Color::Red)?,
        })
    }
}
