//! Core engine — the bet → draw → settle cycle and everything it owns.

pub mod shoe;
pub mod odds;
pub mod ledger;
pub mod round;
pub mod autobet;

pub use autobet::{AutoBetController, AutoBetOutcome, AutoBetReport, AutoBetStatus};
pub use ledger::{Bet, BetLedger};
pub use odds::{OddsCalculator, OddsSnapshot};
pub use round::{RoundEngine, RoundEvent, RoundState};
pub use shoe::{RandomSource, SeededRandom, Shoe, ThreadRandom};
