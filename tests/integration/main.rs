//! End-to-end checks through the public `Table` facade.

mod auto_bet;
mod round_flow;

use colorbet::config::{GameConfig, TimingConfig};
use colorbet::engine::{RoundEngine, SeededRandom, Shoe};
use colorbet::table::Table;
use colorbet::types::{Card, DeckCount, Rank, Suit};
use rust_decimal::Decimal;

pub fn black() -> Card {
    Card::new(Suit::Spades, Rank::King)
}

pub fn red() -> Card {
    Card::new(Suit::Hearts, Rank::King)
}

/// A table dealing `cards` in order, with no presentation pauses.
pub fn arranged_table(cards: Vec<Card>, balance: Decimal) -> Table {
    let cfg = GameConfig {
        initial_balance: balance,
        ..GameConfig::default()
    };
    let shoe = Shoe::from_cards(DeckCount::SINGLE, cards).unwrap();
    let engine = RoundEngine::with_shoe(&cfg, shoe, Box::new(SeededRandom::from_seed(3)));
    Table::from_engine(engine, TimingConfig::immediate())
}

/// A fully shuffled seeded table.
pub fn seeded_table(seed: u64, balance: Decimal, timing: TimingConfig) -> Table {
    let cfg = GameConfig {
        initial_balance: balance,
        seed: Some(seed),
        ..GameConfig::default()
    };
    Table::from_engine(RoundEngine::new(&cfg), timing)
}
