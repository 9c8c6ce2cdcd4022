//! Shared types for the COLORBET engine.
//!
//! These types form the data model used across all modules.
//! They are kept free of engine logic so that the shoe, round engine,
//! table facade and dashboard can depend on them without circular
//! references.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Colors
// ---------------------------------------------------------------------------

/// The two outcomes of the market. Player and house always back opposite
/// colors, so this is also the "team" a party plays for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    Black,
    Red,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::Black, Color::Red];

    /// The complementary color.
    pub fn opposite(&self) -> Self {
        match self {
            Color::Black => Color::Red,
            Color::Red => Color::Black,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => write!(f, "black"),
            Color::Red => write!(f, "red"),
        }
    }
}

/// Case-insensitive parse ("black", "RED", ...).
impl std::str::FromStr for Color {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "black" | "b" => Ok(Color::Black),
            "red" | "r" => Ok(Color::Red),
            _ => Err(anyhow::anyhow!("Unknown color: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Clubs,
    Hearts,
    Diamonds,
}

impl Suit {
    /// Black suits first, then red: the order a fresh deck is built in.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Clubs, Suit::Hearts, Suit::Diamonds];

    pub fn color(&self) -> Color {
        match self {
            Suit::Spades | Suit::Clubs => Color::Black,
            Suit::Hearts | Suit::Diamonds => Color::Red,
        }
    }

    pub fn symbol(&self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Clubs => '♣',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

/// A single playing card. The color is derived from the suit at
/// construction and cannot drift from it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Card {
    color: Color,
    suit: Suit,
    rank: Rank,
}

impl Card {
    pub fn new(suit: Suit, rank: Rank) -> Self {
        Self {
            color: suit.color(),
            suit,
            rank,
        }
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn suit(&self) -> Suit {
        self.suit
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

// ---------------------------------------------------------------------------
// Deck count
// ---------------------------------------------------------------------------

/// Number of standard decks in the shoe. Always 1, 2 or 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct DeckCount(u8);

impl DeckCount {
    pub const SINGLE: DeckCount = DeckCount(1);
    pub const DOUBLE: DeckCount = DeckCount(2);
    pub const TRIPLE: DeckCount = DeckCount(3);

    pub fn new(count: u8) -> Result<Self, GameError> {
        match count {
            1..=3 => Ok(DeckCount(count)),
            other => Err(GameError::InvalidDeckCount(other)),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Cards in a full shoe of this size.
    pub fn total_cards(&self) -> usize {
        52 * self.0 as usize
    }

    /// Cards of each color in a full shoe of this size.
    pub fn cards_per_color(&self) -> usize {
        26 * self.0 as usize
    }
}

impl Default for DeckCount {
    fn default() -> Self {
        DeckCount::SINGLE
    }
}

impl TryFrom<u8> for DeckCount {
    type Error = GameError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        DeckCount::new(value)
    }
}

impl From<DeckCount> for u8 {
    fn from(value: DeckCount) -> Self {
        value.0
    }
}

impl fmt::Display for DeckCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            1 => write!(f, "single"),
            2 => write!(f, "double"),
            _ => write!(f, "triple"),
        }
    }
}

/// Accepts the deck selector names ("single", "double", "triple") or digits.
impl std::str::FromStr for DeckCount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "1" => Ok(DeckCount::SINGLE),
            "double" | "2" => Ok(DeckCount::DOUBLE),
            "triple" | "3" => Ok(DeckCount::TRIPLE),
            _ => Err(anyhow::anyhow!("Unknown deck selection: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Parties & outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Party {
    Player,
    House,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Player => write!(f, "player"),
            Party::House => write!(f, "house"),
        }
    }
}

/// Settlement outcome from the player's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
}

impl Outcome {
    pub fn is_win(&self) -> bool {
        matches!(self, Outcome::Win)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Win => write!(f, "WIN"),
            Outcome::Loss => write!(f, "LOSS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Player statistics
// ---------------------------------------------------------------------------

/// Rolling statistics for one side of the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub name: String,
    pub balance: Decimal,
    /// Stake currently escrowed (or staged, before confirmation).
    pub current_bet: Decimal,
    pub wins: u64,
    pub total_bets: u64,
    pub streak: u64,
    /// `round(wins / total_bets * 100)`, 0 before the first bet.
    pub win_rate: u32,
    pub selected_color: Option<Color>,
    pub team: Option<Color>,
}

impl fmt::Display for PlayerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let team = self
            .team
            .map(|c| c.to_string().to_uppercase())
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{} [{}] balance={:.3} | bets={} (W{} L{}) | win_rate={}% | streak={}",
            self.name,
            team,
            self.balance,
            self.total_bets,
            self.wins,
            self.losses(),
            self.win_rate,
            self.streak,
        )
    }
}

impl PlayerStats {
    pub fn new(name: &str, balance: Decimal) -> Self {
        Self {
            name: name.to_string(),
            balance,
            current_bet: Decimal::ZERO,
            wins: 0,
            total_bets: 0,
            streak: 0,
            win_rate: 0,
            selected_color: None,
            team: None,
        }
    }

    /// Back a color for the coming round.
    pub fn assign(&mut self, color: Color) {
        self.selected_color = Some(color);
        self.team = Some(color);
    }

    /// Count a settled round towards wins, streak and win rate.
    pub fn record(&mut self, outcome: Outcome) {
        self.total_bets += 1;
        match outcome {
            Outcome::Win => {
                self.wins += 1;
                self.streak += 1;
            }
            Outcome::Loss => self.streak = 0,
        }
        self.win_rate = win_rate(self.wins, self.total_bets);
    }

    pub fn losses(&self) -> u64 {
        self.total_bets - self.wins
    }
}

/// Percentage of wins rounded to the nearest integer, halves rounding up.
pub fn win_rate(wins: u64, total: u64) -> u32 {
    if total == 0 {
        return 0;
    }
    ((wins * 200 + total) / (total * 2)) as u32
}

// ---------------------------------------------------------------------------
// Round state & results
// ---------------------------------------------------------------------------

/// Phase of the round state machine, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundPhase {
    Idle,
    BetPlaced,
    Drawing,
    Revealing,
    Settled,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoundPhase::Idle => write!(f, "idle"),
            RoundPhase::BetPlaced => write!(f, "bet placed"),
            RoundPhase::Drawing => write!(f, "drawing"),
            RoundPhase::Revealing => write!(f, "revealing"),
            RoundPhase::Settled => write!(f, "settled"),
        }
    }
}

/// The payload the presentation layer needs to render a finished round.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoundResult {
    pub round: u64,
    pub winner: Party,
    pub staked_amount: Decimal,
    pub result_color: Color,
    pub new_balance: Decimal,
    pub card: Card,
}

impl fmt::Display for RoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Round #{}: {} drawn ({}) | {} wins {:.3} | balance={:.3}",
            self.round,
            self.card,
            self.result_color,
            self.winner,
            self.staked_amount,
            self.new_balance,
        )
    }
}

/// Remaining composition of the shoe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemainingCounts {
    pub black: usize,
    pub red: usize,
}

impl RemainingCounts {
    pub fn total(&self) -> usize {
        self.black + self.red
    }

    pub fn of(&self, color: Color) -> usize {
        match color {
            Color::Black => self.black,
            Color::Red => self.red,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for COLORBET.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("Invalid bet: {0}")]
    InvalidBet(String),

    #[error("Invalid auto-bet round count: {0}")]
    InvalidRounds(u32),

    #[error("Invalid deck count: {0} (expected 1, 2 or 3)")]
    InvalidDeckCount(u8),

    #[error("Cannot {action} while the round is {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: RoundPhase,
    },

    #[error("{cards} cards do not fit a shoe of {capacity}")]
    OversizedShoe { cards: usize, capacity: usize },

    #[error("Auto-bet is already running")]
    AutoBetRunning,

    #[error("Round interrupted before settlement")]
    Interrupted,

    #[error("Shoe is empty")]
    EmptyShoe,

    #[error("Cannot compute odds: shoe is empty")]
    DivideByZero,
}

impl GameError {
    /// Whether the caller can correct the request and try again.
    /// `EmptyShoe` and `DivideByZero` mean the shoe bookkeeping is broken.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            GameError::EmptyShoe | GameError::DivideByZero | GameError::Interrupted
        )
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
