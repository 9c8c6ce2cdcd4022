//! The shoe of shuffled decks cards are drawn from.
//!
//! Builds 1–3 standard decks, shuffles them with Fisher–Yates and deals
//! from the front without replacement, keeping a running count of each
//! color so odds can be read without scanning the cards.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::{debug, error};

use crate::types::{Card, Color, DeckCount, GameError, Rank, RemainingCounts, Suit};

// ---------------------------------------------------------------------------
// Random source
// ---------------------------------------------------------------------------

/// Uniform random index generator used by the shuffle.
///
/// The process-wide source is [`ThreadRandom`]; [`SeededRandom`] gives
/// reproducible shoes for replays and tests.
#[cfg_attr(test, mockall::automock)]
pub trait RandomSource: Send {
    /// A uniformly distributed index in `0..bound`. `bound` is never zero.
    fn index_below(&mut self, bound: usize) -> usize;
}

/// Backed by `rand::thread_rng()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index_below(&mut self, bound: usize) -> usize {
        rand::thread_rng().gen_range(0..bound)
    }
}

/// Deterministic source for reproducible shuffles.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    inner: StdRng,
}

impl SeededRandom {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index_below(&mut self, bound: usize) -> usize {
        self.inner.gen_range(0..bound)
    }
}

// ---------------------------------------------------------------------------
// Shoe
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Shoe {
    deck_count: DeckCount,
    cards: VecDeque<Card>,
    remaining_black: usize,
    remaining_red: usize,
    /// Number of times this shoe has been (re)built.
    generation: u64,
}

impl Shoe {
    /// Build and shuffle a fresh shoe of `deck_count` decks.
    pub fn build(deck_count: DeckCount, rng: &mut dyn RandomSource) -> Self {
        let mut shoe = Self {
            deck_count,
            cards: VecDeque::new(),
            remaining_black: 0,
            remaining_red: 0,
            generation: 0,
        };
        shoe.rebuild(rng);
        shoe
    }

    /// An arranged shoe dealing `cards` front to back, without shuffling.
    ///
    /// Used to replay a recorded shoe or to stage a specific draw. The
    /// cards must fit within a full shoe of `deck_count` decks.
    pub fn from_cards(deck_count: DeckCount, cards: Vec<Card>) -> Result<Self, GameError> {
        if cards.len() > deck_count.total_cards() {
            return Err(GameError::OversizedShoe {
                cards: cards.len(),
                capacity: deck_count.total_cards(),
            });
        }
        let remaining_black = cards.iter().filter(|c| c.color() == Color::Black).count();
        let remaining_red = cards.len() - remaining_black;
        Ok(Self {
            deck_count,
            cards: cards.into(),
            remaining_black,
            remaining_red,
            generation: 1,
        })
    }

    /// Replace the contents with a full, freshly shuffled shoe.
    pub fn rebuild(&mut self, rng: &mut dyn RandomSource) {
        let mut cards = standard_cards(self.deck_count);
        fisher_yates(&mut cards, rng);

        self.cards = cards.into();
        self.remaining_black = self.deck_count.cards_per_color();
        self.remaining_red = self.deck_count.cards_per_color();
        self.generation += 1;

        debug!(
            decks = self.deck_count.get(),
            cards = self.cards.len(),
            generation = self.generation,
            "Shoe built and shuffled"
        );
    }

    /// Change the number of decks and rebuild.
    pub fn resize(&mut self, deck_count: DeckCount, rng: &mut dyn RandomSource) {
        self.deck_count = deck_count;
        self.rebuild(rng);
    }

    /// Remove and return the front card.
    pub fn draw(&mut self) -> Result<Card, GameError> {
        let Some(card) = self.cards.pop_front() else {
            error!(decks = self.deck_count.get(), "Draw attempted on an empty shoe");
            return Err(GameError::EmptyShoe);
        };
        match card.color() {
            Color::Black => self.remaining_black -= 1,
            Color::Red => self.remaining_red -= 1,
        }
        Ok(card)
    }

    /// Whether one color has run out, so the next draw would be a foregone
    /// conclusion (or impossible).
    pub fn is_depleted(&self) -> bool {
        self.remaining_black == 0 || self.remaining_red == 0
    }

    pub fn remaining(&self) -> RemainingCounts {
        RemainingCounts {
            black: self.remaining_black,
            red: self.remaining_red,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn deck_count(&self) -> DeckCount {
        self.deck_count
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// `deck_count` concatenated decks in suit-then-rank order.
fn standard_cards(deck_count: DeckCount) -> Vec<Card> {
    let mut cards = Vec::with_capacity(deck_count.total_cards());
    for _ in 0..deck_count.get() {
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(suit, rank));
            }
        }
    }
    cards
}

/// In-place Fisher–Yates: for i from n-1 down to 1, swap i with a uniform
/// index in 0..=i.
fn fisher_yates(cards: &mut [Card], rng: &mut dyn RandomSource) {
    for i in (1..cards.len()).rev() {
        let j = rng.index_below(i + 1);
        cards.swap(i, j);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
