//! Round engine: one bet → draw → settle cycle at a time.
//!
//! Owns the shoe, both parties' statistics and the bet ledger. Every
//! mutation goes through the round state machine:
//!
//! `Idle → BetPlaced → Drawing → Revealing → Settled → Idle`
//!
//! The stake is escrowed at `place_bet`: released together with an equal
//! payout on a win, forfeited on a loss. The engine is synchronous; any
//! pause between draw and settlement belongs to the caller.

use chrono::Utc;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::VecDeque;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::GameConfig;
use crate::engine::ledger::{Bet, BetLedger};
use crate::engine::odds::{OddsCalculator, OddsSnapshot};
use crate::engine::shoe::{RandomSource, SeededRandom, Shoe, ThreadRandom};
use crate::types::{
    Card, Color, DeckCount, GameError, Outcome, Party, PlayerStats, RemainingCounts, RoundPhase,
    RoundResult,
};

/// Decimal places a stake is rounded to.
pub const STAKE_DECIMALS: u32 = 3;

const EVENT_BUFFER: usize = 64;

// ---------------------------------------------------------------------------
// State & events
// ---------------------------------------------------------------------------

/// The bet escrowed for the round in flight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpenBet {
    pub id: Uuid,
    pub round: u64,
    pub stake: Decimal,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RoundState {
    Idle,
    BetPlaced(OpenBet),
    Drawing(OpenBet),
    Revealing { bet: OpenBet, card: Card },
    Settled(RoundResult),
}

impl RoundState {
    pub fn phase(&self) -> RoundPhase {
        match self {
            RoundState::Idle => RoundPhase::Idle,
            RoundState::BetPlaced(_) => RoundPhase::BetPlaced,
            RoundState::Drawing(_) => RoundPhase::Drawing,
            RoundState::Revealing { .. } => RoundPhase::Revealing,
            RoundState::Settled(_) => RoundPhase::Settled,
        }
    }
}

/// Notifications published to observers as rounds progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RoundEvent {
    BetPlaced(OpenBet),
    CardDrawn {
        round: u64,
        card: Card,
        /// Odds as they stood just before this card left the shoe.
        odds_before: OddsSnapshot,
    },
    Settled(RoundResult),
    ShoeRebuilt { deck_count: DeckCount, generation: u64 },
}

// ---------------------------------------------------------------------------
// Round engine
// ---------------------------------------------------------------------------

pub struct RoundEngine {
    state: RoundState,
    shoe: Shoe,
    rng: Box<dyn RandomSource>,
    player: PlayerStats,
    house: PlayerStats,
    ledger: BetLedger,
    recent_results: VecDeque<Color>,
    recent_limit: usize,
    staged_stake: Decimal,
    rounds_played: u64,
    events: broadcast::Sender<RoundEvent>,
}

impl RoundEngine {
    /// Engine with a thread-RNG shoe, or a seeded one when `seed` is set.
    pub fn new(cfg: &GameConfig) -> Self {
        let rng: Box<dyn RandomSource> = match cfg.seed {
            Some(seed) => Box::new(SeededRandom::from_seed(seed)),
            None => Box::new(ThreadRandom),
        };
        Self::with_rng(cfg, rng)
    }

    pub fn with_rng(cfg: &GameConfig, mut rng: Box<dyn RandomSource>) -> Self {
        let shoe = Shoe::build(cfg.deck_count, rng.as_mut());
        Self::with_shoe(cfg, shoe, rng)
    }

    /// Engine dealing from a prepared shoe. Later rebuilds use `rng`.
    pub fn with_shoe(cfg: &GameConfig, shoe: Shoe, rng: Box<dyn RandomSource>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            state: RoundState::Idle,
            shoe,
            rng,
            player: PlayerStats::new(&cfg.player_name, cfg.initial_balance),
            house: PlayerStats::new("House", cfg.house_balance),
            ledger: BetLedger::with_capacity(cfg.history_limit),
            recent_results: VecDeque::with_capacity(cfg.recent_results_limit),
            recent_limit: cfg.recent_results_limit,
            staged_stake: Decimal::ZERO,
            rounds_played: 0,
            events,
        }
    }

    // -- Pre-round setup -----------------------------------------------------

    /// Back `color` for the next round; the house takes the other one.
    pub fn select_color(&mut self, color: Color) -> Result<(), GameError> {
        self.require_idle("change color")?;
        self.player.assign(color);
        self.house.assign(color.opposite());
        debug!(player = %color, house = %color.opposite(), "Colors assigned");
        Ok(())
    }

    /// Stage a stake for the next confirmation. The amount is rounded to
    /// three decimals and clamped into `[0, balance]`; the staged value is
    /// returned.
    pub fn set_stake(&mut self, amount: Decimal) -> Result<Decimal, GameError> {
        self.require_idle("change the stake")?;
        let rounded =
            amount.round_dp_with_strategy(STAKE_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
        self.staged_stake = rounded.max(Decimal::ZERO).min(self.player.balance);
        Ok(self.staged_stake)
    }

    /// Switch the shoe size. Always rebuilds, even for the same size.
    pub fn set_deck_count(&mut self, deck_count: DeckCount) -> Result<(), GameError> {
        self.require_idle("change the deck count")?;
        self.shoe.resize(deck_count, self.rng.as_mut());
        info!(decks = deck_count.get(), "Deck count changed");
        self.emit(RoundEvent::ShoeRebuilt {
            deck_count,
            generation: self.shoe.generation(),
        });
        Ok(())
    }

    // -- Round state machine -------------------------------------------------

    /// Validate and escrow a stake on `color`.
    ///
    /// Fails with `InvalidBet` for a non-positive stake or one above the
    /// balance, leaving every piece of state untouched.
    pub fn place_bet(&mut self, stake: Decimal, color: Color) -> Result<OpenBet, GameError> {
        self.require_idle("place a bet")?;
        if stake <= Decimal::ZERO {
            warn!(stake = %stake, "Bet rejected: stake must be positive");
            return Err(GameError::InvalidBet(format!("stake must be positive, got {stake}")));
        }
        if stake > self.player.balance {
            warn!(stake = %stake, balance = %self.player.balance, "Bet rejected: insufficient balance");
            return Err(GameError::InvalidBet(format!(
                "stake {stake} exceeds balance {}",
                self.player.balance
            )));
        }

        self.player.assign(color);
        self.house.assign(color.opposite());

        self.player.balance -= stake;
        self.player.current_bet = stake;
        self.house.current_bet = stake;

        let bet = OpenBet {
            id: Uuid::new_v4(),
            round: self.rounds_played + 1,
            stake,
            color,
        };
        debug!(round = bet.round, id = %bet.id, stake = %stake, color = %color, "Bet placed");
        self.transition(RoundState::BetPlaced(bet));
        self.emit(RoundEvent::BetPlaced(bet));
        Ok(bet)
    }

    /// Bet on the currently selected color.
    pub fn place_selected_bet(&mut self, stake: Decimal) -> Result<OpenBet, GameError> {
        match self.player.selected_color {
            Some(color) => self.place_bet(stake, color),
            None => {
                self.require_idle("place a bet")?;
                warn!("Bet rejected: no color selected");
                Err(GameError::InvalidBet("no color selected".to_string()))
            }
        }
    }

    /// Deal the card for the open bet.
    pub fn draw(&mut self) -> Result<Card, GameError> {
        let bet = match &self.state {
            RoundState::BetPlaced(bet) => *bet,
            other => {
                return Err(GameError::InvalidTransition {
                    action: "draw",
                    phase: other.phase(),
                })
            }
        };
        self.transition(RoundState::Drawing(bet));

        if self.shoe.is_depleted() {
            self.reshuffle();
        }
        let drawn = OddsCalculator::snapshot(self.shoe.remaining())
            .and_then(|odds| self.shoe.draw().map(|card| (odds, card)));
        let (odds_before, card) = match drawn {
            Ok(drawn) => drawn,
            Err(e) => {
                self.void_bet(bet, &e);
                return Err(e);
            }
        };

        debug!(round = bet.round, card = %card, remaining = self.shoe.len(), "Card drawn");
        self.transition(RoundState::Revealing { bet, card });
        self.emit(RoundEvent::CardDrawn {
            round: bet.round,
            card,
            odds_before,
        });

        // Never leave a one-colored shoe behind for the next draw.
        if self.shoe.is_depleted() {
            self.reshuffle();
        }
        Ok(card)
    }

    /// Resolve the revealed card against the open bet.
    pub fn settle(&mut self) -> Result<RoundResult, GameError> {
        let (bet, card) = match &self.state {
            RoundState::Revealing { bet, card } => (*bet, *card),
            other => {
                return Err(GameError::InvalidTransition {
                    action: "settle",
                    phase: other.phase(),
                })
            }
        };

        let outcome = if card.color() == bet.color {
            Outcome::Win
        } else {
            Outcome::Loss
        };

        match outcome {
            Outcome::Win => {
                // Escrow back plus an even-money payout from the house.
                self.player.balance += bet.stake + bet.stake;
                self.house.balance -= bet.stake;
            }
            Outcome::Loss => {
                // Escrow forfeited to the house.
                self.house.balance += bet.stake;
            }
        }
        self.player.current_bet = Decimal::ZERO;
        self.house.current_bet = Decimal::ZERO;

        self.player.record(outcome);
        self.house.record(match outcome {
            Outcome::Win => Outcome::Loss,
            Outcome::Loss => Outcome::Win,
        });

        self.rounds_played = bet.round;
        self.ledger.append(Bet {
            id: bet.id,
            round: bet.round,
            amount: bet.stake,
            backed_color: bet.color,
            result_color: card.color(),
            outcome,
            balance_after: self.player.balance,
            timestamp: Utc::now(),
        });
        self.push_recent(card.color());

        let result = RoundResult {
            round: bet.round,
            winner: if outcome.is_win() { Party::Player } else { Party::House },
            staked_amount: bet.stake,
            result_color: card.color(),
            new_balance: self.player.balance,
            card,
        };

        info!(
            round = result.round,
            id = %bet.id,
            card = %card,
            outcome = %outcome,
            stake = %bet.stake,
            balance = %result.new_balance,
            streak = self.player.streak,
            win_rate = self.player.win_rate,
            "Round settled"
        );

        self.transition(RoundState::Settled(result.clone()));
        self.emit(RoundEvent::Settled(result.clone()));
        self.transition(RoundState::Idle);
        Ok(result)
    }

    /// `place_bet`, `draw` and `settle` back to back.
    pub fn play_round(&mut self, stake: Decimal, color: Color) -> Result<RoundResult, GameError> {
        self.place_bet(stake, color)?;
        self.draw()?;
        self.settle()
    }

    // -- Observers -----------------------------------------------------------

    pub fn phase(&self) -> RoundPhase {
        self.state.phase()
    }

    pub fn player(&self) -> &PlayerStats {
        &self.player
    }

    pub fn house(&self) -> &PlayerStats {
        &self.house
    }

    pub fn ledger(&self) -> &BetLedger {
        &self.ledger
    }

    pub fn staged_stake(&self) -> Decimal {
        self.staged_stake
    }

    pub fn remaining(&self) -> RemainingCounts {
        self.shoe.remaining()
    }

    pub fn odds(&self, color: Color) -> Result<Decimal, GameError> {
        OddsCalculator::odds_for(self.shoe.remaining(), color)
    }

    pub fn odds_snapshot(&self) -> Result<OddsSnapshot, GameError> {
        OddsCalculator::snapshot(self.shoe.remaining())
    }

    pub fn shoe(&self) -> &Shoe {
        &self.shoe
    }

    /// Up to `n` most recently drawn colors, newest first.
    pub fn last_results(&self, n: usize) -> Vec<Color> {
        self.recent_results.iter().take(n).copied().collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.events.subscribe()
    }

    // -- Internals -----------------------------------------------------------

    fn require_idle(&self, action: &'static str) -> Result<(), GameError> {
        match self.state.phase() {
            RoundPhase::Idle => Ok(()),
            phase => Err(GameError::InvalidTransition { action, phase }),
        }
    }

    fn transition(&mut self, next: RoundState) {
        debug!(from = %self.state.phase(), to = %next.phase(), "Round transition");
        self.state = next;
    }

    /// Refund an escrowed bet that could not be dealt and return to idle.
    fn void_bet(&mut self, bet: OpenBet, cause: &GameError) {
        error!(round = bet.round, id = %bet.id, error = %cause, "Draw failed, bet voided");
        self.player.balance += bet.stake;
        self.player.current_bet = Decimal::ZERO;
        self.house.current_bet = Decimal::ZERO;
        self.transition(RoundState::Idle);
    }

    fn reshuffle(&mut self) {
        let before = self.shoe.remaining();
        self.shoe.rebuild(self.rng.as_mut());
        info!(
            black_left = before.black,
            red_left = before.red,
            decks = self.shoe.deck_count().get(),
            "Color exhausted, shoe reshuffled"
        );
        self.emit(RoundEvent::ShoeRebuilt {
            deck_count: self.shoe.deck_count(),
            generation: self.shoe.generation(),
        });
    }

    fn push_recent(&mut self, color: Color) {
        if self.recent_limit == 0 {
            return;
        }
        if self.recent_results.len() == self.recent_limit {
            self.recent_results.pop_back();
        }
        self.recent_results.push_front(color);
    }

    fn emit(&self, event: RoundEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
