//! Table, the thread-safe facade the presentation layer talks to.
//!
//! Wraps a [`RoundEngine`] in a single async mutex so every call is
//! serialized, owns the reveal pause between draw and settlement, and
//! runs auto-bet sessions on the tokio runtime.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{AppConfig, TimingConfig};
use crate::engine::autobet::{AutoBetController, AutoBetReport, AutoBetStatus};
use crate::engine::ledger::{Bet, LedgerView};
use crate::engine::odds::OddsSnapshot;
use crate::engine::round::{RoundEngine, RoundEvent, STAKE_DECIMALS};
use crate::types::{
    Color, DeckCount, GameError, PlayerStats, RemainingCounts, RoundPhase, RoundResult,
};

/// Consistent view of the shoe at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoeSnapshot {
    pub deck_count: DeckCount,
    pub remaining: RemainingCounts,
    pub cards_left: usize,
    pub odds: OddsSnapshot,
    pub phase: RoundPhase,
}

#[derive(Clone)]
pub struct Table {
    engine: Arc<Mutex<RoundEngine>>,
    auto_bet: AutoBetController,
    timing: TimingConfig,
}

impl Table {
    pub fn new(cfg: &AppConfig) -> Self {
        Self::from_engine(RoundEngine::new(&cfg.game), cfg.timing.clone())
    }

    pub fn from_engine(engine: RoundEngine, timing: TimingConfig) -> Self {
        let auto_bet = AutoBetController::new(timing.auto_bet_interval());
        Self {
            engine: Arc::new(Mutex::new(engine)),
            auto_bet,
            timing,
        }
    }

    // -- Commands ------------------------------------------------------------

    pub async fn select_color(&self, color: Color) -> Result<(), GameError> {
        self.engine.lock().await.select_color(color)
    }

    /// Stage the stake used by [`confirm_bet`](Self::confirm_bet). Returns
    /// the stake after rounding and clamping to the balance.
    pub async fn set_stake(&self, amount: Decimal) -> Result<Decimal, GameError> {
        self.engine.lock().await.set_stake(amount)
    }

    pub async fn set_deck_count(&self, deck_count: DeckCount) -> Result<(), GameError> {
        self.engine.lock().await.set_deck_count(deck_count)
    }

    /// Play one round with the staged stake on the selected color.
    pub async fn confirm_bet(&self) -> Result<RoundResult, GameError> {
        self.confirm_bet_with_multiplier(Decimal::ONE).await
    }

    /// Like [`confirm_bet`](Self::confirm_bet) with the staged stake scaled
    /// by `multiplier` (e.g. 0.5 or 2).
    ///
    /// The staged stake is read once the round holds the engine, so a
    /// `set_stake` queued ahead of it is honoured.
    pub async fn confirm_bet_with_multiplier(
        &self,
        multiplier: Decimal,
    ) -> Result<RoundResult, GameError> {
        self.run_round(move |engine| {
            (engine.staged_stake() * multiplier)
                .round_dp_with_strategy(STAKE_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        })
        .await
    }

    /// Play one round at `stake` on the selected color.
    pub async fn play_round(&self, stake: Decimal) -> Result<RoundResult, GameError> {
        self.run_round(move |_| stake).await
    }

    /// The round runs on its own task and holds the engine for its whole
    /// duration, so it settles even if the caller goes away mid-reveal.
    async fn run_round<F>(&self, stake: F) -> Result<RoundResult, GameError>
    where
        F: FnOnce(&RoundEngine) -> Decimal + Send + 'static,
    {
        let engine = Arc::clone(&self.engine);
        let reveal = self.timing.reveal_delay();
        let handle = tokio::spawn(async move {
            let mut engine = engine.lock().await;
            let stake = stake(&*engine);
            engine.place_selected_bet(stake)?;
            engine.draw()?;
            if !reveal.is_zero() {
                tokio::time::sleep(reveal).await;
            }
            engine.settle()
        });
        join(handle).await
    }

    /// Open an auto-bet session and play it in the background.
    ///
    /// Every round backs the color selected when the round starts. Fails
    /// immediately with `InvalidRounds`, `AutoBetRunning` or, when no color
    /// is selected yet, `InvalidBet`; round failures are reported through
    /// the returned handle.
    pub async fn start_auto_bet(
        &self,
        stake: Decimal,
        rounds: u32,
    ) -> Result<JoinHandle<Result<AutoBetReport, GameError>>, GameError> {
        if self.engine.lock().await.player().selected_color.is_none() && rounds > 0 {
            warn!("Auto-bet rejected: no color selected");
            return Err(GameError::InvalidBet("no color selected".to_string()));
        }
        let session = self.auto_bet.start(stake, rounds)?;
        let controller = self.auto_bet.clone();
        let table = self.clone();
        Ok(tokio::spawn(async move {
            let report = controller
                .drive(move |stake| {
                    let table = table.clone();
                    async move { table.play_round(stake).await }
                })
                .await;
            if let Err(e) = &report {
                error!(session = %session, error = %e, "Auto-bet session failed");
            }
            report
        }))
    }

    /// Run an auto-bet session to completion.
    pub async fn run_auto_bet(&self, stake: Decimal, rounds: u32) -> Result<AutoBetReport, GameError> {
        let handle = self.start_auto_bet(stake, rounds).await?;
        join(handle).await
    }

    pub fn stop_auto_bet(&self) {
        self.auto_bet.stop();
    }

    // -- Observers -----------------------------------------------------------

    pub async fn current_odds(&self, color: Color) -> Result<Decimal, GameError> {
        self.engine.lock().await.odds(color)
    }

    pub async fn remaining_counts(&self) -> RemainingCounts {
        self.engine.lock().await.remaining()
    }

    pub async fn deck_count(&self) -> DeckCount {
        self.engine.lock().await.shoe().deck_count()
    }

    /// Shoe composition, odds and round phase read under one lock.
    pub async fn shoe_snapshot(&self) -> Result<ShoeSnapshot, GameError> {
        let engine = self.engine.lock().await;
        let remaining = engine.remaining();
        Ok(ShoeSnapshot {
            deck_count: engine.shoe().deck_count(),
            remaining,
            cards_left: remaining.total(),
            odds: engine.odds_snapshot()?,
            phase: engine.phase(),
        })
    }

    pub async fn player_stats(&self) -> PlayerStats {
        self.engine.lock().await.player().clone()
    }

    pub async fn house_stats(&self) -> PlayerStats {
        self.engine.lock().await.house().clone()
    }

    pub async fn ledger_snapshot(&self) -> Vec<Bet> {
        self.engine.lock().await.ledger().snapshot()
    }

    pub async fn ledger_view(&self) -> LedgerView {
        self.engine.lock().await.ledger().view()
    }

    pub async fn last_results(&self, n: usize) -> Vec<Color> {
        self.engine.lock().await.last_results(n)
    }

    pub async fn round_phase(&self) -> RoundPhase {
        self.engine.lock().await.phase()
    }

    pub fn auto_bet_status(&self) -> AutoBetStatus {
        self.auto_bet.status()
    }

    pub fn watch_auto_bet(&self) -> watch::Receiver<AutoBetStatus> {
        self.auto_bet.subscribe()
    }

    /// Round events published from now on.
    pub async fn subscribe(&self) -> broadcast::Receiver<RoundEvent> {
        self.engine.lock().await.subscribe()
    }
}

async fn join<T>(handle: JoinHandle<Result<T, GameError>>) -> Result<T, GameError> {
    match handle.await {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => {
            info!(error = %e, "Table task cancelled");
            Err(GameError::Interrupted)
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::engine::shoe::{SeededRandom, Shoe};
    use crate::types::{Card, Party, Rank, Suit};
    use rust_decimal_macros::dec;

    fn table_with(cards: Vec<Card>, balance: Decimal) -> Table {
        paced_table(cards, balance, TimingConfig::immediate())
    }

    fn paced_table(cards: Vec<Card>, balance: Decimal, timing: TimingConfig) -> Table {
        let cfg = GameConfig {
            initial_balance: balance,
            ..GameConfig::default()
        };
        let shoe = Shoe::from_cards(DeckCount::SINGLE, cards).unwrap();
        let engine = RoundEngine::with_shoe(&cfg, shoe, Box::new(SeededRandom::from_seed(11)));
        Table::from_engine(engine, timing)
    }

    async fn let_tasks_run() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn black() -> Card {
        Card::new(Suit::Clubs, Rank::Ace)
    }

    fn red() -> Card {
        Card::new(Suit::Diamonds, Rank::Ace)
    }

    #[tokio::test]
    async fn test_confirm_bet_uses_selection_and_stake() {
        let table = table_with(vec![red(), black(), red()], dec!(10));
        table.select_color(Color::Black).await.unwrap();
        table.set_stake(dec!(1)).await.unwrap();

        let result = table.confirm_bet().await.unwrap();
        assert_eq!(result.winner, Party::House);
        assert_eq!(result.result_color, Color::Red);
        assert_eq!(result.new_balance, dec!(9));
        assert_eq!(table.house_stats().await.team, Some(Color::Red));
    }

    #[tokio::test]
    async fn test_confirm_without_stake_rejected() {
        let table = table_with(vec![red(), black()], dec!(10));
        table.select_color(Color::Red).await.unwrap();

        let err = table.confirm_bet().await.unwrap_err();
        assert!(matches!(err, GameError::InvalidBet(_)));
        assert_eq!(table.player_stats().await.balance, dec!(10));
        assert_eq!(table.remaining_counts().await.total(), 2);
        assert!(table.ledger_snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_multiplier_scales_stake() {
        let table = table_with(vec![black(), black(), red()], dec!(10));
        table.select_color(Color::Black).await.unwrap();
        table.set_stake(dec!(1.5)).await.unwrap();

        let result = table.confirm_bet_with_multiplier(dec!(2)).await.unwrap();
        assert_eq!(result.staked_amount, dec!(3));
        assert_eq!(result.new_balance, dec!(13));

        let half = table.confirm_bet_with_multiplier(dec!(0.5)).await.unwrap();
        assert_eq!(half.staked_amount, dec!(0.75));
    }

    #[tokio::test]
    async fn test_run_auto_bet_fills_ledger() {
        let cfg = AppConfig {
            timing: TimingConfig::immediate(),
            ..AppConfig::default()
        };
        let table = Table::new(&cfg);
        table.select_color(Color::Red).await.unwrap();

        let report = table.run_auto_bet(dec!(0.1), 5).await.unwrap();
        assert_eq!(report.results.len(), 5);
        assert_eq!(table.ledger_snapshot().await.len(), 5);
        assert!(!table.auto_bet_status().is_running());
    }

    #[tokio::test]
    async fn test_auto_bet_zero_rounds() {
        let table = table_with(vec![black(), red()], dec!(10));
        assert_eq!(
            table.start_auto_bet(dec!(1), 0).await.unwrap_err(),
            GameError::InvalidRounds(0)
        );
    }

    #[tokio::test]
    async fn test_auto_bet_needs_color() {
        let table = table_with(vec![black(), red()], dec!(10));
        let err = table.start_auto_bet(dec!(1), 3).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidBet(_)));
        assert!(!table.auto_bet_status().is_running());
    }

    #[tokio::test]
    async fn test_round_event_stream() {
        let table = table_with(vec![black(), red(), black()], dec!(10));
        let mut events = table.subscribe().await;
        table.select_color(Color::Black).await.unwrap();
        table.play_round(dec!(1)).await.unwrap();

        let mut settled = None;
        while let Ok(event) = events.try_recv() {
            if let RoundEvent::Settled(result) = event {
                settled = Some(result);
            }
        }
        assert_eq!(settled.unwrap().winner, Party::Player);
    }

    #[tokio::test]
    async fn test_confirm_reads_stake_when_round_starts() {
        let timing = TimingConfig {
            reveal_delay_ms: 20,
            auto_bet_interval_ms: 0,
        };
        let table = paced_table(vec![black(), black(), black(), red()], dec!(10), timing);
        table.select_color(Color::Black).await.unwrap();
        table.set_stake(dec!(1)).await.unwrap();

        let first = tokio::spawn({
            let table = table.clone();
            async move { table.confirm_bet().await }
        });
        let_tasks_run().await;
        // The first round now holds the engine through its reveal pause.
        let restake = tokio::spawn({
            let table = table.clone();
            async move { table.set_stake(dec!(4)).await }
        });
        let_tasks_run().await;
        let second = tokio::spawn({
            let table = table.clone();
            async move { table.confirm_bet().await }
        });

        assert_eq!(first.await.unwrap().unwrap().staked_amount, dec!(1));
        assert_eq!(restake.await.unwrap().unwrap(), dec!(4));
        let second = second.await.unwrap().unwrap();
        assert_eq!(second.staked_amount, dec!(4));
        assert_eq!(second.new_balance, dec!(15));
    }

    #[tokio::test]
    async fn test_shoe_snapshot_is_consistent() {
        let table = table_with(vec![black(), red(), red(), black()], dec!(10));
        table.select_color(Color::Red).await.unwrap();
        table.play_round(dec!(1)).await.unwrap();

        let snap = table.shoe_snapshot().await.unwrap();
        assert_eq!(snap.cards_left, 3);
        assert_eq!(snap.remaining, RemainingCounts { black: 1, red: 2 });
        assert_eq!(snap.odds.red, dec!(66.7));
        assert_eq!(snap.phase, RoundPhase::Idle);
        assert_eq!(snap.deck_count, DeckCount::SINGLE);
    }

    #[tokio::test]
    async fn test_ledger_view_totals() {
        let table = table_with(vec![red(), black(), red()], dec!(10));
        table.select_color(Color::Black).await.unwrap();
        table.play_round(dec!(2)).await.unwrap();

        let view = table.ledger_view().await;
        assert_eq!(view.bets.len(), 1);
        assert_eq!(view.net_result, dec!(-2));
        assert_eq!(view.capacity, 100);
    }
}
