use colorbet::config::TimingConfig;
use colorbet::engine::RoundEvent;
use colorbet::types::{Color, GameError};
use rust_decimal_macros::dec;

use crate::{arranged_table, black, red, seeded_table};

fn slow_rounds() -> TimingConfig {
    TimingConfig {
        reveal_delay_ms: 0,
        auto_bet_interval_ms: 3_600_000,
    }
}

#[tokio::test]
async fn test_n_rounds_produce_n_entries() {
    let table = seeded_table(21, dec!(10), TimingConfig::immediate());
    table.select_color(Color::Black).await.unwrap();

    let report = table.run_auto_bet(dec!(0.1), 12).await.unwrap();
    assert_eq!(report.results.len(), 12);
    assert!(!report.stopped_early);
    assert_eq!(table.ledger_snapshot().await.len(), 12);

    let status = table.auto_bet_status();
    assert!(!status.is_running());
    assert_eq!(status.rounds_remaining(), 0);
    assert!(status.last_run.unwrap().error.is_none());
}

#[tokio::test]
async fn test_stop_mid_run_starts_no_more_rounds() {
    let table = seeded_table(4, dec!(10), slow_rounds());
    table.select_color(Color::Red).await.unwrap();

    let run = table.start_auto_bet(dec!(0.5), 5).await.unwrap();
    let mut status = table.watch_auto_bet();
    status.wait_for(|s| s.rounds_completed() >= 1).await.unwrap();
    table.stop_auto_bet();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.stopped_early);
    assert_eq!(table.ledger_snapshot().await.len(), 1);
    assert_eq!(table.auto_bet_status().rounds_remaining(), 0);
    assert!(!table.auto_bet_status().is_running());
}

#[tokio::test]
async fn test_second_start_rejected_while_running() {
    let table = seeded_table(8, dec!(10), slow_rounds());
    table.select_color(Color::Black).await.unwrap();

    let run = table.start_auto_bet(dec!(0.5), 3).await.unwrap();
    let err = table.start_auto_bet(dec!(0.5), 3).await.unwrap_err();
    assert_eq!(err, GameError::AutoBetRunning);

    table.stop_auto_bet();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_broke_player_halts_sequence() {
    let table = arranged_table(vec![red(), red(), red(), black()], dec!(1));
    table.select_color(Color::Black).await.unwrap();

    let err = table.run_auto_bet(dec!(1), 4).await.unwrap_err();
    assert!(matches!(err, GameError::InvalidBet(_)));

    assert_eq!(table.player_stats().await.balance, dec!(0));
    assert_eq!(table.ledger_snapshot().await.len(), 1);
    let status = table.auto_bet_status();
    assert!(!status.is_running());
    assert_eq!(status.rounds_remaining(), 0);
    assert!(status.last_run.unwrap().error.unwrap().contains("exceeds balance"));
}

#[tokio::test]
async fn test_stop_during_reveal_lets_round_settle() {
    let timing = TimingConfig {
        reveal_delay_ms: 100,
        auto_bet_interval_ms: 0,
    };
    let table = seeded_table(12, dec!(10), timing);
    table.select_color(Color::Black).await.unwrap();
    let mut events = table.subscribe().await;

    let run = table.start_auto_bet(dec!(1), 5).await.unwrap();
    loop {
        if let RoundEvent::CardDrawn { .. } = events.recv().await.unwrap() {
            break;
        }
    }
    // The first card is out and the round is in its reveal pause.
    table.stop_auto_bet();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.results.len(), 1);
    assert!(report.stopped_early);
    assert_eq!(table.ledger_snapshot().await.len(), 1);
    assert_eq!(table.player_stats().await.total_bets, 1);

    let status = table.auto_bet_status();
    assert!(!status.is_running());
    assert_eq!(status.rounds_remaining(), 0);
    assert_eq!(status.last_run.unwrap().rounds_completed, 1);
}
