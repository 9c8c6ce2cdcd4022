use colorbet::config::TimingConfig;
use colorbet::types::{Color, DeckCount, GameError, Outcome, Party, RoundPhase};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashSet;

use crate::{arranged_table, black, red, seeded_table};

#[tokio::test]
async fn test_forced_red_against_black_loses_one() {
    let table = arranged_table(vec![red(), black(), red()], dec!(10));
    table.select_color(Color::Black).await.unwrap();
    table.set_stake(dec!(1)).await.unwrap();

    let result = table.confirm_bet().await.unwrap();
    assert_eq!(result.winner, Party::House);
    assert_eq!(result.staked_amount, dec!(1));
    assert_eq!(result.result_color, Color::Red);
    assert_eq!(result.new_balance, dec!(9));

    let player = table.player_stats().await;
    assert_eq!(player.balance, dec!(9));
    assert_eq!(player.current_bet, Decimal::ZERO);
    assert_eq!(player.streak, 0);
    assert_eq!(player.win_rate, 0);

    let house = table.house_stats().await;
    assert_eq!(house.wins, 1);
    assert_eq!(house.balance, dec!(1000001));

    let history = table.ledger_snapshot().await;
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].outcome, Outcome::Loss);
    assert_eq!(history[0].balance_after, dec!(9));
    assert_eq!(table.round_phase().await, RoundPhase::Idle);
}

#[tokio::test]
async fn test_rejected_stakes_change_nothing() {
    let table = arranged_table(vec![red(), black(), red()], dec!(10));
    table.select_color(Color::Red).await.unwrap();

    for stake in [dec!(0), dec!(-1), dec!(10.001), dec!(11)] {
        let err = table.play_round(stake).await.unwrap_err();
        assert!(matches!(err, GameError::InvalidBet(_)), "stake {stake}: {err}");
    }

    assert_eq!(table.player_stats().await.balance, dec!(10));
    assert_eq!(table.player_stats().await.total_bets, 0);
    assert_eq!(table.remaining_counts().await.total(), 3);
    assert!(table.ledger_snapshot().await.is_empty());
    assert_eq!(table.round_phase().await, RoundPhase::Idle);
}

#[tokio::test]
async fn test_one_colored_shoe_rebuilt_before_next_draw() {
    let table = arranged_table(vec![black(), red(), red(), red()], dec!(10));
    table.select_color(Color::Black).await.unwrap();
    assert_eq!(table.current_odds(Color::Black).await.unwrap(), dec!(25.0));

    table.play_round(dec!(1)).await.unwrap();

    let counts = table.remaining_counts().await;
    assert_eq!(counts.black, 26);
    assert_eq!(counts.red, 26);

    table.play_round(dec!(1)).await.unwrap();
    assert_eq!(table.remaining_counts().await.total(), 51);
}

#[tokio::test]
async fn test_counts_fall_by_one_per_draw() {
    let table = seeded_table(17, dec!(100), TimingConfig::immediate());
    table.select_color(Color::Red).await.unwrap();

    for drawn in 1..=20usize {
        table.play_round(dec!(0.5)).await.unwrap();
        let counts = table.remaining_counts().await;
        assert_eq!(counts.black + counts.red, 52 - drawn);
    }
}

#[tokio::test]
async fn test_balance_moves_exactly_by_stake() {
    let table = seeded_table(99, dec!(50), TimingConfig::immediate());
    table.select_color(Color::Black).await.unwrap();

    let mut wins = 0u64;
    let mut streak = 0u64;
    for round in 1..=30u64 {
        let before = table.player_stats().await.balance;
        let result = table.play_round(dec!(0.25)).await.unwrap();
        assert_eq!(result.round, round);

        if result.winner == Party::Player {
            assert_eq!(result.new_balance, before + dec!(0.25));
            wins += 1;
            streak += 1;
        } else {
            assert_eq!(result.new_balance, before - dec!(0.25));
            streak = 0;
        }

        let player = table.player_stats().await;
        assert_eq!(player.wins, wins);
        assert_eq!(player.streak, streak);
        assert_eq!(player.win_rate, ((wins * 200 + round) / (round * 2)) as u32);
    }

    assert_eq!(table.ledger_snapshot().await.len(), 30);
    assert_eq!(table.last_results(100).await.len(), 10);
}

#[tokio::test]
async fn test_concurrent_bets_are_serialized() {
    let timing = TimingConfig {
        reveal_delay_ms: 5,
        auto_bet_interval_ms: 0,
    };
    let table = seeded_table(7, dec!(10), timing);
    table.select_color(Color::Red).await.unwrap();

    let handles: Vec<_> = (0..5)
        .map(|_| {
            let table = table.clone();
            tokio::spawn(async move { table.play_round(dec!(1)).await })
        })
        .collect();

    let mut rounds = HashSet::new();
    for handle in handles {
        let result = handle.await.unwrap().unwrap();
        rounds.insert(result.round);
    }
    assert_eq!(rounds, (1..=5).collect::<HashSet<u64>>());
    assert_eq!(table.ledger_snapshot().await.len(), 5);
    assert_eq!(table.remaining_counts().await.total(), 47);
}

#[tokio::test]
async fn test_deck_change_resets_shoe() {
    let table = seeded_table(1, dec!(10), TimingConfig::immediate());
    table.select_color(Color::Black).await.unwrap();
    table.play_round(dec!(1)).await.unwrap();

    table.set_deck_count(DeckCount::TRIPLE).await.unwrap();
    let counts = table.remaining_counts().await;
    assert_eq!(counts.black, 78);
    assert_eq!(counts.red, 78);
    assert_eq!(table.deck_count().await, DeckCount::TRIPLE);
    assert_eq!(table.current_odds(Color::Red).await.unwrap(), dec!(50.0));
}
