//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every section and field has a default, so a partial (or empty) file
//! is valid.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::engine::ledger::DEFAULT_HISTORY_LIMIT;
use crate::types::{Color, DeckCount};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub game: GameConfig,
    pub timing: TimingConfig,
    pub auto_bet: AutoBetConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GameConfig {
    pub player_name: String,
    pub initial_balance: Decimal,
    pub house_balance: Decimal,
    pub deck_count: DeckCount,
    /// Settled bets kept in the ledger.
    pub history_limit: usize,
    /// Drawn colors kept for the recent-results strip.
    pub recent_results_limit: usize,
    /// Seed for a reproducible shoe. Unset means the thread RNG.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            player_name: "Player".to_string(),
            initial_balance: dec!(10),
            house_balance: dec!(1000000),
            deck_count: DeckCount::SINGLE,
            history_limit: DEFAULT_HISTORY_LIMIT,
            recent_results_limit: 10,
            seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TimingConfig {
    /// Pause between the draw and settlement of a round.
    pub reveal_delay_ms: u64,
    /// Pause between auto-bet rounds.
    pub auto_bet_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: 1000,
            auto_bet_interval_ms: 3000,
        }
    }
}

impl TimingConfig {
    /// No presentation pacing at all, for headless use and tests.
    pub fn immediate() -> Self {
        Self {
            reveal_delay_ms: 0,
            auto_bet_interval_ms: 0,
        }
    }

    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }

    pub fn auto_bet_interval(&self) -> Duration {
        Duration::from_millis(self.auto_bet_interval_ms)
    }
}

/// An auto-bet run started by the binary at launch.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AutoBetConfig {
    pub enabled: bool,
    pub stake: Decimal,
    pub rounds: u32,
    pub color: Color,
}

impl Default for AutoBetConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stake: dec!(0.1),
            rounds: 10,
            color: Color::Black,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 8080,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.game.initial_balance < Decimal::ZERO {
            anyhow::bail!("game.initial_balance must not be negative");
        }
        if self.auto_bet.enabled && self.auto_bet.rounds == 0 {
            anyhow::bail!("auto_bet.rounds must be positive when auto_bet is enabled");
        }
        Ok(())
    }
}
