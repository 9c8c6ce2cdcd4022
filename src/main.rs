//! COLORBET — player-vs-house card color betting engine
//!
//! Entry point. Loads configuration, initialises structured logging,
//! serves the dashboard API and optionally plays a configured auto-bet
//! run, then waits for Ctrl+C.

use anyhow::Result;
use tracing::{error, info, warn};

use colorbet::config;
use colorbet::dashboard;
use colorbet::table::Table;

const BANNER: &str = r#"
  ____ ___  _     ___  ____  ____  _____ _____
 / ___/ _ \| |   / _ \|  _ \| __ )| ____|_   _|
| |  | | | | |  | | | | |_) |  _ \|  _|   | |
| |__| |_| | |__| |_| |  _ <| |_) | |___  | |
 \____\___/|_____\___/|_| \_\____/|_____| |_|

  Black or red, player versus house
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cfg = config::AppConfig::load_or_default("config.toml")?;

    init_logging();

    println!("{BANNER}");
    info!(
        player = %cfg.game.player_name,
        balance = %cfg.game.initial_balance,
        decks = cfg.game.deck_count.get(),
        seeded = cfg.game.seed.is_some(),
        "COLORBET starting up"
    );

    let table = Table::new(&cfg);

    if cfg.dashboard.enabled {
        dashboard::spawn_dashboard(table.clone(), cfg.dashboard.port).await?;
    }

    let auto_run = if cfg.auto_bet.enabled {
        table.select_color(cfg.auto_bet.color).await?;
        Some(table.start_auto_bet(cfg.auto_bet.stake, cfg.auto_bet.rounds).await?)
    } else {
        None
    };

    match auto_run {
        Some(run) if !cfg.dashboard.enabled => {
            // Headless: exit once the run is over.
            tokio::select! {
                joined = run => match joined {
                    Ok(Ok(report)) => info!(
                        played = report.results.len(),
                        requested = report.rounds_requested,
                        "Auto-bet run complete"
                    ),
                    Ok(Err(e)) => warn!(error = %e, "Auto-bet run halted"),
                    Err(e) => error!(error = %e, "Auto-bet task failed"),
                },
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutdown signal received.");
                    table.stop_auto_bet();
                }
            }
        }
        _ => {
            info!("Table open. Press Ctrl+C to stop.");
            tokio::signal::ctrl_c().await?;
            info!("Shutdown signal received.");
            table.stop_auto_bet();
        }
    }

    let player = table.player_stats().await;
    info!(stats = %player, "COLORBET shut down cleanly.");

    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("colorbet=info"));

    let json_logging = std::env::var("COLORBET_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
