//! Auto-bet controller.
//!
//! Drives a fixed number of identical-stake rounds back to back with a
//! pause between them. Cancellation is cooperative: `stop()` is checked
//! before every new round and cuts the inter-round pause short, but a
//! round already in flight always settles.

use rust_decimal::Decimal;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use crate::types::{GameError, RoundResult};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoBetState {
    Stopped,
    Running,
}

/// An auto-bet run in flight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoBetSession {
    pub id: Uuid,
    pub stake_per_round: Decimal,
    pub rounds_remaining: u32,
    pub rounds_completed: u32,
    pub active: bool,
}

/// How the most recent run ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoBetOutcome {
    pub session_id: Uuid,
    pub rounds_completed: u32,
    pub stopped_early: bool,
    /// The round failure that halted the run, if any.
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoBetStatus {
    pub state: AutoBetState,
    pub session: Option<AutoBetSession>,
    pub last_run: Option<AutoBetOutcome>,
}

impl AutoBetStatus {
    fn stopped() -> Self {
        Self {
            state: AutoBetState::Stopped,
            session: None,
            last_run: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state == AutoBetState::Running
    }

    pub fn rounds_remaining(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.rounds_remaining)
    }

    pub fn rounds_completed(&self) -> u32 {
        self.session.as_ref().map_or(0, |s| s.rounds_completed)
    }
}

/// What a finished run did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AutoBetReport {
    pub session_id: Uuid,
    pub rounds_requested: u32,
    pub results: Vec<RoundResult>,
    /// `stop()` ended the run before every round was played.
    pub stopped_early: bool,
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AutoBetController {
    status: Arc<watch::Sender<AutoBetStatus>>,
    interval: Duration,
}

impl AutoBetController {
    pub fn new(interval: Duration) -> Self {
        let (status, _) = watch::channel(AutoBetStatus::stopped());
        Self {
            status: Arc::new(status),
            interval,
        }
    }

    pub fn status(&self) -> AutoBetStatus {
        self.status.borrow().clone()
    }

    /// Watch status changes (one per started, completed or stopped round).
    pub fn subscribe(&self) -> watch::Receiver<AutoBetStatus> {
        self.status.subscribe()
    }

    /// Open a session of `rounds` rounds at `stake` each and mark the
    /// controller running. Rounds are played by [`drive`](Self::drive).
    pub fn start(&self, stake: Decimal, rounds: u32) -> Result<Uuid, GameError> {
        if rounds == 0 {
            return Err(GameError::InvalidRounds(rounds));
        }
        let id = Uuid::new_v4();
        let mut started = false;
        self.status.send_if_modified(|status| {
            if status.is_running() {
                return false;
            }
            status.state = AutoBetState::Running;
            status.session = Some(AutoBetSession {
                id,
                stake_per_round: stake,
                rounds_remaining: rounds,
                rounds_completed: 0,
                active: true,
            });
            started = true;
            true
        });
        if !started {
            return Err(GameError::AutoBetRunning);
        }
        info!(session = %id, stake = %stake, rounds, "Auto-bet started");
        Ok(id)
    }

    /// Request cancellation. No new round starts after this returns; the
    /// pending pause, if any, ends immediately.
    pub fn stop(&self) {
        let was_running = self.status.send_if_modified(|status| {
            if !status.is_running() {
                return false;
            }
            status.state = AutoBetState::Stopped;
            status.session = None;
            true
        });
        if was_running {
            info!("Auto-bet stop requested");
        }
    }

    /// Play the open session to completion using `play_round`, which runs
    /// one full round at the given stake.
    ///
    /// Returns when the rounds are exhausted, `stop()` is observed, or a
    /// round fails; the failure is returned as-is and nothing is retried.
    pub async fn drive<F, Fut>(&self, mut play_round: F) -> Result<AutoBetReport, GameError>
    where
        F: FnMut(Decimal) -> Fut,
        Fut: Future<Output = Result<RoundResult, GameError>>,
    {
        let Some(session) = self.status.borrow().session.clone() else {
            return Ok(AutoBetReport {
                session_id: Uuid::nil(),
                rounds_requested: 0,
                results: Vec::new(),
                stopped_early: false,
            });
        };
        let mut stop_rx = self.status.subscribe();
        let mut results = Vec::with_capacity(session.rounds_remaining as usize);

        let outcome = loop {
            if !self.is_current(session.id) || self.status().rounds_remaining() == 0 {
                break Ok(());
            }

            match play_round(session.stake_per_round).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(
                        session = %session.id,
                        completed = results.len(),
                        error = %e,
                        "Auto-bet halted by failed round"
                    );
                    break Err(e);
                }
            }
            self.status.send_if_modified(|status| match status.session.as_mut() {
                Some(s) if s.id == session.id => {
                    s.rounds_remaining = s.rounds_remaining.saturating_sub(1);
                    s.rounds_completed += 1;
                    true
                }
                _ => false,
            });

            if !self.is_current(session.id) || self.status().rounds_remaining() == 0 {
                break Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = wait_until_stopped(&mut stop_rx) => {}
            }
        };

        let stopped_early = (results.len() as u32) < session.rounds_remaining;
        self.finish(AutoBetOutcome {
            session_id: session.id,
            rounds_completed: results.len() as u32,
            stopped_early,
            error: outcome.as_ref().err().map(ToString::to_string),
        });

        info!(
            session = %session.id,
            played = results.len(),
            requested = session.rounds_remaining,
            stopped_early,
            "Auto-bet finished"
        );

        outcome.map(|()| AutoBetReport {
            session_id: session.id,
            rounds_requested: session.rounds_remaining,
            results,
            stopped_early,
        })
    }

    /// `start` followed by `drive`.
    pub async fn run<F, Fut>(
        &self,
        stake: Decimal,
        rounds: u32,
        play_round: F,
    ) -> Result<AutoBetReport, GameError>
    where
        F: FnMut(Decimal) -> Fut,
        Fut: Future<Output = Result<RoundResult, GameError>>,
    {
        self.start(stake, rounds)?;
        self.drive(play_round).await
    }

    fn is_current(&self, id: Uuid) -> bool {
        let status = self.status.borrow();
        status.is_running() && status.session.as_ref().is_some_and(|s| s.id == id)
    }

    /// Back to `Stopped` with no session and `outcome` as the last run,
    /// unless a newer session has already replaced this one.
    fn finish(&self, outcome: AutoBetOutcome) {
        self.status.send_if_modified(|status| {
            let owned = status
                .session
                .as_ref()
                .map_or(true, |s| s.id == outcome.session_id);
            if !owned {
                return false;
            }
            status.state = AutoBetState::Stopped;
            status.session = None;
            status.last_run = Some(outcome);
            true
        });
    }
}

async fn wait_until_stopped(rx: &mut watch::Receiver<AutoBetStatus>) {
    let _ = rx.wait_for(|s| !s.is_running()).await;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
