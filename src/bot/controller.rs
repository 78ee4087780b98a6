//! The control loop: capture, match, track, plan, dispatch, delay.
//!
//! One iteration runs to completion before the next starts; the only
//! concurrency is inside the device collaborators. Stop requests are honored
//! between iterations so input is never left half-sent.

use crate::bot::dispatch::Dispatcher;
use crate::bot::planner::ActionPlanner;
use crate::bot::state::{StateTracker, Transition};
use crate::bot::types::{Action, BotEvent, ControlCommand, Counters, Snapshot};
use crate::config::BotConfig;
use crate::device::types::{FrameSource, InputInjector};
use crate::error::{BotError, BotResult};
use crate::vision::library::ReferenceLibrary;
use crate::vision::matcher::{Match, find_matches};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio::time::sleep;

pub struct LoopController<D: FrameSource + InputInjector> {
    config: BotConfig,
    library: ReferenceLibrary,
    device: D,
    dispatcher: Dispatcher,
    tracker: StateTracker,
    planner: ActionPlanner,
    delay_rng: StdRng,
    counters: Arc<Counters>,
    command_rx: mpsc::Receiver<ControlCommand>,
    event_tx: mpsc::Sender<BotEvent>,
    last_matches: Vec<Match>,
}

impl<D: FrameSource + InputInjector> LoopController<D> {
    pub fn new(
        config: BotConfig,
        library: ReferenceLibrary,
        device: D,
        command_rx: mpsc::Receiver<ControlCommand>,
        event_tx: mpsc::Sender<BotEvent>,
    ) -> Self {
        let counters = Arc::new(Counters::default());
        let (width, height) = device.screen_dimensions();
        Self {
            dispatcher: Dispatcher::new(&config, counters.clone()),
            tracker: StateTracker::new(
                config.state_confidence,
                config.desync_after,
                config.max_recoveries,
            ),
            planner: ActionPlanner::new(&config, width, height),
            delay_rng: StdRng::seed_from_u64(config.rng_seed.wrapping_add(2)),
            config,
            library,
            device,
            counters,
            command_rx,
            event_tx,
            last_matches: Vec::new(),
        }
    }

    /// Shared handle to the loop's counters for the operator layer.
    pub fn counters(&self) -> Arc<Counters> {
        self.counters.clone()
    }

    /// Run until a stop command or a fatal error. Transient failures are
    /// retried internally and never escape below the retry ceiling.
    pub async fn run(&mut self) -> BotResult<()> {
        log::info!("🚀 automation loop started");
        loop {
            if self.stop_requested() {
                log::info!("🛑 stop honored, loop exiting cleanly");
                return Ok(());
            }
            if let Err(e) = self.iterate().await {
                let snapshot = self.snapshot();
                log::error!("💀 fatal: {e}");
                log::error!("   diagnostic: {snapshot:?}");
                let _ = self.event_tx.try_send(BotEvent::Fatal(snapshot));
                return Err(e);
            }
        }
    }

    fn stop_requested(&mut self) -> bool {
        matches!(self.command_rx.try_recv(), Ok(ControlCommand::Stop))
    }

    async fn iterate(&mut self) -> BotResult<()> {
        let frame = self.capture_with_retry().await?;

        let current = self.tracker.current();
        let candidates = self.library.candidates(current);
        let matches = find_matches(&frame, &candidates, current, &self.config.match_settings);
        log::debug!(
            "🔍 {} candidates, {} matches in state {:?}",
            candidates.len(),
            matches.len(),
            current
        );

        match self.tracker.observe(&matches) {
            Transition::Accepted { from, to, .. } if from != to => {
                let _ = self.event_tx.try_send(BotEvent::StateChanged { from, to });
            }
            Transition::Accepted { .. } | Transition::Held => {}
            Transition::Recovered => {
                self.counters.recoveries.fetch_add(1, Ordering::Relaxed);
                let _ = self.event_tx.try_send(BotEvent::Recovered {
                    recoveries: self.tracker.recoveries(),
                });
            }
        }
        if self.tracker.recovery_exhausted() {
            self.last_matches = matches;
            return Err(BotError::Desync {
                recoveries: self.tracker.recoveries(),
            });
        }

        let planned = self.planner.plan(
            self.tracker.current(),
            &matches,
            self.tracker.is_recovering(),
        );
        self.last_matches = matches;

        if let Some(action) = planned {
            self.dispatch_with_retry(&action).await?;
            let _ = self.event_tx.try_send(BotEvent::ActionDispatched(action));
        }

        let (lo, hi) = self.config.loop_delay_ms;
        let delay = self.delay_rng.gen_range(lo..=hi.max(lo));
        sleep(Duration::from_millis(delay)).await;
        Ok(())
    }

    async fn capture_with_retry(&mut self) -> BotResult<crate::device::types::Frame> {
        let mut failures = 0u32;
        loop {
            match self.device.capture().await {
                Ok(frame) => {
                    self.counters.captures.fetch_add(1, Ordering::Relaxed);
                    return Ok(frame);
                }
                Err(e) if e.is_transient() => {
                    self.counters
                        .capture_timeouts
                        .fetch_add(1, Ordering::Relaxed);
                    failures += 1;
                    log::warn!("⚠️ capture failed ({failures}/{}): {e}", self.config.max_retries);
                    let _ = self
                        .event_tx
                        .try_send(BotEvent::TransientFailure(e.to_string()));
                    if failures >= self.config.max_retries {
                        return Err(BotError::RetryExhausted {
                            ceiling: self.config.max_retries,
                            source: Box::new(e),
                        });
                    }
                    sleep(self.backoff(failures)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn dispatch_with_retry(&mut self, action: &Action) -> BotResult<()> {
        let mut failures = 0u32;
        loop {
            match self.dispatcher.dispatch(&mut self.device, action).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_transient() => {
                    failures += 1;
                    log::warn!("⚠️ dispatch failed ({failures}/{}): {e}", self.config.max_retries);
                    let _ = self
                        .event_tx
                        .try_send(BotEvent::TransientFailure(e.to_string()));
                    if failures >= self.config.max_retries {
                        return Err(BotError::RetryExhausted {
                            ceiling: self.config.max_retries,
                            source: Box::new(e),
                        });
                    }
                    sleep(self.backoff(failures)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Exponential backoff: base, 2x, 4x, ...
    fn backoff(&self, failures: u32) -> Duration {
        self.config.retry_backoff * 2u32.saturating_pow(failures.saturating_sub(1))
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.tracker.current(),
            last_matches: self.last_matches.clone(),
            desync_streak: self.tracker.desync_streak(),
            recoveries: self.tracker.recoveries(),
            unix_millis: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
        }
    }
}
