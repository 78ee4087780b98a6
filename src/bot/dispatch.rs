//! Turns planned actions into injected input events and owns the pacing.
//!
//! `dispatch` does not return until the action has finished on the device
//! plus a jittered settle delay, which is what guarantees two actions can
//! never overlap: the loop is single-threaded and the dispatcher blocks it.

use crate::bot::types::{Action, Counters};
use crate::config::BotConfig;
use crate::device::types::InputInjector;
use crate::error::BotResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::time::sleep;

pub struct Dispatcher {
    rng: StdRng,
    settle_jitter_ms: u64,
    counters: Arc<Counters>,
}

impl Dispatcher {
    pub fn new(config: &BotConfig, counters: Arc<Counters>) -> Self {
        Self {
            // Distinct stream from the planner's so the two never entangle.
            rng: StdRng::seed_from_u64(config.rng_seed.wrapping_add(1)),
            settle_jitter_ms: config.jitter_ms,
            counters,
        }
    }

    /// Send `action` through `injector`, then block for its full duration
    /// plus settle jitter.
    pub async fn dispatch<I: InputInjector>(
        &mut self,
        injector: &mut I,
        action: &Action,
    ) -> BotResult<()> {
        let event = action.to_event();
        log::debug!("🎯 dispatching {}", event.describe());

        if let Err(e) = injector.send(&event).await {
            self.counters.injection_failures.fetch_add(1, Ordering::Relaxed);
            return Err(e);
        }

        match action {
            Action::Tap { .. } => self.counters.taps.fetch_add(1, Ordering::Relaxed),
            Action::Swipe { .. } => self.counters.swipes.fetch_add(1, Ordering::Relaxed),
            Action::Wait { .. } => self.counters.waits.fetch_add(1, Ordering::Relaxed),
        };

        let settle = Duration::from_millis(self.rng.gen_range(0..=self.settle_jitter_ms));
        sleep(action.duration() + settle).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::types::InputEvent;
    use crate::error::BotError;
    use std::time::Instant;

    #[derive(Default)]
    struct RecordingInjector {
        sent: Vec<InputEvent>,
        reject: bool,
    }

    impl InputInjector for RecordingInjector {
        async fn send(&mut self, event: &InputEvent) -> BotResult<()> {
            if self.reject {
                return Err(BotError::InputInjection {
                    event: event.describe(),
                    reason: "window lost focus".into(),
                });
            }
            self.sent.push(event.clone());
            Ok(())
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let cfg = BotConfig {
            jitter_ms: 20,
            ..BotConfig::default()
        };
        (Dispatcher::new(&cfg, counters.clone()), counters)
    }

    #[tokio::test]
    async fn blocks_for_the_full_action_duration() {
        let (mut dispatcher, _) = dispatcher();
        let mut injector = RecordingInjector::default();
        let action = Action::Swipe {
            x1: 100,
            y1: 800,
            x2: 120,
            y2: 340,
            duration_ms: 120,
        };

        let started = Instant::now();
        dispatcher.dispatch(&mut injector, &action).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(120));
        assert_eq!(injector.sent.len(), 1);
    }

    #[tokio::test]
    async fn rejection_surfaces_and_counts() {
        let (mut dispatcher, counters) = dispatcher();
        let mut injector = RecordingInjector {
            reject: true,
            ..Default::default()
        };

        let err = dispatcher
            .dispatch(&mut injector, &Action::Tap { x: 10, y: 10 })
            .await
            .unwrap_err();
        assert!(matches!(err, BotError::InputInjection { .. }));
        assert!(err.is_transient());
        assert_eq!(counters.injection_failures.load(Ordering::Relaxed), 1);
        assert_eq!(counters.taps.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn counts_dispatched_action_kinds() {
        let (mut dispatcher, counters) = dispatcher();
        let mut injector = RecordingInjector::default();

        dispatcher
            .dispatch(&mut injector, &Action::Tap { x: 5, y: 5 })
            .await
            .unwrap();
        dispatcher
            .dispatch(&mut injector, &Action::Wait { duration_ms: 1 })
            .await
            .unwrap();

        assert_eq!(counters.taps.load(Ordering::Relaxed), 1);
        assert_eq!(counters.waits.load(Ordering::Relaxed), 1);
        assert_eq!(injector.sent.len(), 2);
    }
}
