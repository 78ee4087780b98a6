//! Decides the next action from the current belief state and what is
//! visible.
//!
//! Pure policy table plus explicit, seeded jitter: the same (state, matches,
//! seed) always plans the same action, which keeps detectability-motivated
//! randomness fully reproducible under test.

use crate::bot::state::BotState;
use crate::bot::types::Action;
use crate::config::BotConfig;
use crate::vision::matcher::Match;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// Element labels the policy table recognizes.
pub const LABEL_THROW_TARGET: &str = "throw_target";
pub const LABEL_ENCOUNTER_TARGET: &str = "encounter_target";
pub const LABEL_CLOSE_BUTTON: &str = "close_button";
pub const LABEL_OK_BUTTON: &str = "ok_button";
pub const LABEL_MAP_BUTTON: &str = "map_button";

/// Vertical pull-back below the throw target where the throw swipe starts.
const THROW_PULL_PX: u32 = 520;
const THROW_DURATION_MS: u32 = 260;
/// Settle time for the ball-in-flight animation.
const CATCH_SETTLE_MS: u32 = 1600;

pub struct ActionPlanner {
    rng: StdRng,
    jitter_px: i64,
    jitter_ms: i64,
    screen_width: u32,
    screen_height: u32,
}

impl ActionPlanner {
    pub fn new(config: &BotConfig, screen_width: u32, screen_height: u32) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.rng_seed),
            jitter_px: i64::from(config.jitter_px),
            jitter_ms: config.jitter_ms as i64,
            screen_width,
            screen_height,
        }
    }

    /// Next action for this iteration, or `None` when the required elements
    /// are not visible yet and the loop should simply wait and re-observe.
    pub fn plan(
        &mut self,
        state: BotState,
        matches: &[Match],
        recovering: bool,
    ) -> Option<Action> {
        if recovering {
            return Some(self.go_home(matches));
        }

        match state {
            BotState::MainMenu => {
                let target = find(matches, LABEL_MAP_BUTTON)
                    .or_else(|| find(matches, LABEL_CLOSE_BUTTON))?;
                Some(self.tap(target.center()))
            }
            BotState::MapView => {
                let target = find(matches, LABEL_ENCOUNTER_TARGET)?;
                Some(self.tap(target.center()))
            }
            BotState::Encounter => {
                let target = find(matches, LABEL_THROW_TARGET)?;
                Some(self.throw(target.center()))
            }
            BotState::CatchThrow => Some(Action::Wait {
                duration_ms: self.jittered_ms(CATCH_SETTLE_MS),
            }),
            BotState::ErrorDialog => {
                let target = find(matches, LABEL_OK_BUTTON)
                    .or_else(|| find(matches, LABEL_CLOSE_BUTTON))?;
                Some(self.tap(target.center()))
            }
            BotState::Unknown => None,
        }
    }

    /// Designated go-home sequence after a forced reset: dismiss whatever is
    /// dismissable, else tap the fixed main-menu anchor at the bottom of the
    /// screen.
    fn go_home(&mut self, matches: &[Match]) -> Action {
        let dismiss = find(matches, LABEL_CLOSE_BUTTON)
            .or_else(|| find(matches, LABEL_OK_BUTTON))
            .or_else(|| find(matches, LABEL_MAP_BUTTON));
        match dismiss {
            Some(m) => self.tap(m.center()),
            None => {
                let anchor = (self.screen_width / 2, self.screen_height * 13 / 14);
                self.tap(anchor)
            }
        }
    }

    fn tap(&mut self, center: (u32, u32)) -> Action {
        let (x, y) = self.jittered_point(center);
        Action::Tap { x, y }
    }

    /// The throw: pull back below the target, swipe through its center. The
    /// start point gets a wider random offset than the end so consecutive
    /// throws never trace the same path.
    fn throw(&mut self, target: (u32, u32)) -> Action {
        let (x2, y2) = self.jittered_point(target);
        let start = (x2, y2.saturating_add(THROW_PULL_PX));
        let (x1, y1) = self.jittered_wide_point(start);
        Action::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms: self.jittered_ms(THROW_DURATION_MS),
        }
    }

    fn jittered_point(&mut self, (x, y): (u32, u32)) -> (u32, u32) {
        let j = self.jitter_px;
        let dx = self.rng.gen_range(-j..=j);
        let dy = self.rng.gen_range(-j..=j);
        (
            clamp_coord(x, dx, self.screen_width),
            clamp_coord(y, dy, self.screen_height),
        )
    }

    fn jittered_wide_point(&mut self, (x, y): (u32, u32)) -> (u32, u32) {
        let j = self.jitter_px * 3;
        let dx = self.rng.gen_range(-j..=j);
        let dy = self.rng.gen_range(-j..=j);
        (
            clamp_coord(x, dx, self.screen_width),
            clamp_coord(y, dy, self.screen_height),
        )
    }

    fn jittered_ms(&mut self, base: u32) -> u32 {
        let j = self.jitter_ms;
        let d = self.rng.gen_range(-j..=j);
        (i64::from(base) + d).max(0) as u32
    }
}

fn clamp_coord(base: u32, delta: i64, limit: u32) -> u32 {
    let max = i64::from(limit.saturating_sub(1));
    (i64::from(base) + delta).clamp(0, max) as u32
}

/// First match with the given label in an already best-first sequence.
fn find<'a>(matches: &'a [Match], label: &str) -> Option<&'a Match> {
    matches.iter().find(|m| m.label == label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::template::Region;

    fn config_with_seed(seed: u64) -> BotConfig {
        BotConfig {
            rng_seed: seed,
            ..BotConfig::default()
        }
    }

    fn seen(label: &str, x: u32, y: u32, width: u32, height: u32) -> Match {
        Match {
            label: label.to_string(),
            states: vec![],
            region: Region {
                x,
                y,
                width,
                height,
            },
            confidence: 0.92,
            scale: 1.0,
        }
    }

    #[test]
    fn identical_seed_plans_identical_actions() {
        let cfg = config_with_seed(42);
        let mut a = ActionPlanner::new(&cfg, 1080, 2280);
        let mut b = ActionPlanner::new(&cfg, 1080, 2280);

        let matches = vec![seen(LABEL_THROW_TARGET, 100, 320, 40, 40)];
        for _ in 0..10 {
            let planned_a = a.plan(BotState::Encounter, &matches, false);
            let planned_b = b.plan(BotState::Encounter, &matches, false);
            assert_eq!(planned_a, planned_b);
        }
    }

    #[test]
    fn different_seed_diverges() {
        let mut a = ActionPlanner::new(&config_with_seed(1), 1080, 2280);
        let mut b = ActionPlanner::new(&config_with_seed(2), 1080, 2280);
        let matches = vec![seen(LABEL_THROW_TARGET, 100, 320, 40, 40)];

        let plans_a: Vec<_> = (0..5)
            .map(|_| a.plan(BotState::Encounter, &matches, false))
            .collect();
        let plans_b: Vec<_> = (0..5)
            .map(|_| b.plan(BotState::Encounter, &matches, false))
            .collect();
        assert_ne!(plans_a, plans_b);
    }

    #[test]
    fn encounter_throw_swipes_through_target_center() {
        let cfg = config_with_seed(7);
        let jitter = cfg.jitter_px as i64;
        let mut planner = ActionPlanner::new(&cfg, 1080, 2280);

        // Target region centered at (120, 340).
        let matches = vec![seen(LABEL_THROW_TARGET, 100, 320, 40, 40)];
        match planner.plan(BotState::Encounter, &matches, false) {
            Some(Action::Swipe { x1, y1, x2, y2, duration_ms }) => {
                assert!((i64::from(x2) - 120).abs() <= jitter, "x2={x2}");
                assert!((i64::from(y2) - 340).abs() <= jitter, "y2={y2}");
                // The pull-back starts well below the target.
                assert!(y1 > y2 + 300);
                // Start offset compounds the end jitter with the wide one.
                assert!((i64::from(x1) - 120).abs() <= jitter * 4);
                assert!(duration_ms > 0);
            }
            other => panic!("expected swipe, got {other:?}"),
        }
    }

    #[test]
    fn waits_when_required_element_not_visible() {
        let cfg = config_with_seed(3);
        let mut planner = ActionPlanner::new(&cfg, 1080, 2280);

        assert_eq!(planner.plan(BotState::Encounter, &[], false), None);
        assert_eq!(planner.plan(BotState::MapView, &[], false), None);
        assert_eq!(planner.plan(BotState::Unknown, &[], false), None);

        // Off-policy elements do not trigger anything either.
        let matches = vec![seen(LABEL_OK_BUTTON, 10, 10, 20, 20)];
        assert_eq!(planner.plan(BotState::MapView, &matches, false), None);
    }

    #[test]
    fn error_dialog_taps_dismiss_button() {
        let cfg = config_with_seed(9);
        let jitter = cfg.jitter_px as i64;
        let mut planner = ActionPlanner::new(&cfg, 1080, 2280);

        let matches = vec![seen(LABEL_OK_BUTTON, 500, 1200, 60, 30)];
        match planner.plan(BotState::ErrorDialog, &matches, false) {
            Some(Action::Tap { x, y }) => {
                assert!((i64::from(x) - 530).abs() <= jitter);
                assert!((i64::from(y) - 1215).abs() <= jitter);
            }
            other => panic!("expected tap, got {other:?}"),
        }
    }

    #[test]
    fn catch_throw_waits_out_the_animation() {
        let cfg = config_with_seed(11);
        let mut planner = ActionPlanner::new(&cfg, 1080, 2280);
        match planner.plan(BotState::CatchThrow, &[], false) {
            Some(Action::Wait { duration_ms }) => {
                let base = i64::from(CATCH_SETTLE_MS);
                assert!((i64::from(duration_ms) - base).abs() <= cfg.jitter_ms as i64);
            }
            other => panic!("expected wait, got {other:?}"),
        }
    }

    #[test]
    fn recovery_always_produces_an_action() {
        let cfg = config_with_seed(13);
        let mut planner = ActionPlanner::new(&cfg, 1080, 2280);

        // Nothing visible: fall back to the fixed home anchor.
        match planner.plan(BotState::MainMenu, &[], true) {
            Some(Action::Tap { x, y }) => {
                assert!(x < 1080 + 40);
                assert!(y > 1800);
            }
            other => panic!("expected anchor tap, got {other:?}"),
        }

        // A visible dismiss button takes priority over the anchor.
        let matches = vec![seen(LABEL_CLOSE_BUTTON, 900, 100, 40, 40)];
        match planner.plan(BotState::MainMenu, &matches, true) {
            Some(Action::Tap { x, .. }) => assert!(x > 800),
            other => panic!("expected dismiss tap, got {other:?}"),
        }
    }
}
