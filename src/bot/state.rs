//! Belief state of the bot and the rules for changing it.
//!
//! The tracker is the single writer of [`BotState`]. It only moves on match
//! evidence that is both confident enough and legal per the adjacency table;
//! anything else holds the current state and counts toward desync.

use crate::vision::matcher::Match;
use serde::Serialize;

/// Which game screen the bot believes is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BotState {
    MainMenu,
    MapView,
    Encounter,
    CatchThrow,
    ErrorDialog,
    Unknown,
}

impl BotState {
    /// Parse a filename state tag, e.g. `map_view` in `map_view-menu_icon.png`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "main_menu" => Some(BotState::MainMenu),
            "map_view" => Some(BotState::MapView),
            "encounter" => Some(BotState::Encounter),
            "catch_throw" => Some(BotState::CatchThrow),
            "error_dialog" => Some(BotState::ErrorDialog),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            BotState::MainMenu => "main_menu",
            BotState::MapView => "map_view",
            BotState::Encounter => "encounter",
            BotState::CatchThrow => "catch_throw",
            BotState::ErrorDialog => "error_dialog",
            BotState::Unknown => "unknown",
        }
    }

    /// Fixed adjacency table. A throw can never land back on the main menu
    /// without passing through the encounter or the map first, and evidence
    /// never transitions *into* Unknown. Error dialogs can pop anywhere.
    pub fn can_reach(self, next: BotState) -> bool {
        use BotState::*;
        match self {
            Unknown => next != Unknown,
            MainMenu => matches!(next, MainMenu | MapView | ErrorDialog),
            MapView => matches!(next, MapView | MainMenu | Encounter | ErrorDialog),
            Encounter => matches!(next, Encounter | CatchThrow | MapView | ErrorDialog),
            CatchThrow => matches!(next, CatchThrow | Encounter | MapView | ErrorDialog),
            ErrorDialog => matches!(next, ErrorDialog | MainMenu | MapView | Encounter),
        }
    }
}

/// Outcome of feeding one iteration's match sequence to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Evidence accepted; the tracker moved (or confirmed) `to`.
    Accepted {
        from: BotState,
        to: BotState,
        label: String,
    },
    /// No acceptable evidence; state held, desync streak grew.
    Held,
    /// The desync streak hit the ceiling; state forced back to MainMenu.
    Recovered,
}

pub struct StateTracker {
    current: BotState,
    confidence_threshold: f32,
    desync_after: u32,
    max_recoveries: u32,
    desync_streak: u32,
    recoveries: u32,
    recovering: bool,
    last_label: Option<String>,
}

impl StateTracker {
    pub fn new(confidence_threshold: f32, desync_after: u32, max_recoveries: u32) -> Self {
        Self {
            current: BotState::Unknown,
            confidence_threshold,
            desync_after,
            max_recoveries,
            desync_streak: 0,
            recoveries: 0,
            recovering: false,
            last_label: None,
        }
    }

    pub fn current(&self) -> BotState {
        self.current
    }

    /// True between a forced reset and the next accepted transition; the
    /// planner uses this to run the go-home sequence.
    pub fn is_recovering(&self) -> bool {
        self.recovering
    }

    pub fn recoveries(&self) -> u32 {
        self.recoveries
    }

    pub fn desync_streak(&self) -> u32 {
        self.desync_streak
    }

    pub fn last_label(&self) -> Option<&str> {
        self.last_label.as_deref()
    }

    /// True once forced resets have not fixed anything often enough that the
    /// loop controller should give up.
    pub fn recovery_exhausted(&self) -> bool {
        self.recoveries > self.max_recoveries
    }

    /// Digest one iteration's ordered match sequence.
    ///
    /// The accepted transition is the best match that clears the confidence
    /// threshold and whose template is tagged for a state reachable from the
    /// current one. Multi-tagged templates resolve to their first legal tag.
    pub fn observe(&mut self, matches: &[Match]) -> Transition {
        for m in matches {
            if m.confidence < self.confidence_threshold {
                continue;
            }
            if let Some(&target) = m.states.iter().find(|&&s| self.current.can_reach(s)) {
                let from = self.current;
                if from != target {
                    log::info!("🎮 state {:?} -> {:?} via '{}'", from, target, m.label);
                }
                self.current = target;
                self.desync_streak = 0;
                self.recoveries = 0;
                self.recovering = false;
                self.last_label = Some(m.label.clone());
                return Transition::Accepted {
                    from,
                    to: target,
                    label: m.label.clone(),
                };
            }
        }

        self.desync_streak += 1;
        if self.desync_streak >= self.desync_after {
            log::warn!(
                "🔄 desync streak hit {}, forcing reset to MainMenu (recovery #{})",
                self.desync_streak,
                self.recoveries + 1
            );
            self.current = BotState::MainMenu;
            self.desync_streak = 0;
            self.recoveries += 1;
            self.recovering = true;
            return Transition::Recovered;
        }
        Transition::Held
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::template::Region;

    fn evidence(label: &str, state: BotState, confidence: f32) -> Match {
        Match {
            label: label.to_string(),
            states: vec![state],
            region: Region {
                x: 10,
                y: 10,
                width: 40,
                height: 40,
            },
            confidence,
            scale: 1.0,
        }
    }

    #[test]
    fn never_transitions_below_threshold() {
        let mut tracker = StateTracker::new(0.6, 5, 3);
        let matches = vec![evidence("menu_icon", BotState::MapView, 0.59)];
        assert_eq!(tracker.observe(&matches), Transition::Held);
        assert_eq!(tracker.current(), BotState::Unknown);
    }

    #[test]
    fn accepts_legal_confident_transition() {
        let mut tracker = StateTracker::new(0.8, 5, 3);
        let matches = vec![evidence("menu_icon", BotState::MapView, 0.93)];
        match tracker.observe(&matches) {
            Transition::Accepted { from, to, label } => {
                assert_eq!(from, BotState::Unknown);
                assert_eq!(to, BotState::MapView);
                assert_eq!(label, "menu_icon");
            }
            other => panic!("expected accepted transition, got {:?}", other),
        }
        assert_eq!(tracker.current(), BotState::MapView);
    }

    #[test]
    fn rejects_illegal_jump_and_holds() {
        let mut tracker = StateTracker::new(0.8, 5, 3);
        tracker.observe(&[evidence("menu_icon", BotState::MapView, 0.95)]);
        tracker.observe(&[evidence("throw_target", BotState::Encounter, 0.95)]);
        tracker.observe(&[evidence("ball_flight", BotState::CatchThrow, 0.95)]);
        assert_eq!(tracker.current(), BotState::CatchThrow);

        // CatchThrow -> MainMenu is not in the adjacency table.
        let jump = vec![evidence("close_button", BotState::MainMenu, 0.99)];
        assert_eq!(tracker.observe(&jump), Transition::Held);
        assert_eq!(tracker.current(), BotState::CatchThrow);
        assert_eq!(tracker.desync_streak(), 1);
    }

    #[test]
    fn falls_past_weak_match_to_next_acceptable() {
        let mut tracker = StateTracker::new(0.8, 5, 3);
        let matches = vec![
            evidence("ball_flight", BotState::CatchThrow, 0.75),
            evidence("menu_icon", BotState::MapView, 0.82),
        ];
        match tracker.observe(&matches) {
            Transition::Accepted { to, .. } => assert_eq!(to, BotState::MapView),
            other => panic!("expected accepted transition, got {:?}", other),
        }
    }

    #[test]
    fn forces_exactly_one_reset_at_ceiling() {
        let ceiling = 4;
        let mut tracker = StateTracker::new(0.8, ceiling, 3);
        tracker.observe(&[evidence("menu_icon", BotState::MapView, 0.95)]);

        for i in 1..ceiling {
            assert_eq!(tracker.observe(&[]), Transition::Held, "iteration {}", i);
            assert_eq!(tracker.current(), BotState::MapView);
        }
        // The ceiling-th consecutive rejection triggers the single reset.
        assert_eq!(tracker.observe(&[]), Transition::Recovered);
        assert_eq!(tracker.current(), BotState::MainMenu);
        assert!(tracker.is_recovering());
        assert_eq!(tracker.recoveries(), 1);

        // The very next rejection is a plain hold, not another reset.
        assert_eq!(tracker.observe(&[]), Transition::Held);
        assert_eq!(tracker.recoveries(), 1);
    }

    #[test]
    fn accepted_transition_clears_recovery() {
        let mut tracker = StateTracker::new(0.8, 2, 3);
        tracker.observe(&[]);
        tracker.observe(&[]);
        assert!(tracker.is_recovering());

        tracker.observe(&[evidence("menu_icon", BotState::MapView, 0.95)]);
        assert!(!tracker.is_recovering());
        assert_eq!(tracker.recoveries(), 0);
    }

    #[test]
    fn exhausts_after_too_many_recoveries() {
        let mut tracker = StateTracker::new(0.8, 1, 2);
        for _ in 0..2 {
            assert_eq!(tracker.observe(&[]), Transition::Recovered);
        }
        assert!(!tracker.recovery_exhausted());
        assert_eq!(tracker.observe(&[]), Transition::Recovered);
        assert!(tracker.recovery_exhausted());
    }
}
