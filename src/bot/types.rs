// Shared types for the automation loop: planned actions, control commands,
// operator-facing events and counters.
use crate::bot::state::BotState;
use crate::device::types::InputEvent;
use crate::vision::matcher::Match;
use serde::Serialize;
use std::sync::atomic::AtomicU64;
use std::time::Duration;
use tokio::sync::mpsc;

/// A planned action, one per loop iteration at most.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Action {
    Tap { x: u32, y: u32 },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: u32,
    },
    Wait { duration_ms: u32 },
}

impl Action {
    /// How long the dispatcher must block for this action to finish on the
    /// device. Taps are effectively instantaneous.
    pub fn duration(&self) -> Duration {
        match self {
            Action::Tap { .. } => Duration::ZERO,
            Action::Swipe { duration_ms, .. } | Action::Wait { duration_ms } => {
                Duration::from_millis(u64::from(*duration_ms))
            }
        }
    }

    pub fn to_event(&self) -> InputEvent {
        match *self {
            Action::Tap { x, y } => InputEvent::Tap { x, y },
            Action::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            } => InputEvent::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            },
            Action::Wait { duration_ms } => InputEvent::Wait { duration_ms },
        }
    }
}

/// Commands the operator layer can send into the loop. Stop is cooperative:
/// the in-flight iteration completes before the loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlCommand {
    Stop,
}

/// Events emitted for the operator layer. Sends are best-effort; an absent
/// listener never stalls the loop.
#[derive(Debug, Clone, Serialize)]
pub enum BotEvent {
    StateChanged { from: BotState, to: BotState },
    Recovered { recoveries: u32 },
    ActionDispatched(Action),
    TransientFailure(String),
    Fatal(Snapshot),
}

/// Diagnostic state dump surfaced on fatal stops.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub state: BotState,
    pub last_matches: Vec<Match>,
    pub desync_streak: u32,
    pub recoveries: u32,
    pub unix_millis: u64,
}

/// Counters the operator layer may inspect at any time. Every caught
/// transient failure lands in one of these; nothing is silently swallowed.
#[derive(Debug, Default)]
pub struct Counters {
    pub captures: AtomicU64,
    pub capture_timeouts: AtomicU64,
    pub injection_failures: AtomicU64,
    pub taps: AtomicU64,
    pub swipes: AtomicU64,
    pub waits: AtomicU64,
    pub recoveries: AtomicU64,
}

pub fn control_channels() -> (
    mpsc::Sender<ControlCommand>,
    mpsc::Receiver<ControlCommand>,
    mpsc::Sender<BotEvent>,
    mpsc::Receiver<BotEvent>,
) {
    let (cmd_tx, cmd_rx) = mpsc::channel(8);
    let (event_tx, event_rx) = mpsc::channel(64);
    (cmd_tx, cmd_rx, event_tx, event_rx)
}
