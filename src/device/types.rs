// Core device types and the two collaborator traits. The frame source and
// the input injector are the only points where the bot touches real external
// state; everything behind them operates on immutable snapshots.
use crate::error::BotResult;
use image::GrayImage;
use serde::Serialize;
use std::time::Instant;

/// One captured screen image with its monotonic capture timestamp. Lives for
/// a single loop iteration.
#[derive(Debug, Clone)]
pub struct Frame {
    pub gray: GrayImage,
    pub captured_at: Instant,
}

impl Frame {
    pub fn new(gray: GrayImage) -> Self {
        Self {
            gray,
            captured_at: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.gray.width()
    }

    pub fn height(&self) -> u32 {
        self.gray.height()
    }
}

/// A synthetic input event as the device understands it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum InputEvent {
    Tap { x: u32, y: u32 },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: u32,
    },
    /// No device side effect; the dispatcher owns the delay.
    Wait { duration_ms: u32 },
}

impl InputEvent {
    pub fn describe(&self) -> String {
        match self {
            InputEvent::Tap { x, y } => format!("tap {x} {y}"),
            InputEvent::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            } => format!("swipe {x1} {y1} {x2} {y2} {duration_ms}"),
            InputEvent::Wait { duration_ms } => format!("wait {duration_ms}"),
        }
    }
}

/// Supplies successive screen captures.
#[allow(async_fn_in_trait)]
pub trait FrameSource {
    /// Capture one frame, failing with `CaptureTimeout` when none is
    /// available within the configured bounded wait.
    async fn capture(&mut self) -> BotResult<Frame>;

    fn screen_dimensions(&self) -> (u32, u32);
}

/// Accepts synthetic input events.
#[allow(async_fn_in_trait)]
pub trait InputInjector {
    /// Send one event, failing with `InputInjection` when the device rejects
    /// it (lost focus, out-of-bounds coordinates, dead transport).
    async fn send(&mut self, event: &InputEvent) -> BotResult<()>;
}
