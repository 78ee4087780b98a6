//! Configuration surface for the automation loop.
//!
//! Everything here is a tunable default, not a contract: thresholds and
//! ceilings were chosen to work on a 1080x2280 phone and should be adjusted
//! against real captures.

use std::path::PathBuf;
use std::time::Duration;

/// Template matching parameters.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// Minimum normalized correlation for a match to be reported at all.
    pub score_floor: f32,
    /// Two scores closer than this are considered tied; the tie goes to the
    /// template tagged for the tracker's current state.
    pub tie_epsilon: f32,
    /// Template scale factors searched per frame. On-screen element size
    /// varies with device resolution, so 1.0 alone is not enough.
    pub scale_factors: Vec<f32>,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            score_floor: 0.6,
            tie_epsilon: 0.02,
            scale_factors: vec![0.8, 0.9, 1.0, 1.1, 1.2],
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Directory of labeled template images.
    pub asset_dir: PathBuf,
    /// ADB device serial; first device when unset.
    pub device_serial: Option<String>,
    /// Android package the bot drives; checked for foreground at startup.
    pub package: Option<String>,
    pub match_settings: MatchSettings,
    /// Minimum match confidence for a state transition to be accepted.
    pub state_confidence: f32,
    /// Consecutive rejected iterations before the tracker forces a reset to
    /// the main menu.
    pub desync_after: u32,
    /// Forced resets tolerated before the run is declared unrecoverable.
    pub max_recoveries: u32,
    /// Transient-failure retries per iteration.
    pub max_retries: u32,
    /// Base backoff between retries; doubles per attempt.
    pub retry_backoff: Duration,
    /// Coordinate jitter applied to every planned tap/swipe, in pixels.
    pub jitter_px: u32,
    /// Duration jitter applied to every planned action, in milliseconds.
    pub jitter_ms: u64,
    /// Seed for all jitter randomness. Fixed seed means reproducible runs.
    pub rng_seed: u64,
    /// Inter-iteration delay range (min_ms, max_ms).
    pub loop_delay_ms: (u64, u64),
    /// Bounded wait for one screen capture.
    pub capture_timeout: Duration,
    /// Bounded wait for one injected input event.
    pub input_timeout: Duration,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            device_serial: None,
            package: None,
            match_settings: MatchSettings::default(),
            state_confidence: 0.8,
            desync_after: 5,
            max_recoveries: 3,
            max_retries: 3,
            retry_backoff: Duration::from_millis(250),
            jitter_px: 12,
            jitter_ms: 120,
            rng_seed: 0,
            loop_delay_ms: (400, 900),
            capture_timeout: Duration::from_secs(5),
            input_timeout: Duration::from_secs(2),
        }
    }
}
