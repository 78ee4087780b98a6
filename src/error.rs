use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A specialized `Result` type for bot operations.
pub type BotResult<T> = Result<T, BotError>;

/// The error type for everything the bot can fail at.
///
/// Transient errors (capture timeouts, rejected input events, garbled frames)
/// are retried by the loop controller and never surface past the retry
/// ceiling. Everything else terminates the loop.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("reference library failed to load from {path:?}: {reason}")]
    AssetLoad { path: PathBuf, reason: String },

    #[error("no frame available within {timeout:?}")]
    CaptureTimeout { timeout: Duration },

    #[error("failed to decode captured frame: {0}")]
    FrameDecode(String),

    #[error("input injection rejected '{event}': {reason}")]
    InputInjection { event: String, reason: String },

    #[error("state desynchronized beyond recovery ({recoveries} forced resets)")]
    Desync { recoveries: u32 },

    #[error("retry ceiling of {ceiling} exhausted: {source}")]
    RetryExhausted {
        ceiling: u32,
        #[source]
        source: Box<BotError>,
    },

    #[error("device command failed: {0}")]
    Device(String),
}

impl BotError {
    /// Whether the loop controller may retry the current iteration.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BotError::CaptureTimeout { .. }
                | BotError::FrameDecode(_)
                | BotError::InputInjection { .. }
        )
    }

    /// Process exit code for a fatal stop. A clean stop exits 0; distinct
    /// codes let supervisors tell the failure classes apart.
    pub fn exit_code(&self) -> i32 {
        match self {
            BotError::AssetLoad { .. } => 2,
            BotError::Desync { .. } => 3,
            BotError::RetryExhausted { .. } => 4,
            _ => 1,
        }
    }
}
