// Multi-pass secure file erasure with an auto-erase countdown.
//
// `algorithms` holds the overwrite pass sequence, `io` the write sinks it drives,
// and `timer` the single-flight countdown that fires an erase after a delay.

pub mod algorithms;
pub mod config;
pub mod io;
pub mod observer;
pub mod timer;
pub mod ui;

pub use algorithms::{ErasurePattern, EraseJob, EraseReport, SecureErase};
pub use config::{ConfigError, EraseConfig};
pub use observer::{EraseEvent, EraseObserver, NoopObserver, TracingObserver};
pub use timer::{ControlOutcome, ErasureTimer, TimerMisuse, TimerOp, TimerState};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failures of a single `erase` call.
///
/// Any error raised during a pass aborts the remaining passes. Nothing here is
/// retried automatically; a fresh `erase` call restarts the whole sequence.
#[derive(Error, Debug)]
pub enum EraseError {
    #[error("not a regular file: {}", path.display())]
    NotARegularFile { path: PathBuf },

    #[error("file vanished before erasure could start: {}", path.display())]
    FileVanished { path: PathBuf },

    #[error("cannot read metadata of {}: {source}", path.display())]
    MetadataUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("pass {pass}/{total_passes} failed on {}: {source}", path.display())]
    IoWriteFailed {
        path: PathBuf,
        pass: usize,
        total_passes: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("all {passes_completed} passes completed but unlinking {} failed: {source}", path.display())]
    UnlinkFailed {
        path: PathBuf,
        passes_completed: usize,
        #[source]
        source: std::io::Error,
    },
}

impl EraseError {
    /// Number of passes that were durably written before the error.
    pub fn passes_completed(&self) -> usize {
        match self {
            EraseError::IoWriteFailed { pass, .. } => pass - 1,
            EraseError::UnlinkFailed {
                passes_completed, ..
            } => *passes_completed,
            _ => 0,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            EraseError::NotARegularFile { path }
            | EraseError::FileVanished { path }
            | EraseError::MetadataUnavailable { path, .. }
            | EraseError::IoWriteFailed { path, .. }
            | EraseError::UnlinkFailed { path, .. } => path,
        }
    }
}

pub type EraseResult<T> = Result<T, EraseError>;

/// Erase `path` immediately with the default VSITR pattern on the real filesystem.
///
/// Equivalent to `SecureErase::vsitr().erase(path, observer)`. Blocks for the
/// duration of all passes.
pub fn erase_now(path: &Path, observer: &dyn EraseObserver) -> EraseResult<EraseReport> {
    SecureErase::vsitr().erase(path, observer)
}
