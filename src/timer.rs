// Auto-erase countdown timer
//
// One timer owns at most one pending erase. The countdown is a tokio task that
// sleeps until the deadline and then decides, under the same mutex used by
// start/reset/cancel, whether it is still allowed to fire. A generation counter
// makes replaced countdowns harmless even if they wake before being aborted.

use crate::algorithms::{EraseReport, SecureErase};
use crate::config::EraseConfig;
use crate::io::{FileSink, PassSink};
use crate::observer::EraseObserver;
use crate::EraseResult;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Longest countdown the timer will actually wait; larger delays are clamped
pub const MAX_COUNTDOWN: Duration = Duration::from_secs(86400 * 365 * 30);

/// Deadline `delay` from now, clamped so it can never overflow the clock
fn deadline_after(delay: Duration) -> Instant {
    let now = Instant::now();
    let mut wait = delay.min(MAX_COUNTDOWN);
    loop {
        if let Some(deadline) = now.checked_add(wait) {
            return deadline;
        }
        wait /= 2;
    }
}

/// Lifecycle of an [`ErasureTimer`]. `Cancelled` and `Fired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Armed { deadline: Instant },
    Cancelled,
    Fired,
}

impl TimerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TimerState::Cancelled | TimerState::Fired)
    }

    pub fn is_armed(&self) -> bool {
        matches!(self, TimerState::Armed { .. })
    }
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerState::Idle => f.write_str("idle"),
            TimerState::Armed { .. } => f.write_str("armed"),
            TimerState::Cancelled => f.write_str("cancelled"),
            TimerState::Fired => f.write_str("fired"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOp {
    Start,
    Reset,
    Cancel,
}

impl fmt::Display for TimerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerOp::Start => f.write_str("start"),
            TimerOp::Reset => f.write_str("reset"),
            TimerOp::Cancel => f.write_str("cancel"),
        }
    }
}

/// A control request that had no effect in the timer's current state
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("{operation} ignored: timer is {state}")]
pub struct TimerMisuse {
    pub operation: TimerOp,
    pub state: TimerState,
}

/// Result of a control request. Misuse is a no-op, never an error.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    Applied,
    Ignored(TimerMisuse),
}

impl ControlOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ControlOutcome::Applied)
    }
}

struct Shared {
    state: TimerState,
    path: Option<PathBuf>,
    delay: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner<S: PassSink> {
    eraser: SecureErase<S>,
    observer: Arc<dyn EraseObserver>,
    runtime: Handle,
    shared: Mutex<Shared>,
}

impl<S: PassSink> Inner<S> {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        // Every transition computes its new values before writing any field, so a
        // poisoned guard still holds a consistent state
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_erase(&self, path: &Path) -> EraseResult<EraseReport> {
        let result = self.eraser.erase(path, self.observer.as_ref());
        match &result {
            Ok(_) => self.observer.on_erase_finished(true, None),
            Err(e) => self.observer.on_erase_finished(false, Some(e.to_string())),
        }
        result
    }
}

/// Single-flight deferred erase with cancel and reset.
///
/// Cloning yields another handle to the same timer. Dropping the handles does
/// not cancel an armed countdown; it still fires while the runtime is alive.
pub struct ErasureTimer<S: PassSink + 'static = FileSink> {
    inner: Arc<Inner<S>>,
}

impl<S: PassSink + 'static> Clone for ErasureTimer<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl ErasureTimer<FileSink> {
    /// Filesystem-backed timer using the configured pattern and chunk size.
    ///
    /// Must be called from within a tokio runtime.
    pub fn from_config(config: &EraseConfig, observer: Arc<dyn EraseObserver>) -> Self {
        Self::new(SecureErase::from_config(config), observer)
    }
}

impl<S: PassSink + 'static> ErasureTimer<S> {
    /// Create an idle timer on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn new(eraser: SecureErase<S>, observer: Arc<dyn EraseObserver>) -> Self {
        Self::with_handle(eraser, observer, Handle::current())
    }

    pub fn with_handle(
        eraser: SecureErase<S>,
        observer: Arc<dyn EraseObserver>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                eraser,
                observer,
                runtime,
                shared: Mutex::new(Shared {
                    state: TimerState::Idle,
                    path: None,
                    delay: Duration::ZERO,
                    generation: 0,
                    task: None,
                }),
            }),
        }
    }

    /// Arm a countdown of `delay` for `path`, replacing any armed countdown.
    pub fn start(&self, path: impl Into<PathBuf>, delay: Duration) -> ControlOutcome {
        let path = path.into();
        let mut shared = self.inner.lock();

        if shared.state.is_terminal() {
            return Self::ignore(TimerOp::Start, shared.state);
        }

        tracing::info!(
            path = %path.display(),
            delay = %humantime::format_duration(delay),
            replacing = shared.state.is_armed(),
            "Auto-erase timer started"
        );

        shared.path = Some(path);
        shared.delay = delay;
        self.arm(&mut shared);
        ControlOutcome::Applied
    }

    /// Restart the countdown with the full original delay. Only valid while armed.
    pub fn reset(&self) -> ControlOutcome {
        let mut shared = self.inner.lock();

        if !shared.state.is_armed() {
            return Self::ignore(TimerOp::Reset, shared.state);
        }

        self.arm(&mut shared);
        tracing::info!(
            delay = %humantime::format_duration(shared.delay),
            "Auto-erase timer reset"
        );
        ControlOutcome::Applied
    }

    /// Stop the countdown for good.
    ///
    /// Once this returns `Applied`, this timer will never invoke the eraser. If
    /// the countdown already fired, the erase is under way and the request is
    /// ignored.
    pub fn cancel(&self) -> ControlOutcome {
        let mut shared = self.inner.lock();

        if shared.state == TimerState::Fired {
            return Self::ignore(TimerOp::Cancel, shared.state);
        }

        if let Some(task) = shared.task.take() {
            task.abort();
        }
        if shared.state != TimerState::Cancelled {
            tracing::info!(was = %shared.state, "Auto-erase timer cancelled");
        }
        shared.state = TimerState::Cancelled;
        ControlOutcome::Applied
    }

    /// Cancel the countdown and erase `path` on the calling thread.
    ///
    /// Returns `None` without touching the file when the countdown has already
    /// fired, since that erase owns the path. Blocks for the whole pass sequence.
    pub fn erase_now(&self, path: &Path) -> Option<EraseResult<EraseReport>> {
        if let ControlOutcome::Ignored(misuse) = self.cancel() {
            tracing::info!(%misuse, "Erase already performed by the timer");
            return None;
        }
        Some(self.inner.run_erase(path))
    }

    pub fn state(&self) -> TimerState {
        self.inner.lock().state
    }

    /// Time left before the countdown fires, if armed
    pub fn remaining(&self) -> Option<Duration> {
        match self.inner.lock().state {
            TimerState::Armed { deadline } => {
                Some(deadline.saturating_duration_since(Instant::now()))
            }
            _ => None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.inner.lock().delay
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.inner.lock().path.clone()
    }

    pub fn eraser(&self) -> &SecureErase<S> {
        &self.inner.eraser
    }

    fn ignore(operation: TimerOp, state: TimerState) -> ControlOutcome {
        let misuse = TimerMisuse { operation, state };
        tracing::debug!(%misuse, "Timer request ignored");
        ControlOutcome::Ignored(misuse)
    }

    /// Replace the pending countdown with a fresh one. Caller holds the lock.
    fn arm(&self, shared: &mut Shared) {
        let deadline = deadline_after(shared.delay);

        if let Some(task) = shared.task.take() {
            task.abort();
        }

        shared.generation += 1;
        let generation = shared.generation;
        shared.state = TimerState::Armed { deadline };

        let timer = self.clone();
        shared.task = Some(self.inner.runtime.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            timer.expire(generation).await;
        }));
    }

    async fn expire(self, generation: u64) {
        let path = {
            let mut shared = self.inner.lock();

            // A newer countdown or a cancel got the lock first
            if shared.generation != generation || !shared.state.is_armed() {
                tracing::debug!(state = %shared.state, generation, "Stale expiry skipped");
                return;
            }
            let Some(path) = shared.path.clone() else {
                return;
            };

            shared.state = TimerState::Fired;
            shared.task = None;
            path
        };

        tracing::info!(path = %path.display(), "Auto-erase timer expired, initiating secure erase");

        let inner = Arc::clone(&self.inner);
        let outcome = tokio::task::spawn_blocking(move || inner.run_erase(&path)).await;

        if let Err(join_error) = outcome {
            tracing::error!(error = %join_error, "Erase task did not complete");
            self.inner
                .observer
                .on_erase_finished(false, Some(format!("erase task aborted: {}", join_error)));
        }
    }
}
