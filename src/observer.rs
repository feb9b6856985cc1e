// Erasure progress observers.
//
// The core never prints. Progress and completion are pushed to an injected
// observer: the console renderer in `ui`, a tracing logger, or a channel.

use crate::algorithms::EraseJob;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Receives erasure lifecycle callbacks.
///
/// `on_pass_complete` fires once per durably written pass with a 1-based index.
/// `on_erase_finished` is the terminal event for an erase run by a timer.
#[cfg_attr(test, mockall::automock)]
pub trait EraseObserver: Send + Sync {
    fn on_erase_started(&self, _job: &EraseJob) {}

    fn on_pass_complete(&self, pass: usize, total_passes: usize);

    fn on_erase_finished(&self, _success: bool, _reason: Option<String>) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl EraseObserver for NoopObserver {
    fn on_pass_complete(&self, _pass: usize, _total_passes: usize) {}
}

/// Logs every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl EraseObserver for TracingObserver {
    fn on_erase_started(&self, job: &EraseJob) {
        tracing::info!(
            job_id = %job.id,
            path = %job.path.display(),
            size = job.size,
            passes = job.total_passes,
            "Secure erase started"
        );
    }

    fn on_pass_complete(&self, pass: usize, total_passes: usize) {
        tracing::debug!(pass, total_passes, "Pass complete");
    }

    fn on_erase_finished(&self, success: bool, reason: Option<String>) {
        if success {
            tracing::info!("Secure erase finished");
        } else {
            tracing::error!(reason = reason.as_deref().unwrap_or("unknown"), "Secure erase failed");
        }
    }
}

/// Owned form of an observer callback
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EraseEvent {
    Started {
        job_id: Uuid,
        path: PathBuf,
        size: u64,
        total_passes: usize,
    },
    PassCompleted {
        pass: usize,
        total_passes: usize,
    },
    Finished {
        success: bool,
        reason: Option<String>,
    },
}

/// Forwards events over an unbounded tokio channel.
///
/// A closed receiver is ignored; observers must never fail the erase.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: UnboundedSender<EraseEvent>,
}

impl ChannelObserver {
    pub fn new(tx: UnboundedSender<EraseEvent>) -> Self {
        Self { tx }
    }
}

impl EraseObserver for ChannelObserver {
    fn on_erase_started(&self, job: &EraseJob) {
        let _ = self.tx.send(EraseEvent::Started {
            job_id: job.id,
            path: job.path.clone(),
            size: job.size,
            total_passes: job.total_passes,
        });
    }

    fn on_pass_complete(&self, pass: usize, total_passes: usize) {
        let _ = self.tx.send(EraseEvent::PassCompleted { pass, total_passes });
    }

    fn on_erase_finished(&self, success: bool, reason: Option<String>) {
        let _ = self.tx.send(EraseEvent::Finished { success, reason });
    }
}

/// Fans every event out to several observers, in order
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn EraseObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: Arc<dyn EraseObserver>) -> Self {
        self.observers.push(observer);
        self
    }
}

impl EraseObserver for ObserverSet {
    fn on_erase_started(&self, job: &EraseJob) {
        for observer in &self.observers {
            observer.on_erase_started(job);
        }
    }

    fn on_pass_complete(&self, pass: usize, total_passes: usize) {
        for observer in &self.observers {
            observer.on_pass_complete(pass, total_passes);
        }
    }

    fn on_erase_finished(&self, success: bool, reason: Option<String>) {
        for observer in &self.observers {
            observer.on_erase_finished(success, reason.clone());
        }
    }
}
