// Multi-pass overwrite (VSITR by default) followed by unlink
//
// Every pass rewrites the full file from offset 0 with a single pattern byte and
// is synced to the device before the next pass starts. The file size is measured
// once at job start and every pass writes exactly that many bytes, even if the
// file is resized underneath us.

use super::pattern::ErasurePattern;
use crate::config::EraseConfig;
use crate::io::{sequential_write, FileSink, PassSink, PassWriter, TargetKind, DEFAULT_CHUNK_SIZE};
use crate::observer::EraseObserver;
use crate::{EraseError, EraseResult};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// A file path and the size captured when erasure started
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EraseJob {
    pub id: Uuid,
    pub path: PathBuf,
    pub size: u64,
    pub total_passes: usize,
    pub started_at: DateTime<Utc>,
}

/// Summary of a completed erase
#[derive(Debug, Clone, Serialize)]
pub struct EraseReport {
    pub job_id: Uuid,
    pub path: PathBuf,
    pub bytes_per_pass: u64,
    pub passes_completed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(with = "crate::config::humantime_serde")]
    pub elapsed: Duration,
}

pub struct SecureErase<S: PassSink = FileSink> {
    pattern: ErasurePattern,
    chunk_size: usize,
    sink: S,
}

impl SecureErase<FileSink> {
    pub fn new(pattern: ErasurePattern) -> Self {
        Self::with_sink(pattern, FileSink)
    }

    /// Standard 7-pass VSITR eraser on the real filesystem
    pub fn vsitr() -> Self {
        Self::new(ErasurePattern::vsitr())
    }

    pub fn from_config(config: &EraseConfig) -> Self {
        Self::new(config.pattern.clone()).with_chunk_size(config.chunk_size)
    }
}

impl Default for SecureErase<FileSink> {
    fn default() -> Self {
        Self::vsitr()
    }
}

impl<S: PassSink> SecureErase<S> {
    pub fn with_sink(pattern: ErasurePattern, sink: S) -> Self {
        Self {
            pattern,
            chunk_size: DEFAULT_CHUNK_SIZE,
            sink,
        }
    }

    /// Bytes per write call. Only affects syscall count, not what ends up on disk.
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn pattern(&self) -> &ErasurePattern {
        &self.pattern
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Overwrite `path` once per pattern byte, syncing after every pass, then unlink it.
    ///
    /// Blocks until every pass is on disk. A failure during a pass aborts the
    /// remaining passes and leaves the file partially overwritten; calling
    /// `erase` again restarts from the first pass against the current size.
    pub fn erase(&self, path: &Path, observer: &dyn EraseObserver) -> EraseResult<EraseReport> {
        let job = self.begin(path)?;
        let total_passes = job.total_passes;
        let clock = Instant::now();

        tracing::info!(
            job_id = %job.id,
            path = %path.display(),
            size = job.size,
            passes = total_passes,
            "Starting secure erase"
        );
        observer.on_erase_started(&job);

        let chunk_len = job.size.min(self.chunk_size as u64) as usize;
        let mut chunk = vec![0u8; chunk_len];

        for (index, byte) in self.pattern.iter().enumerate() {
            let pass = index + 1;
            chunk.fill(byte);

            self.write_pass(path, job.size, &chunk).map_err(|source| {
                tracing::error!(
                    job_id = %job.id,
                    pass,
                    error = %source,
                    "Overwrite pass failed, aborting remaining passes"
                );
                EraseError::IoWriteFailed {
                    path: path.to_path_buf(),
                    pass,
                    total_passes,
                    source,
                }
            })?;

            tracing::debug!(job_id = %job.id, pass, total_passes, pattern = byte, "Pass synced");
            observer.on_pass_complete(pass, total_passes);
        }

        if let Err(source) = self.sink.remove(path) {
            tracing::warn!(
                job_id = %job.id,
                path = %path.display(),
                error = %source,
                "Contents overwritten but unlink failed"
            );
            return Err(EraseError::UnlinkFailed {
                path: path.to_path_buf(),
                passes_completed: total_passes,
                source,
            });
        }

        let elapsed = clock.elapsed();
        tracing::info!(
            job_id = %job.id,
            path = %path.display(),
            elapsed = %humantime::format_duration(elapsed),
            "Secure erase complete"
        );

        Ok(EraseReport {
            job_id: job.id,
            path: job.path,
            bytes_per_pass: job.size,
            passes_completed: total_passes,
            started_at: job.started_at,
            finished_at: Utc::now(),
            elapsed,
        })
    }

    fn begin(&self, path: &Path) -> EraseResult<EraseJob> {
        let size = match self.sink.probe(path) {
            Ok(TargetKind::Regular { len }) => len,
            Ok(_) => {
                return Err(EraseError::NotARegularFile {
                    path: path.to_path_buf(),
                })
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(EraseError::FileVanished {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(EraseError::MetadataUnavailable {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Ok(EraseJob {
            id: Uuid::new_v4(),
            path: path.to_path_buf(),
            size,
            total_passes: self.pattern.passes(),
            started_at: Utc::now(),
        })
    }

    fn write_pass(&self, path: &Path, size: u64, chunk: &[u8]) -> io::Result<()> {
        let mut writer = self.sink.open_pass(path)?;
        sequential_write(&mut writer, size, chunk)?;
        writer.sync()
    }
}
