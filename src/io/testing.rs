// In-memory pass sink for unit tests.
//
// Records how many bytes each pass wrote, which byte values appeared and whether
// the pass was synced, and can inject failures at a chosen pass.

use super::{PassSink, PassWriter, TargetKind};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default, Clone)]
pub(crate) struct PassRecord {
    pub(crate) written: u64,
    pub(crate) bytes_seen: BTreeSet<u8>,
    pub(crate) synced: bool,
}

#[derive(Default)]
struct SinkState {
    passes: Vec<PassRecord>,
    removed: Vec<PathBuf>,
}

/// Records every pass instead of touching the filesystem
pub(crate) struct RecordingSink {
    target: io::Result<TargetKind>,
    pub(crate) fail_write_on_pass: Option<usize>,
    pub(crate) fail_sync_on_pass: Option<usize>,
    pub(crate) fail_remove: bool,
    state: Arc<Mutex<SinkState>>,
}

impl RecordingSink {
    pub(crate) fn regular(len: u64) -> Self {
        Self {
            target: Ok(TargetKind::Regular { len }),
            fail_write_on_pass: None,
            fail_sync_on_pass: None,
            fail_remove: false,
            state: Arc::default(),
        }
    }

    pub(crate) fn with_target(target: io::Result<TargetKind>) -> Self {
        Self {
            target,
            ..Self::regular(0)
        }
    }

    pub(crate) fn passes(&self) -> Vec<PassRecord> {
        self.state.lock().unwrap().passes.clone()
    }

    pub(crate) fn removed(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().removed.clone()
    }
}

pub(crate) struct RecordingWriter {
    pass: usize,
    fail_write: bool,
    fail_sync: bool,
    state: Arc<Mutex<SinkState>>,
}

impl PassWriter for RecordingWriter {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.fail_write {
            return Err(io::Error::new(io::ErrorKind::Other, "injected write failure"));
        }
        let mut state = self.state.lock().unwrap();
        let record = &mut state.passes[self.pass - 1];
        record.written += chunk.len() as u64;
        record.bytes_seen.extend(chunk.iter().copied());
        Ok(())
    }

    fn sync(&mut self) -> io::Result<()> {
        if self.fail_sync {
            return Err(io::Error::new(io::ErrorKind::Other, "injected sync failure"));
        }
        self.state.lock().unwrap().passes[self.pass - 1].synced = true;
        Ok(())
    }
}

impl PassSink for RecordingSink {
    type Writer = RecordingWriter;

    fn probe(&self, _path: &Path) -> io::Result<TargetKind> {
        match &self.target {
            Ok(kind) => Ok(*kind),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        }
    }

    fn open_pass(&self, _path: &Path) -> io::Result<RecordingWriter> {
        let mut state = self.state.lock().unwrap();
        // A new pass may only begin once the previous one is durable
        if let Some(previous) = state.passes.last() {
            assert!(previous.synced, "pass opened before previous pass was synced");
        }
        state.passes.push(PassRecord::default());
        let pass = state.passes.len();
        Ok(RecordingWriter {
            pass,
            fail_write: self.fail_write_on_pass == Some(pass),
            fail_sync: self.fail_sync_on_pass == Some(pass),
            state: Arc::clone(&self.state),
        })
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        if self.fail_remove {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only directory"));
        }
        self.state.lock().unwrap().removed.push(path.to_path_buf());
        Ok(())
    }
}
