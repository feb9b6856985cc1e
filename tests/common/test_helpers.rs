/// Common test helper functions

use autoshred::observer::EraseEvent;
use std::fs;
use std::io::Read;
use tokio::sync::mpsc::UnboundedReceiver;

/// Verify that a file contains a specific pattern
pub fn verify_pattern(path: &std::path::Path, pattern: &[u8]) -> std::io::Result<bool> {
    let mut file = fs::File::open(path)?;
    let mut buffer = vec![0u8; 4096];
    let mut offset = 0usize;

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }

        for &byte in &buffer[..bytes_read] {
            if byte != pattern[offset % pattern.len()] {
                return Ok(false);
            }
            offset += 1;
        }
    }

    Ok(true)
}

/// Events observed up to and including the terminal `Finished` event
#[derive(Debug, Default)]
pub struct ObservedErase {
    pub started: bool,
    pub passes: Vec<(usize, usize)>,
    pub success: bool,
    pub reason: Option<String>,
}

pub async fn collect_until_finished(rx: &mut UnboundedReceiver<EraseEvent>) -> ObservedErase {
    let mut observed = ObservedErase::default();

    while let Some(event) = rx.recv().await {
        match event {
            EraseEvent::Started { .. } => observed.started = true,
            EraseEvent::PassCompleted { pass, total_passes } => {
                observed.passes.push((pass, total_passes))
            }
            EraseEvent::Finished { success, reason } => {
                observed.success = success;
                observed.reason = reason;
                return observed;
            }
        }
    }

    panic!("observer channel closed before the erase finished");
}
