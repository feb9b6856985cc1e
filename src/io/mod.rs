pub mod file_sink;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports
pub use file_sink::{FileSink, FileWriter};

use std::io;
use std::path::Path;

/// Default chunk size for pass writes (64 KiB)
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// What a path resolves to, without following symlinks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Regular { len: u64 },
    Symlink,
    Directory,
    /// Sockets, FIFOs, device nodes
    Other,
}

/// Where overwrite passes are written.
///
/// The production sink is [`FileSink`]. Tests substitute a recording sink to
/// observe every chunk and sync without touching the filesystem.
pub trait PassSink: Send + Sync {
    type Writer: PassWriter;

    /// Classify `path`. A missing path is reported as `ErrorKind::NotFound`.
    fn probe(&self, path: &Path) -> io::Result<TargetKind>;

    /// Open `path` for one pass: read-write, no truncation, positioned at offset 0.
    fn open_pass(&self, path: &Path) -> io::Result<Self::Writer>;

    /// Remove `path` from the filesystem namespace.
    fn remove(&self, path: &Path) -> io::Result<()>;
}

pub trait PassWriter {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Flush buffers and force the written data to the storage device.
    fn sync(&mut self) -> io::Result<()>;
}

/// Write `total` bytes to `writer` by repeating (a prefix of) `chunk`.
///
/// `chunk` must be non-empty unless `total` is zero.
pub fn sequential_write<W: PassWriter + ?Sized>(
    writer: &mut W,
    total: u64,
    chunk: &[u8],
) -> io::Result<u64> {
    let mut written = 0u64;

    while written < total {
        let write_size = (total - written).min(chunk.len() as u64) as usize;
        if write_size == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty chunk buffer",
            ));
        }
        writer.write_chunk(&chunk[..write_size])?;
        written += write_size as u64;
    }

    Ok(written)
}
