// Filesystem-backed pass sink.
//
// Each pass reopens the file without truncation so the inode, and therefore the
// blocks being overwritten, stay the same across passes.

use super::{PassSink, PassWriter, TargetKind};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileSink;

impl PassSink for FileSink {
    type Writer = FileWriter;

    fn probe(&self, path: &Path) -> io::Result<TargetKind> {
        let metadata = fs::symlink_metadata(path)?;
        let file_type = metadata.file_type();

        Ok(if file_type.is_symlink() {
            TargetKind::Symlink
        } else if file_type.is_dir() {
            TargetKind::Directory
        } else if file_type.is_file() {
            TargetKind::Regular {
                len: metadata.len(),
            }
        } else {
            TargetKind::Other
        })
    }

    fn open_pass(&self, path: &Path) -> io::Result<FileWriter> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).truncate(false);

        // Refuse a symlink swapped in after the probe
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.custom_flags(libc::O_NOFOLLOW);
        }

        let mut file = options.open(path)?;
        file.seek(SeekFrom::Start(0))?;
        Ok(FileWriter { file })
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Open handle for a single overwrite pass
#[derive(Debug)]
pub struct FileWriter {
    file: File,
}

impl PassWriter for FileWriter {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.file.write_all(chunk)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}
