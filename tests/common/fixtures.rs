use std::io::Write;
use std::path::PathBuf;
use tempfile::TempDir;

/// A file inside its own temporary directory, removed on drop
pub struct ScratchFile {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl ScratchFile {
    /// Create `name` with `size` bytes of a repeating non-pattern sequence
    pub fn create(name: &str, size: usize) -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let path = dir.path().join(name);

        let mut file = std::fs::File::create(&path)?;
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8 ^ 0x5C).collect();
        file.write_all(&data)?;
        file.sync_all()?;

        Ok(Self { dir, path })
    }
}
