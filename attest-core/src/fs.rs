//! Filesystem capability surface.
//!
//! Core logic depends only on this trait, not on `std::fs` directly, so
//! plugins can be exercised against an alternative implementation.

use std::io;
use std::path::{Path, PathBuf};

/// The filesystem operations the engine needs. Object-safe, `Send + Sync`.
pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Read a file and split it into lines (line endings stripped).
    fn read_lines(&self, path: &Path) -> io::Result<Vec<String>> {
        Ok(self
            .read_to_string(path)?
            .lines()
            .map(str::to_owned)
            .collect())
    }

    fn write_all(&self, path: &Path, contents: &str) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;

    fn delete(&self, path: &Path) -> io::Result<()>;

    /// List direct children of a directory, sorted by path.
    fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;
}

/// `std::fs`-backed implementation used by the real engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write_all(&self, path: &Path, contents: &str) -> io::Result<()> {
        std::fs::write(path, contents)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn delete(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn list_directory(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<_>>()?;
        entries.sort();
        Ok(entries)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::copy(from, to).map(|_| ())
    }
}
