//! Filesystem abstraction used by the host side of the editor
//!
//! The core never touches the filesystem. The CLI's configuration store goes
//! through this trait so tests can run against an in-memory filesystem.

use std::io;
use std::path::{Path, PathBuf};

pub mod mock;
pub mod real;

pub use mock::MockSystem;
pub use real::RealSystem;

/// Filesystem operations the configuration store needs
///
/// # Implementations
/// - `RealSystem`: delegates to `std::fs`
/// - `MockSystem`: in-memory files and directories for tests
pub trait System: Send + Sync {
    /// Read entire file contents as a string
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write bytes to a file, creating it if it doesn't exist
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    /// Check if a path exists
    fn exists(&self, path: &Path) -> bool;

    /// Check if a path points to a file
    fn is_file(&self, path: &Path) -> bool;

    /// Read directory entries, returning paths of all entries
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}
