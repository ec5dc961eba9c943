//! Mock system implementation for testing

use super::System;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// In-memory implementation of System trait for testing
///
/// # Example
/// ```
/// use regconf::system::{mock::MockSystem, System};
/// use std::path::Path;
///
/// let system = MockSystem::new()
///     .with_file("/conf/stack/config.yaml", b"SERVER_HOSTNAME: quay.example.com\n").unwrap()
///     .with_dir("/conf/stack/extra_ca_certs").unwrap();
///
/// assert!(system.exists(Path::new("/conf/stack/config.yaml")));
/// assert_eq!(system.read_dir(Path::new("/conf/stack")).unwrap().len(), 2);
/// ```
#[derive(Clone)]
pub struct MockSystem {
    state: Arc<RwLock<MockSystemState>>,
}

struct MockSystemState {
    files: HashMap<PathBuf, Vec<u8>>,
    dirs: HashSet<PathBuf>,
}

impl MockSystem {
    /// Create a new `MockSystem` with only the root directory
    #[must_use]
    #[inline]
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(MockSystemState {
                files: HashMap::new(),
                dirs: HashSet::from([PathBuf::from("/")]),
            })),
        }
    }

    /// Add a file with contents (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The internal state lock is poisoned
    #[inline]
    pub fn with_file<P: AsRef<Path>>(self, path: P, contents: &[u8]) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;

        if let Some(parent) = path_buf.parent() {
            Self::ensure_parent_dirs(&mut state.dirs, parent);
        }

        state.files.insert(path_buf, contents.to_vec());
        drop(state);
        Ok(self)
    }

    /// Add a directory (builder pattern)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The internal state lock is poisoned
    #[inline]
    pub fn with_dir<P: AsRef<Path>>(self, path: P) -> io::Result<Self> {
        let path_buf = path.as_ref().to_path_buf();
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;
        Self::ensure_parent_dirs(&mut state.dirs, &path_buf);
        drop(state);
        Ok(self)
    }

    #[inline]
    fn ensure_parent_dirs(dirs: &mut HashSet<PathBuf>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
    }
}

impl Default for MockSystem {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl System for MockSystem {
    #[inline]
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let state = self
            .state
            .read()
            .map_err(|e| io::Error::other(e.to_string()))?;
        let bytes = state.files.get(path).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )
        })?;
        let result = bytes.clone();
        drop(state);
        String::from_utf8(result)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("Invalid UTF-8: {e}")))
    }

    #[inline]
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut state = self
            .state
            .write()
            .map_err(|e| io::Error::other(e.to_string()))?;

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !state.dirs.contains(parent)
        {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Parent directory does not exist: {}", parent.display()),
            ));
        }

        state.files.insert(path.to_path_buf(), contents.to_vec());
        drop(state);
        Ok(())
    }

    #[inline]
    fn exists(&self, path: &Path) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.files.contains_key(path) || state.dirs.contains(path))
    }

    #[inline]
    fn is_file(&self, path: &Path) -> bool {
        self.state
            .read()
            .is_ok_and(|state| state.files.contains_key(path))
    }

    #[inline]
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let state = self
            .state
            .read()
            .map_err(|e| io::Error::other(e.to_string()))?;

        if !state.dirs.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Directory not found: {}", path.display()),
            ));
        }

        let mut entries: Vec<PathBuf> = state
            .files
            .keys()
            .chain(state.dirs.iter())
            .filter(|child| *child != path && child.parent() == Some(path))
            .cloned()
            .collect();
        drop(state);

        entries.sort();
        Ok(entries)
    }
}
