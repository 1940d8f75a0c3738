// src/fs/mock.rs

use super::FileSystem;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory filesystem for resolution tests.
///
/// Paths are compared literally, so callers must register exactly the
/// strings the resolver will probe.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashSet<PathBuf>>>,
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.files.lock().unwrap().insert(path.as_ref().to_path_buf());
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.dirs.lock().unwrap().insert(path.as_ref().to_path_buf());
    }

    pub fn with_files<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let fs = Self::new();
        for p in paths {
            fs.add_file(p);
        }
        fs
    }
}

impl FileSystem for MockFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.dirs.lock().unwrap().contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains(path)
    }
}
