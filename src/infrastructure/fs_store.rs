//! Directory-backed store
//!
//! Every location is a directory below the root. A location's scalar value
//! lives in a `.data` file inside it; the leading dot keeps it apart from
//! child keys, which never contain dots.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::domain::{is_valid_key_char, split_path};
use crate::infrastructure::traits::Store;
use crate::infrastructure::{StoreError, StoreResult};

const DATA_FILE: &str = ".data";

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::io(format!("create store root {}", root.display()), e))?;
        debug!("open: root={}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dir(&self, path: &str) -> PathBuf {
        split_path(path).fold(self.root.clone(), |dir, segment| dir.join(segment))
    }
}

impl Store for FsStore {
    fn get_data(&self, path: &str) -> StoreResult<Option<String>> {
        let file = self.dir(path).join(DATA_FILE);
        match fs::read_to_string(&file) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(format!("read {}", file.display()), e)),
        }
    }

    #[instrument(level = "trace", skip(self, value))]
    fn set_data(&self, path: &str, value: &str) -> StoreResult<()> {
        let dir = self.dir(path);
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::io(format!("create {}", dir.display()), e))?;
        let file = dir.join(DATA_FILE);
        fs::write(&file, value).map_err(|e| StoreError::io(format!("write {}", file.display()), e))
    }

    fn list(&self, path: &str) -> StoreResult<Vec<String>> {
        let dir = self.dir(path);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut keys = Vec::new();
        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let context = format!("list {}", dir.display());
                StoreError::io(context, e.into())
            })?;
            if !entry.file_type().is_dir() {
                continue;
            }
            // Foreign directories that cannot be keys are not part of the tree
            if let Some(name) = entry.file_name().to_str() {
                if !name.is_empty() && name.chars().all(is_valid_key_char) {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }

    #[instrument(level = "trace", skip(self))]
    fn delete(&self, path: &str) -> StoreResult<()> {
        let dir = self.dir(path);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(format!("delete {}", dir.display()), e)),
        }
    }

    fn introduce_domain(&self, _domid: u32, _page: u64, _channel: u32, _path: &str) -> StoreResult<()> {
        Err(StoreError::Unsupported {
            backend: "filesystem",
            operation: "introduce_domain",
        })
    }

    fn release_domain(&self, _domid: u32) -> StoreResult<()> {
        Err(StoreError::Unsupported {
            backend: "filesystem",
            operation: "release_domain",
        })
    }
}
