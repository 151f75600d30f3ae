//! In-process store
//!
//! Holds the whole hierarchy in a map keyed by normalized path and records
//! every mutation, which makes it the store of choice for tests and for
//! embedding the tree without an external service.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument};

use crate::domain::{join_path, split_path};
use crate::infrastructure::traits::Store;
use crate::infrastructure::{StoreError, StoreResult};

/// A mutation applied to a [`MemoryStore`], in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreOp {
    Write { path: String, value: String },
    Delete { path: String },
    Introduce { domid: u32, path: String },
    Release { domid: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainInfo {
    pub page: u64,
    pub channel: u32,
    pub path: String,
}

#[derive(Debug, Default)]
struct Inner {
    /// Every existing location except the root, with its optional value.
    entries: BTreeMap<String, Option<String>>,
    root_value: Option<String>,
    domains: BTreeMap<u32, DomainInfo>,
    ops: Vec<StoreOp>,
}

fn normalize(path: &str) -> String {
    join_path(split_path(path))
}

fn parent_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
}

fn is_below(path: &str, ancestor: &str) -> bool {
    ancestor.is_empty()
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(path, value)` pairs, without recording them.
    pub fn with_entries<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut inner = store.lock();
            for (path, value) in entries {
                Self::write(&mut inner, &normalize(path), value);
            }
        }
        store
    }

    // A panic while holding the lock leaves the map consistent: every
    // mutation is a single insert or retain.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(inner: &mut Inner, path: &str, value: &str) {
        if path.is_empty() {
            inner.root_value = Some(value.to_string());
            return;
        }
        let mut ancestor = parent_of(path);
        while !ancestor.is_empty() {
            inner.entries.entry(ancestor.to_string()).or_insert(None);
            ancestor = parent_of(ancestor);
        }
        inner
            .entries
            .insert(path.to_string(), Some(value.to_string()));
    }

    /// All recorded mutations, oldest first.
    pub fn operations(&self) -> Vec<StoreOp> {
        self.lock().ops.clone()
    }

    /// Number of recorded value writes.
    pub fn writes(&self) -> usize {
        self.lock()
            .ops
            .iter()
            .filter(|op| matches!(op, StoreOp::Write { .. }))
            .count()
    }

    pub fn clear_operations(&self) {
        self.lock().ops.clear();
    }

    /// Whether a location exists (the root always does).
    pub fn contains(&self, path: &str) -> bool {
        let path = normalize(path);
        path.is_empty() || self.lock().entries.contains_key(&path)
    }

    pub fn domain(&self, domid: u32) -> Option<DomainInfo> {
        self.lock().domains.get(&domid).cloned()
    }
}

impl Store for MemoryStore {
    fn get_data(&self, path: &str) -> StoreResult<Option<String>> {
        let path = normalize(path);
        let inner = self.lock();
        if path.is_empty() {
            return Ok(inner.root_value.clone());
        }
        Ok(inner.entries.get(&path).cloned().flatten())
    }

    #[instrument(level = "trace", skip(self))]
    fn set_data(&self, path: &str, value: &str) -> StoreResult<()> {
        let path = normalize(path);
        let mut inner = self.lock();
        Self::write(&mut inner, &path, value);
        inner.ops.push(StoreOp::Write {
            path,
            value: value.to_string(),
        });
        Ok(())
    }

    fn list(&self, path: &str) -> StoreResult<Vec<String>> {
        let path = normalize(path);
        let inner = self.lock();
        Ok(inner
            .entries
            .keys()
            .filter(|k| parent_of(k) == path)
            .map(|k| k.rsplit('/').next().unwrap_or(k).to_string())
            .collect())
    }

    #[instrument(level = "trace", skip(self))]
    fn delete(&self, path: &str) -> StoreResult<()> {
        let path = normalize(path);
        let mut inner = self.lock();
        inner
            .entries
            .retain(|k, _| k != &path && !is_below(k, &path));
        if path.is_empty() {
            inner.root_value = None;
        }
        inner.ops.push(StoreOp::Delete { path });
        Ok(())
    }

    fn introduce_domain(&self, domid: u32, page: u64, channel: u32, path: &str) -> StoreResult<()> {
        let path = normalize(path);
        let mut inner = self.lock();
        if inner.domains.contains_key(&domid) {
            return Err(StoreError::Domain {
                domid,
                message: "already introduced".to_string(),
            });
        }
        debug!("introduce_domain: domid={} path={}", domid, path);
        inner.domains.insert(
            domid,
            DomainInfo {
                page,
                channel,
                path: path.clone(),
            },
        );
        inner.ops.push(StoreOp::Introduce { domid, path });
        Ok(())
    }

    fn release_domain(&self, domid: u32) -> StoreResult<()> {
        let mut inner = self.lock();
        if inner.domains.remove(&domid).is_none() {
            return Err(StoreError::Domain {
                domid,
                message: "not introduced".to_string(),
            });
        }
        debug!("release_domain: domid={}", domid);
        inner.ops.push(StoreOp::Release { domid });
        Ok(())
    }
}
