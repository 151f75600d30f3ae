//! Backing-store boundary
//!
//! The tree engine talks to the hierarchical store only through [`Store`],
//! wrapped in a [`StoreHandle`] that pins one location in it.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::{child_path, join_path, split_path};
use crate::infrastructure::StoreResult;

/// Hierarchical key-value store addressed by slash-separated paths.
///
/// The root is the empty path. Writing below a missing location creates the
/// intermediate locations; deleting a location removes its whole subtree.
pub trait Store: Send + Sync {
    /// Scalar value at `path`, `None` if the location is missing or holds no value.
    fn get_data(&self, path: &str) -> StoreResult<Option<String>>;

    /// Write the scalar value at `path`.
    fn set_data(&self, path: &str, value: &str) -> StoreResult<()>;

    /// Keys of the direct children of `path`; empty if the location is missing.
    fn list(&self, path: &str) -> StoreResult<Vec<String>>;

    /// Remove `path` and everything below it.
    fn delete(&self, path: &str) -> StoreResult<()>;

    /// Tell the store about a new domain and where its subtree lives.
    fn introduce_domain(&self, domid: u32, page: u64, channel: u32, path: &str) -> StoreResult<()>;

    /// Tell the store a domain is gone.
    fn release_domain(&self, domid: u32) -> StoreResult<()>;
}

/// A store location: the shared store plus one normalized path in it.
#[derive(Clone)]
pub struct StoreHandle {
    store: Arc<dyn Store>,
    path: String,
}

impl fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHandle").field("path", &self.path).finish()
    }
}

impl StoreHandle {
    pub fn new(store: Arc<dyn Store>, path: &str) -> Self {
        Self {
            store,
            path: join_path(split_path(path)),
        }
    }

    /// Handle on the root of `store`.
    pub fn root(store: Arc<dyn Store>) -> Self {
        Self::new(store, "")
    }

    /// Path of this location relative to the store root.
    pub fn rel_path(&self) -> &str {
        &self.path
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn get_child(&self, key: &str) -> StoreHandle {
        Self {
            store: Arc::clone(&self.store),
            path: child_path(&self.path, key),
        }
    }

    #[instrument(level = "trace", skip(self), fields(path = %self.path))]
    pub fn get_data(&self) -> StoreResult<Option<String>> {
        self.store.get_data(&self.path)
    }

    #[instrument(level = "trace", skip(self), fields(path = %self.path))]
    pub fn set_data(&self, value: &str) -> StoreResult<()> {
        self.store.set_data(&self.path, value)
    }

    #[instrument(level = "trace", skip(self), fields(path = %self.path))]
    pub fn ls(&self) -> StoreResult<Vec<String>> {
        self.store.list(&self.path)
    }

    pub fn delete(&self) -> StoreResult<()> {
        debug!("delete: path={}", self.path);
        self.store.delete(&self.path)
    }

    pub fn delete_child(&self, key: &str) -> StoreResult<()> {
        self.get_child(key).delete()
    }

    pub fn delete_children(&self) -> StoreResult<()> {
        for key in self.ls()? {
            self.delete_child(&key)?;
        }
        Ok(())
    }

    /// Introduce a domain; `path` defaults to this location.
    pub fn introduce_domain(
        &self,
        domid: u32,
        page: u64,
        channel: u32,
        path: Option<&str>,
    ) -> StoreResult<()> {
        let path = path.unwrap_or(&self.path);
        self.store.introduce_domain(domid, page, channel, path)
    }

    pub fn release_domain(&self, domid: u32) -> StoreResult<()> {
        self.store.release_domain(domid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::MemoryStore;

    #[test]
    fn given_messy_path_when_creating_handle_then_normalizes() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let handle = StoreHandle::new(store, "/vm//dom1/");
        assert_eq!(handle.rel_path(), "vm/dom1");
        assert_eq!(handle.get_child("memory").rel_path(), "vm/dom1/memory");
    }

    #[test]
    fn given_root_handle_when_getting_child_then_has_no_leading_separator() {
        let handle = StoreHandle::root(Arc::new(MemoryStore::new()));
        assert_eq!(handle.rel_path(), "");
        assert_eq!(handle.get_child("vm").rel_path(), "vm");
    }

    #[test]
    fn given_children_when_deleting_children_then_keeps_own_value() {
        let store = Arc::new(MemoryStore::new());
        store.set_data("vm", "root").unwrap();
        store.set_data("vm/a", "1").unwrap();
        store.set_data("vm/b/c", "2").unwrap();
        let handle = StoreHandle::new(store.clone(), "vm");

        handle.delete_children().unwrap();

        assert!(handle.ls().unwrap().is_empty());
        assert_eq!(handle.get_data().unwrap(), Some("root".to_string()));
    }
}
