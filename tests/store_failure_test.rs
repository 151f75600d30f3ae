//! Tests for store failures surfacing through the tree

use std::collections::BTreeMap;
use std::io;
use std::sync::{Arc, Mutex};

use xstree::infrastructure::{Store, StoreError, StoreHandle, StoreResult};
use xstree::{ApplicationError, SaveOptions, Tree};

/// Mock store that records calls and can be told to fail writes or domain ops
struct MockStore {
    data: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<String>>,
    fail_writes: bool,
}

impl MockStore {
    fn new() -> Self {
        Self {
            data: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            fail_writes: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Self::new()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Store for MockStore {
    fn get_data(&self, path: &str) -> StoreResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(path).cloned())
    }

    fn set_data(&self, path: &str, value: &str) -> StoreResult<()> {
        self.record(format!("set {path}"));
        if self.fail_writes {
            return Err(StoreError::io(
                format!("write {path}"),
                io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.data.lock().unwrap().insert(path.to_string(), value.to_string());
        Ok(())
    }

    fn list(&self, _path: &str) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn delete(&self, path: &str) -> StoreResult<()> {
        self.record(format!("delete {path}"));
        Ok(())
    }

    fn introduce_domain(&self, domid: u32, _page: u64, _channel: u32, path: &str) -> StoreResult<()> {
        self.record(format!("introduce {domid} {path}"));
        Err(StoreError::Domain {
            domid,
            message: "permission denied".into(),
        })
    }

    fn release_domain(&self, domid: u32) -> StoreResult<()> {
        self.record(format!("release {domid}"));
        Err(StoreError::Domain {
            domid,
            message: "no such domain".into(),
        })
    }
}

#[test]
fn given_failing_store_when_saving_then_error_propagates_and_node_stays_dirty() {
    let store = Arc::new(MockStore::failing());
    let mut tree = Tree::from_store(StoreHandle::root(store.clone()));
    let root = tree.root();
    let a = tree.set(root, "a", "1").unwrap();
    tree.set(root, "b", "2").unwrap();

    let err = tree.save(root, SaveOptions::default()).unwrap_err();

    assert!(matches!(err, ApplicationError::Store(StoreError::Io { .. })));
    assert!(tree.is_dirty(a).unwrap());
    assert_eq!(store.calls(), vec!["set a"], "no retry, no further writes");
}

#[test]
fn given_working_store_when_saving_then_each_dirty_value_written_once() {
    let store = Arc::new(MockStore::new());
    let mut tree = Tree::from_store(StoreHandle::new(store.clone(), "dom"));
    let root = tree.root();
    tree.set(root, "a", "1").unwrap();
    tree.set(root, "b/c", "2").unwrap();

    tree.save(root, SaveOptions::default()).unwrap();

    assert_eq!(store.calls(), vec!["set dom/a", "set dom/b/c"]);
}

#[test]
fn given_rejecting_store_when_introducing_domain_then_domain_error_returned() {
    let store = Arc::new(MockStore::new());
    let tree = Tree::from_store(StoreHandle::new(store.clone(), "local/domain/3"));

    let err = tree
        .introduce_domain(tree.root(), 3, 42, 7, Some("other/path"))
        .unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Store(StoreError::Domain { domid: 3, .. })
    ));
    assert_eq!(store.calls(), vec!["introduce 3 other/path"]);
}

#[test]
fn given_rejecting_store_when_releasing_domain_then_domain_error_returned() {
    let store = Arc::new(MockStore::new());
    let tree = Tree::from_store(StoreHandle::root(store.clone()));

    let err = tree.release_domain(tree.root(), 9).unwrap_err();

    assert!(err.to_string().contains("no such domain"));
    assert_eq!(store.calls(), vec!["release 9"]);
}
