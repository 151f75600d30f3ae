//! Tests for the node tree over an in-memory store

use std::sync::Arc;

use xstree::application::ApplicationError;
use xstree::domain::{DomainError, NodeValue};
use xstree::infrastructure::{MemoryStore, Store, StoreHandle, StoreOp};
use xstree::util::testing;
use xstree::{SaveOptions, Tree, TreeNodeConvert};

fn guest_store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::with_entries([
        ("vm/name", "guest"),
        ("vm/memory", "512"),
        ("vm/device/vif/mac", "00:16:3e:01:02:03"),
    ]))
}

fn bound_tree(store: &Arc<MemoryStore>, path: &str) -> Tree {
    Tree::from_store(StoreHandle::new(store.clone(), path))
}

// ============================================================
// Loading
// ============================================================

#[test]
fn given_populated_store_when_loading_root_then_mirrors_subtree_clean() {
    testing::init_test_setup();
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();

    tree.load(root).unwrap();

    let name = tree.child(root, "name").expect("name loaded");
    assert_eq!(tree.scalar_value(name).unwrap(), Some("guest"));
    let mac = tree.lookup(root, "device/vif/mac").unwrap();
    assert_eq!(tree.scalar_value(mac).unwrap(), Some("00:16:3e:01:02:03"));
    assert!(!tree.is_dirty(name).unwrap());
    assert_eq!(tree.store_path(mac).unwrap().as_deref(), Some("vm/device/vif/mac"));
    assert!(store.operations().is_empty(), "loading must not write");
}

#[test]
fn given_unloaded_tree_when_getting_stored_key_then_loads_lazily() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    assert!(tree.child(root, "memory").is_none());

    let memory = tree.get(root, "memory").unwrap();

    assert_eq!(tree.scalar_value(memory).unwrap(), Some("512"));
    assert_eq!(tree.child(root, "memory"), Some(memory));
    assert!(tree.child(root, "name").is_none(), "only the requested child loads");
}

#[test]
fn given_missing_key_when_getting_then_not_found() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();

    let err = tree.get(root, "vcpus").unwrap_err();

    assert!(err.is_not_found());
    assert!(err.to_string().contains("vcpus"));
}

#[test]
fn given_invalid_key_when_getting_then_invalid_key_error() {
    let mut tree = Tree::new();
    let root = tree.root();

    let err = tree.get(root, "bad key").unwrap_err();

    assert!(matches!(
        err,
        ApplicationError::Domain(DomainError::InvalidKey { .. })
    ));
}

// ============================================================
// Saving
// ============================================================

#[test]
fn given_changed_values_when_saving_then_writes_only_dirty_nodes() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.load(root).unwrap();

    tree.set(root, "memory", "1024").unwrap();
    tree.set(root, "name", "guest").unwrap();
    tree.save(root, SaveOptions::default()).unwrap();

    assert_eq!(
        store.operations(),
        vec![StoreOp::Write {
            path: "vm/memory".into(),
            value: "1024".into()
        }]
    );
}

#[test]
fn given_saved_tree_when_saving_again_then_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.set(root, "image/kernel", "/boot/vmlinuz").unwrap();

    tree.save(root, SaveOptions::default()).unwrap();
    tree.save(root, SaveOptions::default()).unwrap();

    assert_eq!(store.writes(), 1);
    assert_eq!(
        store.get_data("vm/image/kernel").unwrap().as_deref(),
        Some("/boot/vmlinuz")
    );
}

#[test]
fn given_clean_tree_when_force_saving_then_rewrites_every_value() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.load(root).unwrap();

    tree.save(root, SaveOptions::force()).unwrap();

    assert_eq!(store.writes(), 3);
}

#[test]
fn given_store_only_children_when_sync_saving_then_deletes_them() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.set(root, "name", "other").unwrap();

    tree.save(root, SaveOptions::sync()).unwrap();

    assert_eq!(store.get_data("vm/name").unwrap().as_deref(), Some("other"));
    assert!(!store.contains("vm/memory"));
    assert!(!store.contains("vm/device"));
}

#[test]
fn given_unbound_tree_when_saving_then_nothing_happens() {
    let mut tree = Tree::new();
    let root = tree.root();
    tree.set(root, "a", "1").unwrap();

    tree.save(root, SaveOptions::force()).unwrap();

    assert!(tree.is_dirty(tree.child(root, "a").unwrap()).unwrap());
}

#[test]
fn given_set_saved_when_assigning_then_writes_immediately() {
    let store = Arc::new(MemoryStore::new());
    let mut tree = bound_tree(&store, "");
    let root = tree.root();

    let node = tree.set_saved(root, "console/port", "5").unwrap();

    assert!(!tree.is_dirty(node).unwrap());
    assert_eq!(store.get_data("console/port").unwrap().as_deref(), Some("5"));
}

// ============================================================
// Structure
// ============================================================

#[test]
fn given_map_value_when_setting_then_fans_out_to_children() {
    let mut tree = Tree::new();
    let root = tree.root();

    let vif = tree
        .set(
            root,
            "device/vif",
            NodeValue::map([("mac", "00:16:3e:00:00:01"), ("bridge", "xenbr0")]),
        )
        .unwrap();

    assert_eq!(tree.scalar_value(vif).unwrap(), None);
    let keys: Vec<&str> = tree.children(vif).unwrap().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["bridge", "mac"]);
    assert_eq!(tree.path(tree.child(vif, "mac").unwrap()).unwrap(), "device/vif/mac");
}

#[test]
fn given_invalid_segment_when_adding_child_then_creates_nothing() {
    let mut tree = Tree::new();
    let root = tree.root();

    let err = tree.add_child(root, "ok/also_ok/not ok").unwrap_err();

    assert!(matches!(err, ApplicationError::Domain(_)));
    assert_eq!(tree.len(), 1);
}

#[test]
fn given_loaded_child_when_deleting_then_removed_from_memory_and_store() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.load(root).unwrap();
    let device = tree.child(root, "device").unwrap();
    let vif = tree.child(device, "vif").unwrap();

    tree.delete(root, "device").unwrap();

    assert!(tree.child(root, "device").is_none());
    assert!(tree.node(vif).is_none(), "subtree dropped from the arena");
    assert!(!store.contains("vm/device/vif/mac"));
    assert!(store.contains("vm/name"));
}

#[test]
fn given_node_when_clearing_then_children_gone_and_value_kept() {
    let store = Arc::new(MemoryStore::with_entries([("vm", "root-value"), ("vm/a", "1")]));
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.load(root).unwrap();

    tree.clear(root).unwrap();

    assert!(tree.children(root).unwrap().is_empty());
    assert_eq!(tree.scalar_value(root).unwrap(), Some("root-value"));
    assert!(!store.contains("vm/a"));
}

#[test]
fn given_node_when_delete_node_then_empty_and_still_attached() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    let device = tree.lookup(root, "device").unwrap();

    tree.delete_node(device).unwrap();

    assert_eq!(tree.child(root, "device"), Some(device));
    assert!(tree.children(device).unwrap().is_empty());
    assert!(!store.contains("vm/device"));
}

#[test]
fn given_loaded_tree_when_rendering_then_lists_values() {
    let store = guest_store();
    let mut tree = bound_tree(&store, "vm");
    let root = tree.root();
    tree.load(root).unwrap();

    let rendered = tree.to_tree_string().to_string();

    assert!(rendered.contains("memory = \"512\""));
    assert!(rendered.contains("vif"));
}

// ============================================================
// Domains
// ============================================================

#[test]
fn given_bound_node_when_introducing_domain_then_defaults_to_node_path() {
    let store = Arc::new(MemoryStore::new());
    let mut tree = bound_tree(&store, "");
    let root = tree.root();
    let dom = tree.add_child(root, "local/domain/7").unwrap();

    tree.introduce_domain(dom, 7, 0x1000, 3, None).unwrap();
    tree.release_domain(dom, 7).unwrap();

    assert_eq!(
        store.operations(),
        vec![
            StoreOp::Introduce {
                domid: 7,
                path: "local/domain/7".into()
            },
            StoreOp::Release { domid: 7 },
        ]
    );
}

#[test]
fn given_unbound_node_when_releasing_domain_then_unbound_error() {
    let tree = Tree::new();

    let err = tree.release_domain(tree.root(), 3).unwrap_err();

    assert!(matches!(err, ApplicationError::Unbound { .. }));
}
