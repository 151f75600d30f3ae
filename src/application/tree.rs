//! Store-backed node tree
//!
//! Nodes live in a generational arena. Parent-to-child edges own the
//! children; the parent index on each node is a plain back-reference used to
//! derive paths. Reads pull from the store lazily, writes are deferred until
//! [`Tree::save`].

use std::collections::BTreeMap;

use generational_arena::{Arena, Index};
use tracing::{debug, info, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{check_key, child_path, join_path, parse_path, NodeValue};
use crate::infrastructure::StoreHandle;

/// Handle on a node inside a [`Tree`].
pub type NodeId = Index;

/// Flags for [`Tree::save`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveOptions {
    /// Write every non-empty value, dirty or not.
    pub force: bool,
    /// Like `force`, and also delete store children missing from memory.
    pub sync: bool,
}

impl SaveOptions {
    pub fn force() -> Self {
        Self {
            force: true,
            sync: false,
        }
    }

    pub fn sync() -> Self {
        Self {
            force: false,
            sync: true,
        }
    }
}

#[derive(Debug)]
pub struct Node {
    name: String,
    data: Option<String>,
    children: BTreeMap<String, Index>,
    parent: Option<Index>,
    store: Option<StoreHandle>,
    /// Value set since the last successful save (or never saved)
    dirty: bool,
}

impl Node {
    fn new(name: &str, parent: Option<Index>, store: Option<StoreHandle>) -> Self {
        Self {
            name: name.to_string(),
            data: None,
            children: BTreeMap::new(),
            parent,
            store,
            dirty: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scalar_value(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> Option<&StoreHandle> {
        self.store.as_ref()
    }

    pub fn child_keys(&self) -> impl Iterator<Item = &str> {
        self.children.keys().map(String::as_str)
    }

    fn set_scalar(&mut self, value: String) {
        if self.data.as_deref() != Some(value.as_str()) {
            self.dirty = true;
        }
        self.data = Some(value);
    }
}

/// In-memory mirror of a store subtree.
#[derive(Debug)]
pub struct Tree {
    arena: Arena<Node>,
    root: Index,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Detached, purely in-memory tree.
    pub fn new() -> Self {
        Self::with_root(None)
    }

    /// Tree whose root mirrors `handle`'s location.
    pub fn from_store(handle: StoreHandle) -> Self {
        Self::with_root(Some(handle))
    }

    fn with_root(store: Option<StoreHandle>) -> Self {
        let mut arena = Arena::new();
        let root = arena.insert(Node::new("", None, store));
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of materialized nodes, root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// True when only the root is materialized; the root alone counts 1 in [`Tree::len`].
    pub fn is_empty(&self) -> bool {
        self.arena.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    fn get_node(&self, id: NodeId) -> ApplicationResult<&Node> {
        self.arena.get(id).ok_or(ApplicationError::StaleNode(id))
    }

    fn get_node_mut(&mut self, id: NodeId) -> ApplicationResult<&mut Node> {
        self.arena.get_mut(id).ok_or(ApplicationError::StaleNode(id))
    }

    pub fn name(&self, id: NodeId) -> ApplicationResult<&str> {
        Ok(self.get_node(id)?.name())
    }

    /// Slash-joined names from the root (exclusive) down to `id`.
    pub fn path(&self, id: NodeId) -> ApplicationResult<String> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(idx) = current {
            let node = self.get_node(idx)?;
            names.push(node.name.as_str());
            current = node.parent;
        }
        names.reverse();
        Ok(join_path(names))
    }

    /// Path of the store location `id` is bound to, if any.
    pub fn store_path(&self, id: NodeId) -> ApplicationResult<Option<String>> {
        Ok(self
            .get_node(id)?
            .store
            .as_ref()
            .map(|s| s.rel_path().to_string()))
    }

    /// The node's own scalar value, independent of its children.
    pub fn scalar_value(&self, id: NodeId) -> ApplicationResult<Option<&str>> {
        Ok(self.get_node(id)?.scalar_value())
    }

    pub fn is_dirty(&self, id: NodeId) -> ApplicationResult<bool> {
        Ok(self.get_node(id)?.dirty)
    }

    /// Materialized children as `(key, id)`, ordered by key.
    pub fn children(&self, id: NodeId) -> ApplicationResult<Vec<(&str, NodeId)>> {
        Ok(self
            .get_node(id)?
            .children
            .iter()
            .map(|(k, idx)| (k.as_str(), *idx))
            .collect())
    }

    /// In-memory child lookup; never touches the store.
    pub fn child(&self, id: NodeId, key: &str) -> Option<NodeId> {
        self.arena.get(id)?.children.get(key).copied()
    }

    // Existing child, or a fresh one bound to the parent's store child.
    #[instrument(level = "trace", skip(self))]
    fn attach(&mut self, parent: NodeId, key: &str) -> ApplicationResult<NodeId> {
        let node = self.get_node(parent)?;
        if let Some(idx) = node.children.get(key) {
            return Ok(*idx);
        }
        check_key(key)?;
        let store = node.store.as_ref().map(|s| s.get_child(key));

        let idx = self.arena.insert(Node::new(key, Some(parent), store));
        self.get_node_mut(parent)?
            .children
            .insert(key.to_string(), idx);
        Ok(idx)
    }

    /// Walk `path` below `id`, creating missing nodes; returns the last one.
    ///
    /// Empty segments are ignored, so an empty path returns `id` itself.
    /// Every segment is validated before anything is created.
    pub fn add_child(&mut self, id: NodeId, path: &str) -> ApplicationResult<NodeId> {
        let segments = parse_path(path)?;
        let mut current = id;
        for segment in segments {
            current = self.attach(current, segment)?;
        }
        Ok(current)
    }

    /// Child `key`, loading it from the store when not yet in memory.
    #[instrument(level = "debug", skip(self))]
    pub fn get(&mut self, id: NodeId, key: &str) -> ApplicationResult<NodeId> {
        check_key(key)?;
        let node = self.get_node(id)?;
        if let Some(idx) = node.children.get(key) {
            return Ok(*idx);
        }
        if let Some(store) = node.store.clone() {
            if store.ls()?.iter().any(|k| k == key) {
                let idx = self.attach(id, key)?;
                self.load(idx)?;
                return Ok(idx);
            }
        }
        Err(ApplicationError::NotFound {
            path: child_path(&self.path(id)?, key),
        })
    }

    /// Multi-segment [`Tree::get`].
    pub fn lookup(&mut self, id: NodeId, path: &str) -> ApplicationResult<NodeId> {
        let segments = parse_path(path)?;
        let mut current = id;
        for segment in segments {
            current = self.get(current, segment)?;
        }
        Ok(current)
    }

    /// Assign `value` at `path` below `id`. Nothing is written until saved.
    pub fn set(
        &mut self,
        id: NodeId,
        path: &str,
        value: impl Into<NodeValue>,
    ) -> ApplicationResult<NodeId> {
        let node = self.add_child(id, path)?;
        self.set_data(node, value)?;
        Ok(node)
    }

    /// [`Tree::set`] followed by saving the assigned node.
    pub fn set_saved(
        &mut self,
        id: NodeId,
        path: &str,
        value: impl Into<NodeValue>,
    ) -> ApplicationResult<NodeId> {
        let node = self.set(id, path, value)?;
        self.save(node, SaveOptions::default())?;
        Ok(node)
    }

    /// Scalars become the node's own value; maps assign each entry as a child.
    pub fn set_data(&mut self, id: NodeId, value: impl Into<NodeValue>) -> ApplicationResult<()> {
        match value.into() {
            NodeValue::Scalar(s) => {
                self.get_node_mut(id)?.set_scalar(s);
            }
            NodeValue::Map(entries) => {
                for (key, v) in entries {
                    self.set(id, &key, v)?;
                }
            }
        }
        Ok(())
    }

    // Remove the subtree under `idx` (inclusive) from the arena.
    fn drop_subtree(&mut self, idx: Index) {
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.arena.remove(current) {
                stack.extend(node.children.into_values());
            }
        }
    }

    fn drop_children(&mut self, id: NodeId) -> ApplicationResult<()> {
        let children = std::mem::take(&mut self.get_node_mut(id)?.children);
        for idx in children.into_values() {
            self.drop_subtree(idx);
        }
        Ok(())
    }

    /// Drop child `key` from memory and delete it from the store.
    pub fn delete(&mut self, id: NodeId, key: &str) -> ApplicationResult<()> {
        check_key(key)?;
        let node = self.get_node_mut(id)?;
        let removed = node.children.remove(key);
        let store = node.store.clone();
        if let Some(idx) = removed {
            self.drop_subtree(idx);
        }
        if let Some(store) = store {
            store.delete_child(key)?;
        }
        Ok(())
    }

    /// Empty the node itself: drop its children and value, delete its store location.
    ///
    /// The node stays attached to its parent.
    pub fn delete_node(&mut self, id: NodeId) -> ApplicationResult<()> {
        self.drop_children(id)?;
        let node = self.get_node_mut(id)?;
        node.data = None;
        if let Some(store) = &node.store {
            store.delete()?;
        }
        Ok(())
    }

    /// Drop all children in memory and in the store. The node's own value stays.
    pub fn clear(&mut self, id: NodeId) -> ApplicationResult<()> {
        self.drop_children(id)?;
        if let Some(store) = &self.get_node(id)?.store {
            store.delete_children()?;
        }
        Ok(())
    }

    /// Read this node and everything below it from the store; the subtree ends clean.
    #[instrument(level = "trace", skip(self))]
    pub fn load(&mut self, id: NodeId) -> ApplicationResult<()> {
        let Some(store) = self.get_node(id)?.store.clone() else {
            return Ok(());
        };
        let data = store.get_data()?;
        self.get_node_mut(id)?.data = data;
        for key in store.ls()? {
            let child = self.attach(id, &key)?;
            self.load(child)?;
        }
        self.get_node_mut(id)?.dirty = false;
        Ok(())
    }

    /// Write values to the store, recursively.
    ///
    /// A value is written when present and dirty, or always under `force` or
    /// `sync`. With `sync`, store children absent from memory are deleted.
    pub fn save(&mut self, id: NodeId, opts: SaveOptions) -> ApplicationResult<()> {
        let node = self.get_node(id)?;
        let Some(store) = node.store.clone() else {
            return Ok(());
        };
        let pending = match &node.data {
            Some(data) if opts.force || opts.sync || node.dirty => Some(data.clone()),
            _ => None,
        };
        if let Some(data) = pending {
            store.set_data(&data)?;
            self.get_node_mut(id)?.dirty = false;
        }

        let children: Vec<Index> = self.get_node(id)?.children.values().copied().collect();
        for child in children {
            self.save(child, opts)?;
        }

        if opts.sync {
            for key in store.ls()? {
                if !self.get_node(id)?.children.contains_key(&key) {
                    debug!("save: sync removes {}/{}", store.rel_path(), key);
                    store.delete_child(&key)?;
                }
            }
        }
        Ok(())
    }

    fn bound_store(&self, id: NodeId) -> ApplicationResult<&StoreHandle> {
        match &self.get_node(id)?.store {
            Some(store) => Ok(store),
            None => Err(ApplicationError::Unbound {
                path: self.path(id)?,
            }),
        }
    }

    /// Forward a domain introduction to the store; `path` defaults to the node's store path.
    pub fn introduce_domain(
        &self,
        id: NodeId,
        domid: u32,
        page: u64,
        channel: u32,
        path: Option<&str>,
    ) -> ApplicationResult<()> {
        let store = self.bound_store(id)?;
        info!(
            "introduce_domain: domid={} page={} channel={} path={}",
            domid,
            page,
            channel,
            path.unwrap_or(store.rel_path())
        );
        store
            .introduce_domain(domid, page, channel, path)
            .map_err(|e| {
                warn!("introduce_domain: domid={} failed: {}", domid, e);
                e.into()
            })
    }

    pub fn release_domain(&self, id: NodeId, domid: u32) -> ApplicationResult<()> {
        let store = self.bound_store(id)?;
        info!("release_domain: domid={}", domid);
        store.release_domain(domid).map_err(|e| {
            warn!("release_domain: domid={} failed: {}", domid, e);
            e.into()
        })
    }
}
