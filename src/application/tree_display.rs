//! Printable view of a node tree.

use termtree::Tree as TermTree;
use tracing::instrument;

use crate::application::tree::{NodeId, Tree};

pub trait TreeNodeConvert {
    fn to_tree_string(&self) -> TermTree<String>;
}

fn label(tree: &Tree, idx: NodeId) -> String {
    match tree.node(idx) {
        Some(node) => {
            let name = if node.name().is_empty() { "/" } else { node.name() };
            match node.scalar_value() {
                Some(value) => format!("{} = {:?}", name, value),
                None => name.to_string(),
            }
        }
        None => "<stale>".to_string(),
    }
}

fn build_tree(tree: &Tree, idx: NodeId, parent: &mut TermTree<String>) {
    if let Ok(children) = tree.children(idx) {
        for (_, child_idx) in children {
            let mut child = TermTree::new(label(tree, child_idx));
            build_tree(tree, child_idx, &mut child);
            parent.push(child);
        }
    }
}

impl TreeNodeConvert for Tree {
    #[instrument(level = "debug", skip(self))]
    fn to_tree_string(&self) -> TermTree<String> {
        let root = self.root();
        let mut out = TermTree::new(label(self, root));
        build_tree(self, root, &mut out);
        out
    }
}
