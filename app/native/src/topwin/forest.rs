//! Arena storage for the window forest.
//!
//! Nodes live in a slot vector addressed by [`NodeId`]; freed slots are
//! recycled through a free list. Parent and child links are plain ids, so
//! relinking a subtree is an index rewrite.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use super::node::{NodeId, TopWinNode};
use crate::messaging::WindowId;

#[derive(Debug, Default)]
pub struct Forest {
    slots: Vec<Option<TopWinNode>>,
    free: Vec<usize>,
    by_window: HashMap<WindowId, NodeId>,
}

impl Forest {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Store a node and index it by window id.
    pub fn insert(&mut self, node: TopWinNode) -> NodeId {
        let window = node.window;
        let id = if let Some(slot) = self.free.pop() {
            self.slots[slot] = Some(node);
            NodeId(slot)
        } else {
            self.slots.push(Some(node));
            NodeId(self.slots.len() - 1)
        };
        self.by_window.insert(window, id);
        id
    }

    /// Free a node's slot. Links pointing at it must already be gone.
    pub fn remove(&mut self, id: NodeId) -> Option<TopWinNode> {
        let node = self.slots.get_mut(id.0)?.take()?;
        self.by_window.remove(&node.window);
        self.free.push(id.0);
        Some(node)
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&TopWinNode> { self.slots.get(id.0)?.as_ref() }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut TopWinNode> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    /// Find the node of a window.
    #[must_use]
    pub fn lookup(&self, window: WindowId) -> Option<NodeId> { self.by_window.get(&window).copied() }

    /// Whether `id` still refers to `window` (ids are recycled).
    #[must_use]
    pub fn holds(&self, id: NodeId, window: WindowId) -> bool {
        self.get(id).is_some_and(|node| node.window == window)
    }

    #[must_use]
    pub fn len(&self) -> usize { self.by_window.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.by_window.is_empty() }

    /// All live nodes in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &TopWinNode)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|node| (NodeId(index), node)))
    }

    /// Ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.get(id).and_then(|node| node.parent), |&parent| {
            self.get(parent).and_then(|node| node.parent)
        })
    }

    /// The root of the tree containing `id`.
    #[must_use]
    pub fn root_of(&self, id: NodeId) -> NodeId { self.ancestors(id).last().unwrap_or(id) }

    /// `id` and all of its descendants, parents before children.
    #[must_use]
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.get(next) else { continue };
            out.push(next);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Whether `ancestor` is a proper ancestor of `id`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }
}

impl Index<NodeId> for Forest {
    type Output = TopWinNode;

    fn index(&self, id: NodeId) -> &TopWinNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }
}

impl IndexMut<NodeId> for Forest {
    fn index_mut(&mut self, id: NodeId) -> &mut TopWinNode {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale node id {id:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppHandle;
    use crate::messaging::mailbox;
    use crate::region::Rect;
    use crate::topwin::node::{Layer, WindowSpec};

    fn node(window: WindowId) -> TopWinNode {
        let (postbox, _mailbox) = mailbox(1);
        let spec = WindowSpec::new(Rect::new(0, 0, 10, 10));
        TopWinNode::new(window, AppHandle::new("t", postbox), spec, Layer::Normal)
    }

    fn link(forest: &mut Forest, parent: NodeId, child: NodeId) {
        forest[child].parent = Some(parent);
        forest[parent].children.push(child);
    }

    #[test]
    fn test_slots_are_recycled() {
        let mut forest = Forest::new();
        let a = forest.insert(node(1));
        let b = forest.insert(node(2));
        assert_eq!(forest.remove(a).map(|n| n.window), Some(1));
        assert_eq!(forest.lookup(1), None);

        let c = forest.insert(node(3));
        assert_eq!(c, a);
        assert!(forest.holds(c, 3));
        assert!(!forest.holds(c, 1));
        assert_eq!(forest.len(), 2);
        assert_eq!(forest.lookup(2), Some(b));
    }

    #[test]
    fn test_tree_walks() {
        let mut forest = Forest::new();
        let root = forest.insert(node(1));
        let a = forest.insert(node(2));
        let b = forest.insert(node(3));
        let a1 = forest.insert(node(4));
        link(&mut forest, root, a);
        link(&mut forest, root, b);
        link(&mut forest, a, a1);

        assert_eq!(forest.subtree(root), vec![root, a, a1, b]);
        assert_eq!(forest.ancestors(a1).collect::<Vec<_>>(), vec![a, root]);
        assert_eq!(forest.root_of(a1), root);
        assert_eq!(forest.root_of(root), root);
        assert!(forest.is_ancestor(root, a1));
        assert!(!forest.is_ancestor(b, a1));
    }
}
