//! Manager state, window creation and destruction, and inspection.

use serde::Serialize;

use super::effects::Effect;
use super::forest::Forest;
use super::node::{Layer, NodeFlags, NodeId, TopWinNode, WindowSpec};
use crate::app::{AppHandle, AppId};
use crate::error::{ServerError, ServerResult};
use crate::messaging::WindowId;
use crate::region::{Rect, Region};

/// Read-only description of one window.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowInfo {
    pub window: WindowId,
    pub parent: Option<WindowId>,
    pub app: AppId,
    pub app_name: String,
    pub extent: Rect,
    pub layer: Layer,
    pub flags: Vec<&'static str>,
    pub clip_rects: usize,
    pub clip_extents: Rect,
    pub monitors: usize,
    /// Position in the front-to-back order of shown windows.
    pub z: Option<usize>,
}

/// The window forest plus stacking, focus and clip state.
#[derive(Debug)]
pub struct TopWinManager {
    pub(super) forest: Forest,
    /// Shown roots front-to-back (ordered by layer), then hidden roots.
    pub(super) roots: Vec<NodeId>,
    pub(super) focus: Option<NodeId>,
    pub(super) screen: Rect,
    pub(super) effects: Vec<Effect>,
    pub(super) damage: Region,
}

impl TopWinManager {
    #[must_use]
    pub fn new(screen: Rect) -> Self {
        Self {
            forest: Forest::new(),
            roots: Vec::new(),
            focus: None,
            screen,
            effects: Vec::new(),
            damage: Region::new(),
        }
    }

    #[must_use]
    pub const fn screen(&self) -> Rect { self.screen }

    #[must_use]
    pub fn len(&self) -> usize { self.forest.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.forest.is_empty() }

    pub(super) fn find(&self, window: WindowId) -> ServerResult<NodeId> {
        self.forest.lookup(window).ok_or(ServerError::WindowNotFound)
    }

    pub(super) fn is_shown(&self, id: NodeId) -> bool { self.forest[id].is_shown() }

    /// Number of roots in the shown partition.
    pub(super) fn shown_root_count(&self) -> usize {
        self.roots.iter().take_while(|&&root| self.is_shown(root)).count()
    }

    // ========================================================================
    // Creation and destruction
    // ========================================================================

    /// Add a hidden window, as a new root or as a child of `parent`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::WindowExists`] for a duplicate id and
    /// [`ServerError::ParentNotFound`] if `parent` is not in the forest.
    pub fn add(
        &mut self,
        app: &AppHandle,
        window: WindowId,
        parent: Option<WindowId>,
        spec: WindowSpec,
    ) -> ServerResult<()> {
        if self.forest.lookup(window).is_some() {
            return Err(ServerError::WindowExists);
        }
        let parent = match parent {
            Some(parent) => Some(self.forest.lookup(parent).ok_or(ServerError::ParentNotFound)?),
            None => None,
        };

        // Children live in their root's layer.
        let layer = parent.map_or_else(|| Layer::from_style(spec.style), |p| self.forest[p].layer);
        let id = self.forest.insert(TopWinNode::new(window, app.clone(), spec, layer));
        app.window_created();

        match parent {
            Some(parent) => {
                self.forest[id].parent = Some(parent);
                // First among the hidden children.
                let at = self.forest[parent]
                    .children
                    .iter()
                    .take_while(|&&child| self.forest[child].is_shown())
                    .count();
                self.forest[parent].children.insert(at, id);
            }
            None => {
                let at = self.shown_root_count();
                self.roots.insert(at, id);
            }
        }

        tracing::debug!(window, parent = ?parent.map(|p| self.forest[p].window), ?layer, "topwin: added");
        Ok(())
    }

    /// Destroy a window and its whole subtree.
    ///
    /// Returns the destroyed windows with their owners, parents first.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::WindowNotFound`] if the window is unknown.
    pub fn remove(&mut self, window: WindowId) -> ServerResult<Vec<(WindowId, AppHandle)>> {
        let id = self.find(window)?;
        if self.is_shown(id) {
            self.hide_node(id);
        }

        let subtree = self.forest.subtree(id);
        for &node in subtree.iter().rev() {
            if self.forest[node].flags.contains(NodeFlags::MODAL_OWNER) {
                self.leave_modal(node);
            }
        }
        self.unlink(id);

        let mut removed = Vec::with_capacity(subtree.len());
        for node in subtree {
            if self.focus == Some(node) {
                self.focus = None;
            }
            if let Some(node) = self.forest.remove(node) {
                node.app.window_destroyed();
                removed.push((node.window, node.app));
            }
        }

        tracing::debug!(window, count = removed.len(), "topwin: removed");
        Ok(removed)
    }

    /// Windows owned by `app` whose parent is not also owned by it.
    #[must_use]
    pub fn top_windows_of(&self, app: AppId) -> Vec<WindowId> {
        self.forest
            .iter()
            .filter(|(_, node)| node.app.id() == app)
            .filter(|(_, node)| node.parent.is_none_or(|p| self.forest[p].app.id() != app))
            .map(|(_, node)| node.window)
            .collect()
    }

    // ========================================================================
    // Stacking order
    // ========================================================================

    /// Detach `id` from its parent's child list or from the root list.
    pub(super) fn unlink(&mut self, id: NodeId) {
        match self.forest[id].parent {
            Some(parent) => self.forest[parent].children.retain(|child| *child != id),
            None => self.roots.retain(|root| *root != id),
        }
    }

    /// Move a shown root to the front of its layer. Returns whether it moved.
    pub(super) fn raise_root(&mut self, root: NodeId) -> bool {
        let Some(from) = self.roots.iter().position(|&r| r == root) else {
            return false;
        };
        self.roots.remove(from);

        let layer = self.forest[root].layer;
        let to = self
            .roots
            .iter()
            .position(|&r| !self.is_shown(r) || self.forest[r].layer >= layer)
            .unwrap_or(self.roots.len());
        self.roots.insert(to, root);
        from != to
    }

    /// Move a child to the front of its siblings. Returns whether it moved.
    pub(super) fn raise_child(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.forest[id].parent else {
            return false;
        };
        let children = &mut self.forest[parent].children;
        match children.iter().position(|&c| c == id) {
            Some(0) | None => false,
            Some(from) => {
                children.remove(from);
                children.insert(0, id);
                true
            }
        }
    }

    /// Put `id` in front of its siblings (or its layer, for a root).
    pub(super) fn raise(&mut self, id: NodeId) -> bool {
        if self.forest[id].parent.is_some() {
            self.raise_child(id)
        } else {
            self.raise_root(id)
        }
    }

    /// Move `id` to the tail of its sibling list (or of the root list).
    pub(super) fn sink(&mut self, id: NodeId) {
        self.unlink(id);
        match self.forest[id].parent {
            Some(parent) => self.forest[parent].children.push(id),
            None => self.roots.push(id),
        }
    }

    /// Shown windows front-to-back: layers in order, children before their
    /// parent.
    #[must_use]
    pub(super) fn front_to_back(&self) -> Vec<NodeId> {
        fn visit(manager: &TopWinManager, id: NodeId, out: &mut Vec<NodeId>) {
            let node = &manager.forest[id];
            if !node.is_shown() {
                return;
            }
            for &child in &node.children {
                visit(manager, child, out);
            }
            out.push(id);
        }

        let mut out = Vec::with_capacity(self.forest.len());
        for &root in &self.roots[..self.shown_root_count()] {
            visit(self, root, &mut out);
        }
        out
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    #[must_use]
    pub fn node(&self, window: WindowId) -> Option<&TopWinNode> {
        self.forest.lookup(window).map(|id| &self.forest[id])
    }

    #[must_use]
    pub fn flags(&self, window: WindowId) -> Option<NodeFlags> { self.node(window).map(TopWinNode::flags) }

    #[must_use]
    pub fn clip(&self, window: WindowId) -> Option<&Region> { self.node(window).map(TopWinNode::clip) }

    #[must_use]
    pub fn owner(&self, window: WindowId) -> Option<&AppHandle> { self.node(window).map(TopWinNode::app) }

    /// The focused window.
    #[must_use]
    pub fn focus(&self) -> Option<WindowId> { self.focus.map(|id| self.forest[id].window) }

    /// Owner of the focused window.
    #[must_use]
    pub fn focus_app(&self) -> Option<&AppHandle> { self.focus.map(|id| &self.forest[id].app) }

    /// Shown windows front-to-back.
    #[must_use]
    pub fn z_order(&self) -> Vec<WindowId> {
        self.front_to_back().into_iter().map(|id| self.forest[id].window).collect()
    }

    /// Describe every window: shown ones in stacking order, then hidden ones.
    #[must_use]
    pub fn snapshot(&self) -> Vec<WindowInfo> {
        let shown = self.front_to_back();
        let mut order = shown.clone();
        for &root in &self.roots {
            order.extend(self.forest.subtree(root).into_iter().filter(|&id| !self.is_shown(id)));
        }

        order
            .into_iter()
            .map(|id| {
                let node = &self.forest[id];
                WindowInfo {
                    window: node.window,
                    parent: node.parent.map(|p| self.forest[p].window),
                    app: node.app.id(),
                    app_name: node.app.name().to_string(),
                    extent: node.extent,
                    layer: node.layer,
                    flags: node.flags.names(),
                    clip_rects: node.clip.num_rects(),
                    clip_extents: node.clip.extents(),
                    monitors: node.monitors.len(),
                    z: shown.iter().position(|&s| s == id),
                }
            })
            .collect()
    }

    // ========================================================================
    // Outbox
    // ========================================================================

    /// Take the queued effects, oldest first.
    pub fn drain_effects(&mut self) -> Vec<Effect> { std::mem::take(&mut self.effects) }

    /// Take the accumulated screen damage.
    pub fn take_damage(&mut self) -> Region { std::mem::take(&mut self.damage) }

    pub(super) fn emit(&mut self, effect: Effect) { self.effects.push(effect); }
}

#[cfg(test)]
pub(super) mod tests {
    use super::*;
    use crate::messaging::mailbox;
    use crate::topwin::WindowStyle;

    pub const SCREEN: Rect = Rect::new(0, 0, 640, 480);

    pub fn app(name: &str) -> AppHandle {
        let (postbox, _mailbox) = mailbox(1);
        AppHandle::new(name, postbox)
    }

    pub fn spec(x1: i16, y1: i16, x2: i16, y2: i16) -> WindowSpec {
        WindowSpec::new(Rect::new(x1, y1, x2, y2))
    }

    #[test]
    fn test_add_rejects_duplicates_and_orphans() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 10, 10)).unwrap();
        assert_eq!(wm.add(&a, 1, None, spec(0, 0, 10, 10)), Err(ServerError::WindowExists));
        assert_eq!(wm.add(&a, 2, Some(99), spec(0, 0, 10, 10)), Err(ServerError::ParentNotFound));
        assert_eq!(wm.len(), 1);
        assert_eq!(a.window_count(), 1);
    }

    #[test]
    fn test_new_windows_are_hidden() {
        let mut wm = TopWinManager::new(SCREEN);
        wm.add(&app("a"), 1, None, spec(0, 0, 10, 10)).unwrap();
        let flags = wm.flags(1).unwrap();
        assert!(!flags.contains(NodeFlags::SHOWN));
        assert!(wm.z_order().is_empty());
        assert!(wm.drain_effects().is_empty());
    }

    #[test]
    fn test_children_inherit_root_layer() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 10, 10).with_style(WindowStyle::ON_TOP)).unwrap();
        wm.add(&a, 2, Some(1), spec(0, 0, 5, 5)).unwrap();
        assert_eq!(wm.node(2).unwrap().layer(), Layer::Top);
        assert!(wm.flags(2).unwrap().contains(NodeFlags::ON_TOP));
    }

    #[test]
    fn test_remove_destroys_subtree() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        let b = app("b");
        wm.add(&a, 1, None, spec(0, 0, 100, 100)).unwrap();
        wm.add(&a, 2, Some(1), spec(10, 10, 50, 50)).unwrap();
        wm.add(&b, 3, Some(2), spec(20, 20, 30, 30)).unwrap();
        wm.show(1).unwrap();

        let removed: Vec<WindowId> = wm.remove(1).unwrap().into_iter().map(|(w, _)| w).collect();
        assert_eq!(removed, vec![1, 2, 3]);
        assert!(wm.is_empty());
        assert_eq!(wm.focus(), None);
        assert_eq!(a.window_count(), 0);
        assert_eq!(b.window_count(), 0);
        assert_eq!(wm.remove(1), Err(ServerError::WindowNotFound));
    }

    #[test]
    fn test_top_windows_of() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        let b = app("b");
        wm.add(&a, 1, None, spec(0, 0, 10, 10)).unwrap();
        wm.add(&a, 2, Some(1), spec(0, 0, 10, 10)).unwrap();
        wm.add(&b, 3, Some(1), spec(0, 0, 10, 10)).unwrap();
        wm.add(&a, 4, Some(3), spec(0, 0, 10, 10)).unwrap();

        let mut tops = wm.top_windows_of(a.id());
        tops.sort_unstable();
        assert_eq!(tops, vec![1, 4]);
        assert_eq!(wm.top_windows_of(b.id()), vec![3]);
    }

    #[test]
    fn test_snapshot_lists_shown_then_hidden() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 10, 10)).unwrap();
        wm.add(&a, 2, None, spec(0, 0, 10, 10)).unwrap();
        wm.show(2).unwrap();

        let snapshot = wm.snapshot();
        let windows: Vec<WindowId> = snapshot.iter().map(|info| info.window).collect();
        assert_eq!(windows, vec![2, 1]);
        assert_eq!(snapshot[0].z, Some(0));
        assert_eq!(snapshot[1].z, None);
        assert!(snapshot[0].flags.contains(&"activated"));
        assert_eq!(snapshot[0].app_name, "a");
    }
}
