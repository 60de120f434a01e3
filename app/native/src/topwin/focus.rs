//! Showing, hiding, activation and modal sessions.

use super::effects::Effect;
use super::manager::TopWinManager;
use super::node::{Layer, NodeFlags, NodeId};
use crate::error::{ServerError, ServerResult};
use crate::messaging::WindowId;
use crate::region::Region;

impl TopWinManager {
    // ========================================================================
    // Show / hide
    // ========================================================================

    /// Show a window and its whole subtree, then activate it.
    ///
    /// # Errors
    ///
    /// [`ServerError::WindowNotFound`] for an unknown window and
    /// [`ServerError::AncestorHidden`] if any ancestor is hidden.
    pub fn show(&mut self, window: WindowId) -> ServerResult<()> {
        let id = self.find(window)?;
        if self.forest.ancestors(id).any(|ancestor| !self.is_shown(ancestor)) {
            return Err(ServerError::AncestorHidden);
        }

        for node in self.forest.subtree(id) {
            self.forest[node].flags.insert(NodeFlags::SHOWN);
        }
        self.raise(id);

        match self.activate_node(id) {
            Ok(Some(_)) => {}
            Ok(None) | Err(_) => {
                // Not focusable or blocked: it still appears in front.
                self.recompute_clips();
                self.paint_subtree(id);
            }
        }

        tracing::debug!(window, "topwin: shown");
        Ok(())
    }

    /// Hide a window and its subtree. Hiding a hidden window does nothing.
    ///
    /// # Errors
    ///
    /// [`ServerError::WindowNotFound`] for an unknown window.
    pub fn hide(&mut self, window: WindowId) -> ServerResult<()> {
        let id = self.find(window)?;
        if self.is_shown(id) {
            self.hide_node(id);
            tracing::debug!(window, "topwin: hidden");
        }
        Ok(())
    }

    pub(super) fn hide_node(&mut self, id: NodeId) {
        let subtree = self.forest.subtree(id);

        let mut vacated = Region::new();
        for &node in &subtree {
            if let Err(err) = vacated.union_assign(&self.forest[node].clip) {
                tracing::warn!(error = %err, "topwin: vacated area unknown, repainting screen");
                vacated.reset(self.screen);
                break;
            }
        }

        for &node in subtree.iter().rev() {
            if self.forest[node].flags.contains(NodeFlags::MODAL_OWNER) {
                self.leave_modal(node);
            }
        }

        let had_focus = self.focus.filter(|focus| subtree.contains(focus));
        if had_focus.is_some() {
            self.drop_focus();
        }

        for &node in &subtree {
            self.forest[node].flags.remove(NodeFlags::SHOWN | NodeFlags::ACTIVATED);
        }
        self.sink(id);

        self.recompute_clips();
        self.invalidate(&vacated);

        if had_focus.is_some()
            && let Some(next) = self.pick_focus_after_hide(id)
        {
            if let Err(err) = self.activate_node(next) {
                tracing::warn!(window = self.forest[next].window, error = %err, "topwin: refocus failed");
            }
        }
    }

    /// Deactivate the focused window, leaving nothing focused.
    fn drop_focus(&mut self) {
        if let Some(focus) = self.focus.take() {
            self.forest[focus].flags.remove(NodeFlags::ACTIVATED);
            let node = &self.forest[focus];
            self.emit(Effect::Deactivate { app: node.app.clone(), window: node.window });
        }
    }

    /// Choose who takes focus after `hidden` lost it: a shown ancestor,
    /// then a root of the same layer, then any other layer.
    fn pick_focus_after_hide(&self, hidden: NodeId) -> Option<NodeId> {
        let focusable = |id: NodeId| {
            let node = &self.forest[id];
            node.is_shown() && !node.flags.contains(NodeFlags::NO_FOCUS) && !self.blocked(id)
        };

        if let Some(ancestor) = self.forest.ancestors(hidden).find(|&a| focusable(a)) {
            return Some(ancestor);
        }

        let layer = self.forest[self.forest.root_of(hidden)].layer;
        let shown = &self.roots[..self.shown_root_count()];
        let same_layer = shown.iter().filter(|&&root| self.forest[root].layer == layer);
        let other_layers = shown.iter().filter(|&&root| self.forest[root].layer != layer);

        same_layer
            .chain(other_layers)
            .filter_map(|&root| self.focus_target(root))
            .find(|&target| focusable(target))
    }

    /// The node of a tree that should receive focus: the root, or the
    /// modal owner inside it when the root is blocked.
    fn focus_target(&self, root: NodeId) -> Option<NodeId> {
        if !self.forest[root].flags.contains(NodeFlags::MODALED) {
            return Some(root);
        }
        self.forest.subtree(root).into_iter().find(|&id| {
            let flags = self.forest[id].flags;
            flags.contains(NodeFlags::SHOWN | NodeFlags::MODAL_OWNER) && !self.blocked(id)
        })
    }

    // ========================================================================
    // Activation
    // ========================================================================

    /// Give focus to a shown window, bringing it and its tree to the front.
    ///
    /// Returns `false` when nothing changed because the window is already
    /// active or can never take focus.
    ///
    /// # Errors
    ///
    /// [`ServerError::WindowNotFound`], [`ServerError::NotShown`] for a
    /// hidden window, and [`ServerError::BlockedByModal`] for a window
    /// locked out by a modal session.
    pub fn activate(&mut self, window: WindowId) -> ServerResult<bool> {
        let id = self.find(window)?;
        let activated = self.activate_node(id)?.is_some();
        if activated {
            tracing::debug!(window, "topwin: activated");
        }
        Ok(activated)
    }

    /// Returns `Some(tree_moved)` when focus changed.
    pub(super) fn activate_node(&mut self, id: NodeId) -> ServerResult<Option<bool>> {
        let flags = self.forest[id].flags;
        if !flags.contains(NodeFlags::SHOWN) {
            return Err(ServerError::NotShown);
        }
        if flags.intersects(NodeFlags::NO_FOCUS | NodeFlags::ACTIVATED) {
            return Ok(None);
        }
        if self.blocked(id) {
            return Err(ServerError::BlockedByModal);
        }

        let root = self.forest.root_of(id);
        let tree_moved = self.raise_root(root);
        // The node and every ancestor below the root move to the front of
        // their siblings so the node ends up visible.
        let path: Vec<NodeId> = std::iter::once(id).chain(self.forest.ancestors(id)).collect();
        for &node in &path {
            if node != root {
                self.raise_child(node);
            }
        }

        self.recompute_clips();

        if let Some(previous) = self.focus.take() {
            self.forest[previous].flags.remove(NodeFlags::ACTIVATED);
            let node = &self.forest[previous];
            self.emit(Effect::Deactivate { app: node.app.clone(), window: node.window });
        }
        self.forest[id].flags.insert(NodeFlags::ACTIVATED);
        self.focus = Some(id);
        let node = &self.forest[id];
        self.emit(Effect::Activate { app: node.app.clone(), window: node.window });

        if tree_moved {
            self.paint_subtree(root);
        } else {
            self.paint_node(id);
        }
        Ok(Some(tree_moved))
    }

    // ========================================================================
    // Modal sessions
    // ========================================================================

    /// Start a modal session owned by `window`.
    ///
    /// Every sibling along the path to the root, and every ancestor, is
    /// blocked until the owner is hidden or destroyed.
    ///
    /// # Errors
    ///
    /// [`ServerError::WindowNotFound`] and [`ServerError::NotShown`].
    pub fn enter_modal(&mut self, window: WindowId) -> ServerResult<()> {
        let id = self.find(window)?;
        if !self.is_shown(id) {
            return Err(ServerError::NotShown);
        }
        if self.forest[id].flags.contains(NodeFlags::MODAL_OWNER) {
            return Ok(());
        }

        let mut blocked = Vec::new();
        let mut current = id;
        while let Some(parent) = self.forest[current].parent {
            let siblings: Vec<NodeId> =
                self.forest[parent].children.iter().copied().filter(|&c| c != current).collect();
            for node in siblings.into_iter().chain(std::iter::once(parent)) {
                self.block(node);
                blocked.push((node, self.forest[node].window));
            }
            current = parent;
        }

        let node = &mut self.forest[id];
        node.flags.insert(NodeFlags::MODAL_OWNER);
        node.modal_blocked = blocked;
        tracing::debug!(window, blocked = node.modal_blocked.len(), "topwin: modal session started");

        if self.focus.is_some_and(|focus| self.blocked(focus)) {
            // A no-focus owner cannot take over, so nothing stays focused.
            match self.activate_node(id) {
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::debug!(window, "topwin: modal owner takes no focus, clearing focus");
                    self.drop_focus();
                }
                Err(err) => {
                    tracing::warn!(window, error = %err, "topwin: modal owner could not take focus");
                    self.drop_focus();
                }
            }
        }
        Ok(())
    }

    /// End the modal session owned by `owner`.
    pub(super) fn leave_modal(&mut self, owner: NodeId) {
        let node = &mut self.forest[owner];
        node.flags.remove(NodeFlags::MODAL_OWNER);
        let blocked = std::mem::take(&mut node.modal_blocked);
        let window = node.window;

        for (id, window) in blocked {
            // Blocked nodes may have been destroyed and their slot reused.
            if self.forest.holds(id, window) {
                self.unblock(id);
            }
        }
        tracing::debug!(window, "topwin: modal session ended");
    }

    fn block(&mut self, id: NodeId) {
        let node = &mut self.forest[id];
        node.modal_holds += 1;
        if node.modal_holds == 1 {
            node.flags.insert(NodeFlags::MODALED);
            let effect = Effect::ModalState { app: node.app.clone(), window: node.window, blocked: true };
            self.emit(effect);
        }
    }

    fn unblock(&mut self, id: NodeId) {
        let node = &mut self.forest[id];
        node.modal_holds = node.modal_holds.saturating_sub(1);
        if node.modal_holds == 0 && node.flags.contains(NodeFlags::MODALED) {
            node.flags.remove(NodeFlags::MODALED);
            let effect = Effect::ModalState { app: node.app.clone(), window: node.window, blocked: false };
            self.emit(effect);
        }
    }

    /// Whether a modal session keeps input away from this node.
    ///
    /// Walking towards the root, a blocked node decides "blocked" and a
    /// modal owner decides "free".
    pub(super) fn blocked(&self, id: NodeId) -> bool {
        for node in std::iter::once(id).chain(self.forest.ancestors(id)) {
            let flags = self.forest[node].flags;
            if flags.contains(NodeFlags::MODALED) {
                return true;
            }
            if flags.contains(NodeFlags::MODAL_OWNER) {
                return false;
            }
        }
        false
    }

    /// Whether input to `window` is locked out by a modal session.
    #[must_use]
    pub fn is_input_blocked(&self, window: WindowId) -> bool {
        self.forest.lookup(window).is_some_and(|id| self.blocked(id))
    }

    /// Layer of the window's tree.
    #[must_use]
    pub fn layer_of(&self, window: WindowId) -> Option<Layer> { self.node(window).map(|node| node.layer) }
}

#[cfg(test)]
mod tests {
    use super::super::manager::tests::{SCREEN, app, spec};
    use super::*;
    use crate::topwin::WindowStyle;

    fn full_screen() -> crate::topwin::WindowSpec { spec(0, 0, SCREEN.x2, SCREEN.y2) }

    #[test]
    fn test_second_window_takes_focus_and_hide_returns_it() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, full_screen()).unwrap();
        wm.show(1).unwrap();
        wm.add(&a, 2, None, spec(100, 100, 200, 200)).unwrap();
        wm.show(2).unwrap();

        assert_eq!(wm.focus(), Some(2));
        assert_eq!(wm.z_order(), vec![2, 1]);
        assert!(wm.flags(2).unwrap().contains(NodeFlags::ACTIVATED));
        assert!(!wm.flags(1).unwrap().contains(NodeFlags::ACTIVATED));
        assert!(!wm.clip(1).unwrap().contains_point(150, 150));

        wm.hide(2).unwrap();
        assert_eq!(wm.focus(), Some(1));
        assert_eq!(wm.clip(1).unwrap().rects(), &[SCREEN]);
        assert!(wm.clip(2).unwrap().is_empty());
        assert_eq!(wm.z_order(), vec![1]);
    }

    #[test]
    fn test_child_show_requires_shown_parent() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 300, 300)).unwrap();
        wm.add(&a, 2, Some(1), spec(50, 50, 100, 100)).unwrap();

        assert_eq!(wm.show(2), Err(ServerError::AncestorHidden));
        assert!(!wm.flags(2).unwrap().contains(NodeFlags::SHOWN));

        wm.show(1).unwrap();
        wm.hide(2).unwrap();
        wm.show(2).unwrap();
        assert_eq!(wm.z_order(), vec![2, 1]);
        assert_eq!(wm.focus(), Some(2));
        assert_eq!(wm.hit_test(60, 60, crate::topwin::HitMode::Admin), Some(2));
        assert!(!wm.clip(1).unwrap().contains_point(60, 60));
    }

    #[test]
    fn test_show_marks_subtree() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 300, 300)).unwrap();
        wm.add(&a, 2, Some(1), spec(50, 50, 100, 100)).unwrap();
        wm.show(1).unwrap();
        assert!(wm.flags(2).unwrap().contains(NodeFlags::SHOWN));
        assert_eq!(wm.z_order(), vec![2, 1]);
    }

    #[test]
    fn test_activate_hidden_is_rejected() {
        let mut wm = TopWinManager::new(SCREEN);
        wm.add(&app("a"), 1, None, spec(0, 0, 10, 10)).unwrap();
        assert_eq!(wm.activate(1), Err(ServerError::NotShown));
        assert_eq!(wm.activate(7), Err(ServerError::WindowNotFound));
    }

    #[test]
    fn test_activate_active_window_is_a_noop() {
        let mut wm = TopWinManager::new(SCREEN);
        wm.add(&app("a"), 1, None, spec(0, 0, 10, 10)).unwrap();
        wm.show(1).unwrap();
        wm.drain_effects();
        let before = wm.snapshot().iter().map(|i| (i.window, i.flags.clone())).collect::<Vec<_>>();

        assert_eq!(wm.activate(1), Ok(false));
        assert!(wm.drain_effects().is_empty());
        let after = wm.snapshot().iter().map(|i| (i.window, i.flags.clone())).collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn test_activation_effects_order() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        let b = app("b");
        wm.add(&a, 1, None, spec(0, 0, 100, 100)).unwrap();
        wm.add(&b, 2, None, spec(50, 50, 150, 150)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm.drain_effects();

        assert_eq!(wm.activate(1), Ok(true));
        let effects = wm.drain_effects();
        let deactivate = effects.iter().position(|e| matches!(e, Effect::Deactivate { window: 2, .. }));
        let activate = effects.iter().position(|e| matches!(e, Effect::Activate { window: 1, .. }));
        let paint = effects.iter().position(|e| matches!(e, Effect::Paint { window: 1, .. }));
        assert!(deactivate < activate && activate < paint);
        assert!(effects.iter().any(|e| matches!(e, Effect::Clip { window: 2, .. })));
    }

    #[test]
    fn test_layers_keep_their_order() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 10, 10).with_style(WindowStyle::ON_TOP)).unwrap();
        wm.add(&a, 2, None, spec(0, 0, 10, 10)).unwrap();
        wm.add(&a, 3, None, spec(0, 0, 10, 10).with_style(WindowStyle::ON_BOTTOM)).unwrap();
        wm.show(3).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();

        assert_eq!(wm.z_order(), vec![1, 2, 3]);
        wm.activate(3).unwrap();
        assert_eq!(wm.z_order(), vec![1, 2, 3]);
        assert_eq!(wm.focus(), Some(3));
    }

    #[test]
    fn test_no_focus_window_shows_without_activation() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 100, 100)).unwrap();
        wm.show(1).unwrap();
        wm.add(&a, 2, None, spec(0, 0, 50, 50).with_style(WindowStyle::NO_FOCUS)).unwrap();
        wm.show(2).unwrap();

        assert_eq!(wm.focus(), Some(1));
        assert_eq!(wm.z_order(), vec![2, 1]);
        assert_eq!(wm.activate(2), Ok(false));
    }

    #[test]
    fn test_modal_flags_and_release_on_hide() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 400, 400)).unwrap();
        wm.add(&a, 2, Some(1), spec(10, 10, 100, 100)).unwrap();
        wm.add(&a, 3, Some(1), spec(200, 200, 300, 300)).unwrap();
        wm.show(1).unwrap();
        let initial: Vec<NodeFlags> = [1, 2, 3].iter().map(|&w| wm.flags(w).unwrap()).collect();
        let before_modal = wm.flags(3).unwrap();

        wm.enter_modal(3).unwrap();
        assert!(wm.flags(2).unwrap().contains(NodeFlags::MODALED));
        assert!(wm.flags(1).unwrap().contains(NodeFlags::MODALED));
        assert!(wm.flags(3).unwrap().contains(NodeFlags::MODAL_OWNER));
        assert!(wm.is_input_blocked(1));
        assert!(wm.is_input_blocked(2));
        assert!(!wm.is_input_blocked(3));
        assert_eq!(wm.activate(2), Err(ServerError::BlockedByModal));

        wm.hide(3).unwrap();
        for (&w, flags) in [1, 2].iter().zip(&initial) {
            let now = wm.flags(w).unwrap();
            assert!(!now.intersects(NodeFlags::MODALED | NodeFlags::MODAL_OWNER));
            assert_eq!(now.contains(NodeFlags::SHOWN), flags.contains(NodeFlags::SHOWN));
        }
        assert!(!wm.flags(3).unwrap().contains(NodeFlags::MODAL_OWNER));
        assert!(before_modal.contains(NodeFlags::SHOWN));
        assert!(!wm.is_input_blocked(2));
    }

    #[test]
    fn test_nested_modal_sessions() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 400, 400)).unwrap();
        wm.add(&a, 2, Some(1), spec(0, 0, 100, 100)).unwrap();
        wm.add(&a, 3, Some(2), spec(0, 0, 50, 50)).unwrap();
        wm.show(1).unwrap();

        wm.enter_modal(2).unwrap();
        wm.enter_modal(3).unwrap();
        assert!(wm.flags(2).unwrap().contains(NodeFlags::MODALED | NodeFlags::MODAL_OWNER));
        assert!(wm.is_input_blocked(2));
        assert_eq!(wm.focus(), Some(3));

        wm.hide(3).unwrap();
        assert!(!wm.is_input_blocked(2));
        assert!(wm.is_input_blocked(1));
        assert_eq!(wm.focus(), Some(2));

        wm.hide(2).unwrap();
        assert!(!wm.is_input_blocked(1));
        assert_eq!(wm.focus(), Some(1));
    }

    #[test]
    fn test_modal_state_effects() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 400, 400)).unwrap();
        wm.add(&a, 2, Some(1), spec(0, 0, 100, 100)).unwrap();
        wm.show(1).unwrap();
        wm.drain_effects();

        wm.enter_modal(2).unwrap();
        let effects = wm.drain_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::ModalState { window: 1, blocked: true, .. })));

        wm.remove(2).unwrap();
        let effects = wm.drain_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::ModalState { window: 1, blocked: false, .. })));
        assert_eq!(wm.focus(), Some(1));
    }

    #[test]
    fn test_no_focus_modal_owner_clears_focus() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 400, 400)).unwrap();
        wm.add(&a, 2, Some(1), spec(0, 0, 100, 100).with_style(WindowStyle::NO_FOCUS)).unwrap();
        wm.show(1).unwrap();
        assert_eq!(wm.focus(), Some(1));
        wm.drain_effects();

        wm.enter_modal(2).unwrap();
        assert_eq!(wm.focus(), None);
        assert!(!wm.flags(1).unwrap().contains(NodeFlags::ACTIVATED));
        assert!(!wm.flags(2).unwrap().contains(NodeFlags::ACTIVATED));
        let effects = wm.drain_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::Deactivate { window: 1, .. })));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Activate { .. })));

        wm.hide(2).unwrap();
        assert_eq!(wm.focus(), None);
        assert_eq!(wm.activate(1), Ok(true));
        assert_eq!(wm.focus(), Some(1));
    }

    #[test]
    fn test_hide_picks_same_layer_first() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 10, 10).with_style(WindowStyle::ON_TOP)).unwrap();
        wm.add(&a, 2, None, spec(0, 0, 10, 10)).unwrap();
        wm.add(&a, 3, None, spec(0, 0, 10, 10)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm.show(3).unwrap();

        wm.hide(3).unwrap();
        assert_eq!(wm.focus(), Some(2));
        wm.hide(2).unwrap();
        assert_eq!(wm.focus(), Some(1));
        assert_eq!(wm.layer_of(1), Some(Layer::Top));
    }
}
