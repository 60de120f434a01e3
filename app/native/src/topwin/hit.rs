//! Point-to-window lookup.

use super::manager::TopWinManager;
use super::node::NodeId;
use crate::messaging::WindowId;

/// How [`TopWinManager::hit_test`] treats modal sessions and monitor
/// rectangles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitMode {
    /// Input routing: monitor rectangles pass the point through, and a
    /// window locked out by a modal session swallows it.
    Routing,
    /// Geometry only.
    Admin,
}

impl TopWinManager {
    /// The front-most shown window under `(x, y)`. A child always wins over
    /// its parent.
    #[must_use]
    pub fn hit_test(&self, x: i16, y: i16, mode: HitMode) -> Option<WindowId> {
        let shown = &self.roots[..self.shown_root_count()];
        let hit = shown.iter().find_map(|&root| self.hit_node(root, x, y, mode))?;
        if mode == HitMode::Routing && self.blocked(hit) {
            tracing::trace!(window = self.forest[hit].window, "topwin: hit swallowed by modal session");
            return None;
        }
        Some(self.forest[hit].window)
    }

    fn hit_node(&self, id: NodeId, x: i16, y: i16, mode: HitMode) -> Option<NodeId> {
        let node = &self.forest[id];
        if !node.is_shown() {
            return None;
        }
        if let Some(hit) = node.children.iter().find_map(|&child| self.hit_node(child, x, y, mode)) {
            return Some(hit);
        }
        if !node.extent.contains_point(x, y) {
            return None;
        }
        if mode == HitMode::Routing && node.in_monitor(x, y) {
            return None;
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::super::manager::tests::{SCREEN, app, spec};
    use super::*;
    use crate::region::Rect;

    fn stacked() -> TopWinManager {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 640, 480)).unwrap();
        wm.add(&a, 2, None, spec(100, 100, 300, 300).with_title(20)).unwrap();
        wm.add(&a, 3, Some(2), spec(120, 120, 180, 180)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm
    }

    #[test]
    fn test_front_most_and_child_first() {
        let wm = stacked();
        assert_eq!(wm.hit_test(150, 150, HitMode::Routing), Some(3));
        assert_eq!(wm.hit_test(250, 250, HitMode::Routing), Some(2));
        assert_eq!(wm.hit_test(150, 90, HitMode::Routing), Some(2));
        assert_eq!(wm.hit_test(10, 10, HitMode::Routing), Some(1));
        assert_eq!(wm.hit_test(-1, 10, HitMode::Admin), None);
    }

    #[test]
    fn test_hidden_windows_are_skipped() {
        let mut wm = stacked();
        wm.hide(3).unwrap();
        assert_eq!(wm.hit_test(150, 150, HitMode::Admin), Some(2));
        wm.hide(2).unwrap();
        assert_eq!(wm.hit_test(150, 150, HitMode::Admin), Some(1));
    }

    #[test]
    fn test_monitor_rect_passes_through() {
        let mut wm = stacked();
        wm.add_monitor(2, Rect::new(200, 200, 250, 250)).unwrap();
        assert_eq!(wm.hit_test(210, 210, HitMode::Routing), Some(1));
        assert_eq!(wm.hit_test(210, 210, HitMode::Admin), Some(2));
    }

    #[test]
    fn test_modal_lockout() {
        let mut wm = stacked();
        wm.enter_modal(3).unwrap();
        assert_eq!(wm.hit_test(250, 250, HitMode::Routing), None);
        assert_eq!(wm.hit_test(250, 250, HitMode::Admin), Some(2));
        assert_eq!(wm.hit_test(150, 150, HitMode::Routing), Some(3));
        assert_eq!(wm.hit_test(10, 10, HitMode::Routing), Some(1));
    }
}
