//! Clip recomputation, repaint requests and geometry changes.

use super::effects::Effect;
use super::manager::TopWinManager;
use super::node::NodeId;
use crate::error::ServerResult;
use crate::messaging::WindowId;
use crate::region::{Rect, Region};

impl TopWinManager {
    /// Recompute every window's visible region.
    ///
    /// Starting from the whole screen, shown windows are visited front to
    /// back; each one keeps what is still available inside its extent and
    /// then removes its extent from what is available. Windows whose clip
    /// changed are notified. A failed region operation leaves a bad (empty)
    /// clip behind.
    pub(super) fn recompute_clips(&mut self) {
        let mut available = Region::from_rect(self.screen);

        for id in self.front_to_back() {
            let extent = self.forest[id].extent;
            let mut clip = available.clone();
            if let Err(err) = clip.intersect_rect(extent) {
                tracing::warn!(window = self.forest[id].window, error = %err, "topwin: clip failed");
            }
            if let Err(err) = available.subtract_rect(extent) {
                tracing::warn!(error = %err, "topwin: available area lost");
            }
            self.set_clip(id, clip);
        }

        let hidden: Vec<NodeId> = self
            .forest
            .iter()
            .filter(|(_, node)| !node.is_shown() && (!node.clip.is_empty() || node.clip.is_bad()))
            .map(|(id, _)| id)
            .collect();
        for id in hidden {
            self.set_clip(id, Region::new());
        }
    }

    fn set_clip(&mut self, id: NodeId, clip: Region) {
        let node = &mut self.forest[id];
        if node.clip == clip {
            return;
        }
        node.clip = clip;
        let effect = Effect::Clip { app: node.app.clone(), window: node.window, clip: node.clip.clone() };
        self.emit(effect);
    }

    /// Add `area` to the screen damage and ask every shown window that
    /// shows part of it to repaint that part.
    pub(super) fn invalidate(&mut self, area: &Region) {
        if area.is_empty() {
            return;
        }
        self.add_damage(area);

        for id in self.front_to_back() {
            let node = &self.forest[id];
            if !node.clip.extents().intersects(&area.extents()) {
                continue;
            }
            match node.clip.intersect(area) {
                Ok(exposed) if !exposed.is_empty() => {
                    let effect =
                        Effect::Paint { app: node.app.clone(), window: node.window, rect: exposed.extents() };
                    self.emit(effect);
                }
                Ok(_) => {}
                Err(err) => tracing::warn!(window = node.window, error = %err, "topwin: repaint area lost"),
            }
        }
    }

    /// Repaint everything visible of one window.
    pub(super) fn paint_node(&mut self, id: NodeId) {
        let node = &self.forest[id];
        if !node.is_shown() || node.clip.is_empty() {
            return;
        }
        let clip = node.clip.clone();
        let effect = Effect::Paint { app: node.app.clone(), window: node.window, rect: clip.extents() };
        self.emit(effect);
        self.add_damage(&clip);
    }

    pub(super) fn paint_subtree(&mut self, id: NodeId) {
        for node in self.forest.subtree(id) {
            self.paint_node(node);
        }
    }

    fn add_damage(&mut self, area: &Region) {
        if let Err(err) = self.damage.union_assign(area) {
            tracing::warn!(error = %err, "topwin: damage tracking reset to full screen");
            self.damage.reset(self.screen);
        }
    }

    // ========================================================================
    // Geometry
    // ========================================================================

    /// Move a window's client area so its top-left corner is at `(x, y)`.
    ///
    /// Monitor rectangles move with the window. Nothing carries pixels over
    /// from the old position, so every shown window, the moved one
    /// included, repaints what it shows of the old and new extents.
    ///
    /// # Errors
    ///
    /// [`crate::error::ServerError::WindowNotFound`] for an unknown window.
    pub fn move_to(&mut self, window: WindowId, x: i16, y: i16) -> ServerResult<()> {
        let id = self.find(window)?;
        let node = &mut self.forest[id];
        let old_rect = node.spec.rect;
        let old_extent = node.extent;
        let dx = i32::from(x) - i32::from(old_rect.x1);
        let dy = i32::from(y) - i32::from(old_rect.y1);

        node.set_rect(old_rect.moved_to(x, y));
        for monitor in &mut node.monitors {
            *monitor = monitor.translated(dx, dy).0;
        }
        let new_extent = node.extent;
        tracing::debug!(window, %old_extent, %new_extent, "topwin: moved");

        if !node.is_shown() || (dx == 0 && dy == 0) {
            return Ok(());
        }

        self.recompute_clips();
        if !self.invalidate_around(old_extent, new_extent) {
            self.paint_node(id);
        }
        Ok(())
    }

    /// Replace a window's client rectangle.
    ///
    /// # Errors
    ///
    /// [`crate::error::ServerError::WindowNotFound`] for an unknown window.
    pub fn resize(&mut self, window: WindowId, rect: Rect) -> ServerResult<()> {
        let id = self.find(window)?;
        let node = &mut self.forest[id];
        let old_extent = node.extent;
        node.set_rect(rect);
        let new_extent = node.extent;
        tracing::debug!(window, %old_extent, %new_extent, "topwin: resized");

        if !node.is_shown() {
            return Ok(());
        }

        self.recompute_clips();
        if !self.invalidate_around(old_extent, new_extent) {
            self.paint_node(id);
        }
        Ok(())
    }

    /// Repaint `old ∪ new` in every shown window.
    ///
    /// The changed window's clip lies inside `new`, so this repaints all of
    /// it. Returns false when the area could not be built and the whole
    /// screen was invalidated instead.
    fn invalidate_around(&mut self, old: Rect, new: Rect) -> bool {
        let mut area = Region::from_rect(old);
        let built = match area.union_rect(new) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "topwin: repainting screen after geometry change");
                area.reset(self.screen);
                false
            }
        };
        self.invalidate(&area);
        built
    }

    // ========================================================================
    // Monitor rectangles
    // ========================================================================

    /// Cede `rect` (screen coordinates) of the window to pointer input for
    /// whatever lies underneath.
    ///
    /// # Errors
    ///
    /// [`crate::error::ServerError::WindowNotFound`] for an unknown window.
    pub fn add_monitor(&mut self, window: WindowId, rect: Rect) -> ServerResult<()> {
        let id = self.find(window)?;
        if rect.is_empty() {
            return Ok(());
        }
        self.forest[id].monitors.push(rect);
        Ok(())
    }

    /// Remove a monitor rectangle added earlier. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// [`crate::error::ServerError::WindowNotFound`] for an unknown window.
    pub fn remove_monitor(&mut self, window: WindowId, rect: Rect) -> ServerResult<bool> {
        let id = self.find(window)?;
        let monitors = &mut self.forest[id].monitors;
        Ok(monitors.iter().position(|m| *m == rect).map(|at| monitors.remove(at)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::super::manager::tests::{SCREEN, app, spec};
    use super::*;
    use crate::error::ServerError;

    fn paints(effects: &[Effect], window: WindowId) -> Vec<Rect> {
        effects
            .iter()
            .filter_map(|e| match e {
                Effect::Paint { window: w, rect, .. } if *w == window => Some(*rect),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_clips_are_disjoint_and_inside_extents() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 300, 300)).unwrap();
        wm.add(&a, 2, None, spec(100, 100, 400, 400)).unwrap();
        wm.add(&a, 3, Some(2), spec(150, 150, 200, 200)).unwrap();
        wm.add(&a, 4, None, spec(250, 0, 640, 120).with_title(10)).unwrap();
        for w in [1, 2, 4] {
            wm.show(w).unwrap();
        }

        let clips: Vec<Region> = [1, 2, 3, 4].iter().map(|&w| wm.clip(w).unwrap().clone()).collect();
        for (i, a) in clips.iter().enumerate() {
            assert!(a.is_well_formed());
            for b in &clips[i + 1..] {
                assert!(a.intersect(b).unwrap().is_empty());
            }
        }
        for (w, clip) in [1, 2, 3, 4].iter().zip(&clips) {
            let extent = wm.node(*w).unwrap().extent();
            assert!(clip.subtract(&Region::from_rect(extent)).unwrap().is_empty());
        }
        assert!(clips[2].contains_point(150, 150));
        assert!(!clips[1].contains_point(150, 150));
    }

    #[test]
    fn test_clip_effect_only_on_change() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 100, 100)).unwrap();
        wm.add(&a, 2, None, spec(500, 400, 600, 450)).unwrap();
        wm.show(1).unwrap();
        wm.drain_effects();

        wm.show(2).unwrap();
        let effects = wm.drain_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::Clip { window: 2, .. })));
        assert!(!effects.iter().any(|e| matches!(e, Effect::Clip { window: 1, .. })));
    }

    #[test]
    fn test_hide_repaints_vacated_area() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 640, 480)).unwrap();
        wm.add(&a, 2, None, spec(100, 100, 200, 200)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm.drain_effects();
        wm.take_damage();

        wm.hide(2).unwrap();
        let effects = wm.drain_effects();
        assert!(paints(&effects, 1).contains(&Rect::new(100, 100, 200, 200)));
        assert!(wm.take_damage().contains_point(150, 150));
    }

    #[test]
    fn test_move_overlapping_repaints_moved_window() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 640, 480)).unwrap();
        wm.add(&a, 2, None, spec(100, 100, 200, 200)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm.drain_effects();

        wm.move_to(2, 150, 100).unwrap();
        assert_eq!(wm.node(2).unwrap().extent(), Rect::new(150, 100, 250, 200));
        let effects = wm.drain_effects();
        // The background repaints the old and new extents minus the window.
        assert_eq!(paints(&effects, 1), vec![Rect::new(100, 100, 150, 200)]);
        // The window repaints its whole new extent, which is also damaged.
        assert_eq!(paints(&effects, 2), vec![Rect::new(150, 100, 250, 200)]);
        let damage = wm.take_damage();
        assert!(damage.contains_point(200, 150));
        assert!(damage.contains_point(120, 150));
        assert!(wm.clip(1).unwrap().contains_point(120, 150));
    }

    #[test]
    fn test_move_disjoint_repaints_whole_window() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 640, 480)).unwrap();
        wm.add(&a, 2, None, spec(0, 0, 100, 100)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm.add_monitor(2, Rect::new(10, 10, 20, 20)).unwrap();
        wm.drain_effects();

        wm.move_to(2, 300, 300).unwrap();
        let effects = wm.drain_effects();
        assert_eq!(paints(&effects, 2), vec![Rect::new(300, 300, 400, 400)]);
        assert!(paints(&effects, 1).contains(&Rect::new(0, 0, 100, 100)));
        assert_eq!(wm.node(2).unwrap().monitors(), &[Rect::new(310, 310, 320, 320)]);
    }

    #[test]
    fn test_move_partly_offscreen_window() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(600, 400, 700, 500)).unwrap();
        wm.show(1).unwrap();
        assert_eq!(wm.clip(1).unwrap().rects(), &[Rect::new(600, 400, 640, 480)]);
        wm.drain_effects();

        wm.move_to(1, 560, 400).unwrap();
        let effects = wm.drain_effects();
        assert_eq!(paints(&effects, 1), vec![Rect::new(560, 400, 640, 480)]);
    }

    #[test]
    fn test_resize_repaints_and_reclips() {
        let mut wm = TopWinManager::new(SCREEN);
        let a = app("a");
        wm.add(&a, 1, None, spec(0, 0, 640, 480)).unwrap();
        wm.add(&a, 2, None, spec(0, 0, 100, 100)).unwrap();
        wm.show(1).unwrap();
        wm.show(2).unwrap();
        wm.drain_effects();

        wm.resize(2, Rect::new(0, 0, 50, 50)).unwrap();
        let effects = wm.drain_effects();
        assert_eq!(paints(&effects, 2), vec![Rect::new(0, 0, 50, 50)]);
        assert!(!paints(&effects, 1).is_empty());
        assert!(wm.clip(1).unwrap().contains_point(75, 75));
        assert_eq!(wm.resize(9, Rect::zero()), Err(ServerError::WindowNotFound));
    }

    #[test]
    fn test_hidden_geometry_changes_are_silent() {
        let mut wm = TopWinManager::new(SCREEN);
        wm.add(&app("a"), 1, None, spec(0, 0, 10, 10)).unwrap();
        wm.move_to(1, 20, 20).unwrap();
        wm.resize(1, Rect::new(20, 20, 40, 40)).unwrap();
        assert!(wm.drain_effects().is_empty());
        assert!(wm.take_damage().is_empty());
        assert_eq!(wm.node(1).unwrap().extent(), Rect::new(20, 20, 40, 40));
    }

    #[test]
    fn test_monitor_rects() {
        let mut wm = TopWinManager::new(SCREEN);
        wm.add(&app("a"), 1, None, spec(0, 0, 100, 100)).unwrap();
        let rect = Rect::new(10, 10, 20, 20);
        wm.add_monitor(1, rect).unwrap();
        assert!(wm.node(1).unwrap().in_monitor(15, 15));
        assert_eq!(wm.remove_monitor(1, rect), Ok(true));
        assert_eq!(wm.remove_monitor(1, rect), Ok(false));
        assert_eq!(wm.add_monitor(5, rect), Err(ServerError::WindowNotFound));
    }
}
