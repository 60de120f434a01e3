//! Graphics device boundary.

use std::fmt::Debug;

use parking_lot::Mutex;

use super::screen_lock::ScreenLock;
use crate::region::Rect;

/// What the server needs from the display: its size, and a way to flush a
/// rectangle of the frame buffer to the screen.
pub trait GraphicsDevice: Send + Sync + Debug {
    fn screen_rect(&self) -> Rect;

    fn update(&self, rect: Rect);
}

/// A device without a display that records every flushed rectangle.
#[derive(Debug)]
pub struct HeadlessDevice {
    screen: Rect,
    lock: ScreenLock,
    updates: Mutex<Vec<Rect>>,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            screen: Rect::from_origin_size(0, 0, width, height),
            lock: ScreenLock::new(),
            updates: Mutex::new(Vec::new()),
        }
    }

    /// The lock guarding the (virtual) frame buffer.
    #[must_use]
    pub const fn screen_lock(&self) -> &ScreenLock { &self.lock }

    /// Rectangles flushed so far.
    #[must_use]
    pub fn updates(&self) -> Vec<Rect> {
        let _screen = self.lock.lock();
        self.updates.lock().clone()
    }

    /// Take the rectangles flushed so far.
    pub fn take_updates(&self) -> Vec<Rect> {
        let _screen = self.lock.lock();
        std::mem::take(&mut *self.updates.lock())
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn screen_rect(&self) -> Rect { self.screen }

    fn update(&self, rect: Rect) {
        let Some(rect) = rect.intersection(&self.screen) else {
            return;
        };
        let _screen = self.lock.lock();
        tracing::trace!(%rect, "device: update");
        self.updates.lock().push(rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_are_clipped_to_screen() {
        let device = HeadlessDevice::new(100, 50);
        assert_eq!(device.screen_rect(), Rect::new(0, 0, 100, 50));

        device.update(Rect::new(90, 40, 120, 60));
        device.update(Rect::new(200, 200, 210, 210));
        assert_eq!(device.updates(), vec![Rect::new(90, 40, 100, 50)]);
        assert_eq!(device.take_updates().len(), 1);
        assert!(device.updates().is_empty());
    }

    #[test]
    fn test_update_nests_inside_held_lock() {
        let device = HeadlessDevice::new(10, 10);
        let _held = device.screen_lock().lock();
        device.update(Rect::new(0, 0, 5, 5));
        assert_eq!(device.screen_lock().depth(), 1);
    }
}
