//! Screen rectangles in 16-bit signed coordinates.
//!
//! Rectangles are half-open: a rectangle covers the pixels with
//! `x1 <= x < x2` and `y1 <= y < y2`. Any rectangle where `x1 >= x2` or
//! `y1 >= y2` is empty.

use serde::{Deserialize, Serialize};

/// A rectangle with exclusive right and bottom edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i16,
    pub y1: i16,
    pub x2: i16,
    pub y2: i16,
}

/// Clamps a wide coordinate into the 16-bit range.
#[must_use]
pub fn clamp_coord(value: i32) -> i16 {
    // Lossless after the clamp.
    #[allow(clippy::cast_possible_truncation)]
    let clamped = value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16;
    clamped
}

impl Rect {
    /// Create a rectangle from its edges.
    #[must_use]
    pub const fn new(x1: i16, y1: i16, x2: i16, y2: i16) -> Self { Self { x1, y1, x2, y2 } }

    /// Create a rectangle from an origin and a size, saturating at the 16-bit range.
    #[must_use]
    pub fn from_origin_size(x: i16, y: i16, width: u16, height: u16) -> Self {
        Self {
            x1: x,
            y1: y,
            x2: clamp_coord(i32::from(x) + i32::from(width)),
            y2: clamp_coord(i32::from(y) + i32::from(height)),
        }
    }

    /// The empty rectangle at the origin.
    #[must_use]
    pub const fn zero() -> Self { Self::new(0, 0, 0, 0) }

    /// Width in pixels (zero for empty rectangles).
    #[must_use]
    pub fn width(&self) -> u16 { (i32::from(self.x2) - i32::from(self.x1)).max(0).unsigned_abs() as u16 }

    /// Height in pixels (zero for empty rectangles).
    #[must_use]
    pub fn height(&self) -> u16 { (i32::from(self.y2) - i32::from(self.y1)).max(0).unsigned_abs() as u16 }

    /// Covered area in pixels.
    #[must_use]
    pub fn area(&self) -> u64 { u64::from(self.width()) * u64::from(self.height()) }

    #[must_use]
    pub const fn is_empty(&self) -> bool { self.x1 >= self.x2 || self.y1 >= self.y2 }

    /// Check if this rectangle contains a point.
    #[must_use]
    pub const fn contains_point(&self, x: i16, y: i16) -> bool {
        x >= self.x1 && x < self.x2 && y >= self.y1 && y < self.y2
    }

    /// Check if `other` lies entirely inside this rectangle.
    #[must_use]
    pub const fn contains_rect(&self, other: &Self) -> bool {
        other.x1 >= self.x1 && other.x2 <= self.x2 && other.y1 >= self.y1 && other.y2 <= self.y2
    }

    /// Check if the two rectangles share at least one pixel.
    #[must_use]
    pub const fn intersects(&self, other: &Self) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x1 < other.x2
            && other.x1 < self.x2
            && self.y1 < other.y2
            && other.y1 < self.y2
    }

    /// The overlapping part of two rectangles, if any.
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        let rect = Self {
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
            x2: self.x2.min(other.x2),
            y2: self.y2.min(other.y2),
        };
        (!rect.is_empty()).then_some(rect)
    }

    /// The smallest rectangle containing both. Empty inputs are ignored.
    #[must_use]
    pub fn bounding_union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
        }
    }

    /// Shift by a delta, saturating every edge at the 16-bit range.
    ///
    /// Returns the shifted rectangle and whether any edge had to be clamped.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> (Self, bool) {
        let wide = [
            i32::from(self.x1) + dx,
            i32::from(self.y1) + dy,
            i32::from(self.x2) + dx,
            i32::from(self.y2) + dy,
        ];
        let rect = Self {
            x1: clamp_coord(wide[0]),
            y1: clamp_coord(wide[1]),
            x2: clamp_coord(wide[2]),
            y2: clamp_coord(wide[3]),
        };
        let clamped = [rect.x1, rect.y1, rect.x2, rect.y2]
            .iter()
            .zip(wide)
            .any(|(&narrow, wide)| i32::from(narrow) != wide);
        (rect, clamped)
    }

    /// Move the top-left corner to `(x, y)` keeping the size.
    #[must_use]
    pub fn moved_to(&self, x: i16, y: i16) -> Self {
        Self::from_origin_size(x, y, self.width(), self.height())
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {}, {})", self.x1, self.y1, self.x2, self.y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_rects() {
        assert!(Rect::zero().is_empty());
        assert!(Rect::new(5, 0, 5, 10).is_empty());
        assert!(Rect::new(0, 7, 10, 3).is_empty());
        assert!(!Rect::new(0, 0, 1, 1).is_empty());
    }

    #[test]
    fn test_contains_point_is_half_open() {
        let rect = Rect::new(0, 0, 10, 10);
        assert!(rect.contains_point(0, 0));
        assert!(rect.contains_point(9, 9));
        assert!(!rect.contains_point(10, 5));
        assert!(!rect.contains_point(5, 10));
        assert!(!rect.contains_point(-1, 5));
    }

    #[test]
    fn test_touching_rects_do_not_intersect() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(10, 0, 20, 10);
        assert!(!a.intersects(&b));
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn test_intersection() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 15, 15);
        assert_eq!(a.intersection(&b), Some(Rect::new(5, 5, 10, 10)));
    }

    #[test]
    fn test_bounding_union_ignores_empty() {
        let a = Rect::new(0, 0, 10, 10);
        assert_eq!(a.bounding_union(&Rect::zero()), a);
        assert_eq!(Rect::zero().bounding_union(&a), a);
        assert_eq!(a.bounding_union(&Rect::new(20, -5, 30, 5)), Rect::new(0, -5, 30, 10));
    }

    #[test]
    fn test_translated_saturates() {
        let rect = Rect::new(32_000, 0, 32_700, 10);
        let (moved, clamped) = rect.translated(100, 0);
        assert!(clamped);
        assert_eq!(moved, Rect::new(32_100, 0, i16::MAX, 10));

        let (moved, clamped) = rect.translated(-10, 5);
        assert!(!clamped);
        assert_eq!(moved, Rect::new(31_990, 5, 32_690, 15));
    }

    #[test]
    fn test_translated_saturates_below_min() {
        let rect = Rect::new(-32_700, -32_000, -32_600, -31_900);
        let (moved, clamped) = rect.translated(-100, -1_000);
        assert!(clamped);
        assert_eq!(moved, Rect::new(i16::MIN, i16::MIN, -32_700, -32_900));

        // Both edges past the limit leave an empty rectangle.
        let (moved, clamped) = rect.translated(-1_000, 0);
        assert!(clamped);
        assert_eq!((moved.x1, moved.x2), (i16::MIN, i16::MIN));
        assert!(moved.is_empty());
    }

    #[test]
    fn test_from_origin_size() {
        let rect = Rect::from_origin_size(10, 20, 30, 40);
        assert_eq!(rect, Rect::new(10, 20, 40, 60));
        assert_eq!(rect.width(), 30);
        assert_eq!(rect.height(), 40);
        assert_eq!(rect.area(), 1200);
        assert_eq!(rect.moved_to(-5, -5), Rect::new(-5, -5, 25, 35));
    }
}
