//! Rectangle-region algebra.
//!
//! A [`Region`] is a set of pixels stored as an extents rectangle plus a list
//! of non-overlapping rectangles sorted by `(y1, x1)`. Rectangles sharing the
//! same top and bottom edge form a band, and vertically adjacent bands with
//! identical horizontal spans are always merged (coalesced).
//!
//! Every operation that can allocate is fallible. When an in-place operation
//! fails the destination is marked *bad*; a bad region behaves as empty for
//! all queries and refuses to take part in further operations.

mod ops;
mod rect;
mod validate;

pub use ops::MAX_RECTS;
use ops::{SetOp, sweep};
pub use rect::{Rect, clamp_coord};
pub use validate::validate;

/// Errors produced by region operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// Rectangle storage could not grow.
    #[error("region storage exhausted")]
    OutOfMemory,

    /// An operand was already marked bad by an earlier failure.
    #[error("region operand is invalid")]
    InvalidOperand,
}

/// Result of testing a rectangle against a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Containment {
    /// No pixel of the rectangle is in the region.
    Out,
    /// Every pixel of the rectangle is in the region.
    In,
    /// Some but not all pixels are in the region.
    Partial,
}

/// A banded set of non-overlapping rectangles.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Region {
    extents: Rect,
    rects: Vec<Rect>,
    bad: bool,
}

impl Region {
    /// An empty region.
    #[must_use]
    pub const fn new() -> Self { Self { extents: Rect::zero(), rects: Vec::new(), bad: false } }

    /// A region covering a single rectangle (empty if the rectangle is).
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        if rect.is_empty() {
            return Self::new();
        }
        Self { extents: rect, rects: vec![rect], bad: false }
    }

    /// Assemble a region from rectangles that already satisfy the invariants.
    pub(crate) fn from_parts(extents: Rect, rects: Vec<Rect>) -> Self {
        if rects.is_empty() {
            return Self::new();
        }
        Self { extents, rects, bad: false }
    }

    fn from_swept(rects: Vec<Rect>) -> Self {
        let extents = compute_extents(&rects);
        Self::from_parts(extents, rects)
    }

    /// Mark the region as bad, dropping its storage.
    pub fn invalidate(&mut self) {
        self.extents = Rect::zero();
        self.rects = Vec::new();
        self.bad = true;
    }

    /// Whether an earlier failure left this region unusable.
    #[must_use]
    pub const fn is_bad(&self) -> bool { self.bad }

    /// Bounding rectangle of the region (zero when empty or bad).
    #[must_use]
    pub const fn extents(&self) -> Rect { self.extents }

    /// The banded rectangles (empty when bad).
    #[must_use]
    pub fn rects(&self) -> &[Rect] { &self.rects }

    #[must_use]
    pub fn num_rects(&self) -> usize { self.rects.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.rects.is_empty() }

    /// Number of pixels covered.
    #[must_use]
    pub fn area(&self) -> u64 { self.rects.iter().map(Rect::area).sum() }

    /// Iterate over the bands, top to bottom.
    pub fn bands(&self) -> impl Iterator<Item = &[Rect]> {
        self.rects.chunk_by(|a, b| a.y1 == b.y1)
    }

    /// Reset to the empty region, clearing any bad mark.
    pub fn clear(&mut self) { *self = Self::new(); }

    /// Reset to a single rectangle, clearing any bad mark.
    pub fn reset(&mut self, rect: Rect) { *self = Self::from_rect(rect); }

    /// Copy `other` into this region, reusing storage where possible.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError::OutOfMemory`] if storage cannot grow; the
    /// region is marked bad in that case.
    pub fn copy_from(&mut self, other: &Self) -> Result<(), RegionError> {
        if other.bad {
            self.invalidate();
            return Err(RegionError::InvalidOperand);
        }
        self.rects.clear();
        if self.rects.try_reserve(other.rects.len()).is_err() {
            self.invalidate();
            return Err(RegionError::OutOfMemory);
        }
        self.rects.extend_from_slice(&other.rects);
        self.extents = other.extents;
        self.bad = false;
        Ok(())
    }

    fn try_clone(&self) -> Result<Self, RegionError> {
        let mut copy = Self::new();
        copy.copy_from(self)?;
        Ok(copy)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Check if the region contains a point. Bad regions contain nothing.
    #[must_use]
    pub fn contains_point(&self, x: i16, y: i16) -> bool {
        if self.bad || !self.extents.contains_point(x, y) {
            return false;
        }
        for rect in &self.rects {
            if y >= rect.y2 {
                continue;
            }
            if y < rect.y1 {
                break;
            }
            if rect.contains_point(x, y) {
                return true;
            }
        }
        false
    }

    /// Classify how much of `rect` the region covers.
    #[must_use]
    pub fn contains_rect(&self, rect: &Rect) -> Containment {
        if self.bad || rect.is_empty() || !self.extents.intersects(rect) {
            return Containment::Out;
        }

        // Rectangles never overlap, so the covered areas add up exactly.
        let covered: u64 = self
            .rects
            .iter()
            .take_while(|r| r.y1 < rect.y2)
            .filter_map(|r| r.intersection(rect))
            .map(|r| r.area())
            .sum();

        if covered == 0 {
            Containment::Out
        } else if covered == rect.area() {
            Containment::In
        } else {
            Containment::Partial
        }
    }

    /// Check the structural invariants: ordering, banding, no overlap,
    /// complete coalescing and exact extents.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if self.rects.is_empty() {
            return self.extents == Rect::zero();
        }
        if self.rects.iter().any(Rect::is_empty) || self.extents != compute_extents(&self.rects) {
            return false;
        }

        let bands: Vec<&[Rect]> = self.bands().collect();
        for band in &bands {
            let y2 = band[0].y2;
            if band.iter().any(|r| r.y2 != y2) {
                return false;
            }
            // Spans inside a band are sorted and never touch.
            if band.windows(2).any(|w| w[0].x2 >= w[1].x1) {
                return false;
            }
        }
        for pair in bands.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            if upper[0].y2 > lower[0].y1 {
                return false;
            }
            let same_spans = upper.len() == lower.len()
                && upper.iter().zip(lower).all(|(u, l)| u.x1 == l.x1 && u.x2 == l.x2);
            if upper[0].y2 == lower[0].y1 && same_spans {
                return false;
            }
        }
        true
    }

    // ========================================================================
    // Algebra
    // ========================================================================

    /// Pixels in either region.
    ///
    /// # Errors
    ///
    /// Fails if an operand is bad or storage runs out.
    pub fn union(&self, other: &Self) -> Result<Self, RegionError> {
        if self.bad || other.bad {
            return Err(RegionError::InvalidOperand);
        }
        if self.is_empty() || (other.num_rects() == 1 && other.extents.contains_rect(&self.extents))
        {
            return other.try_clone();
        }
        if other.is_empty() || (self.num_rects() == 1 && self.extents.contains_rect(&other.extents))
        {
            return self.try_clone();
        }

        let rects = sweep(SetOp::Union, &self.rects, &other.rects)?;
        Ok(Self::from_parts(self.extents.bounding_union(&other.extents), rects))
    }

    /// Pixels in both regions.
    ///
    /// # Errors
    ///
    /// Fails if an operand is bad or storage runs out.
    pub fn intersect(&self, other: &Self) -> Result<Self, RegionError> {
        if self.bad || other.bad {
            return Err(RegionError::InvalidOperand);
        }
        if self.is_empty() || other.is_empty() || !self.extents.intersects(&other.extents) {
            return Ok(Self::new());
        }
        if self.num_rects() == 1 && other.num_rects() == 1 {
            return Ok(self.extents.intersection(&other.extents).map_or_else(Self::new, Self::from_rect));
        }
        if self.num_rects() == 1 && self.extents.contains_rect(&other.extents) {
            return other.try_clone();
        }
        if other.num_rects() == 1 && other.extents.contains_rect(&self.extents) {
            return self.try_clone();
        }

        sweep(SetOp::Intersect, &self.rects, &other.rects).map(Self::from_swept)
    }

    /// Pixels in this region but not in `other`.
    ///
    /// # Errors
    ///
    /// Fails if an operand is bad or storage runs out.
    pub fn subtract(&self, other: &Self) -> Result<Self, RegionError> {
        if self.bad || other.bad {
            return Err(RegionError::InvalidOperand);
        }
        if self.is_empty() || other.is_empty() || !self.extents.intersects(&other.extents) {
            return self.try_clone();
        }
        if other.num_rects() == 1 && other.extents.contains_rect(&self.extents) {
            return Ok(Self::new());
        }

        sweep(SetOp::Subtract, &self.rects, &other.rects).map(Self::from_swept)
    }

    /// Replace `self` with the result of `op`, marking it bad on failure.
    fn assign_with(
        &mut self,
        op: impl FnOnce(&Self) -> Result<Self, RegionError>,
    ) -> Result<(), RegionError> {
        match op(self) {
            Ok(region) => {
                *self = region;
                Ok(())
            }
            Err(err) => {
                self.invalidate();
                Err(err)
            }
        }
    }

    /// In-place [`Self::union`].
    ///
    /// # Errors
    ///
    /// Fails if an operand is bad or storage runs out; `self` is then bad.
    pub fn union_assign(&mut self, other: &Self) -> Result<(), RegionError> {
        self.assign_with(|this| this.union(other))
    }

    /// In-place [`Self::intersect`].
    ///
    /// # Errors
    ///
    /// Fails if an operand is bad or storage runs out; `self` is then bad.
    pub fn intersect_assign(&mut self, other: &Self) -> Result<(), RegionError> {
        self.assign_with(|this| this.intersect(other))
    }

    /// In-place [`Self::subtract`].
    ///
    /// # Errors
    ///
    /// Fails if an operand is bad or storage runs out; `self` is then bad.
    pub fn subtract_assign(&mut self, other: &Self) -> Result<(), RegionError> {
        self.assign_with(|this| this.subtract(other))
    }

    /// Add a single rectangle.
    ///
    /// # Errors
    ///
    /// Same as [`Self::union_assign`].
    pub fn union_rect(&mut self, rect: Rect) -> Result<(), RegionError> {
        self.union_assign(&Self::from_rect(rect))
    }

    /// Clip to a single rectangle.
    ///
    /// # Errors
    ///
    /// Same as [`Self::intersect_assign`].
    pub fn intersect_rect(&mut self, rect: Rect) -> Result<(), RegionError> {
        self.intersect_assign(&Self::from_rect(rect))
    }

    /// Remove a single rectangle.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subtract_assign`].
    pub fn subtract_rect(&mut self, rect: Rect) -> Result<(), RegionError> {
        self.subtract_assign(&Self::from_rect(rect))
    }

    /// Shift the region, saturating at the 16-bit coordinate range.
    ///
    /// Rectangles pushed against the range limit are clipped there and the
    /// region is rebuilt so the banding invariants still hold.
    ///
    /// # Errors
    ///
    /// Fails if the region is bad or the rebuild runs out of storage.
    pub fn translate(&mut self, dx: i32, dy: i32) -> Result<(), RegionError> {
        if self.bad {
            return Err(RegionError::InvalidOperand);
        }
        if self.is_empty() {
            return Ok(());
        }

        let mut clamped = false;
        for rect in &mut self.rects {
            let (moved, was_clamped) = rect.translated(dx, dy);
            *rect = moved;
            clamped |= was_clamped;
        }
        if !clamped {
            self.extents = self.extents.translated(dx, dy).0;
            return Ok(());
        }

        let rects = std::mem::take(&mut self.rects);
        self.assign_with(|_| validate(&rects))
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self { Self::from_rect(rect) }
}

/// Tight bounds of a banded rectangle list.
fn compute_extents(rects: &[Rect]) -> Rect {
    let (Some(first), Some(last)) = (rects.first(), rects.last()) else {
        return Rect::zero();
    };
    let x1 = rects.iter().map(|r| r.x1).min().unwrap_or(first.x1);
    let x2 = rects.iter().map(|r| r.x2).max().unwrap_or(first.x2);
    Rect::new(x1, first.y1, x2, last.y2)
}
