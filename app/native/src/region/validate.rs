//! Turning an arbitrary rectangle list into a banded region.
//!
//! The rectangles are sorted by `(y1, x1)` and dealt greedily into as few
//! "runs" as possible, where every run is already a valid region: a
//! rectangle joins the first run it can be appended to without breaking the
//! banding. The runs are then merged pairwise with union.

use super::ops::RectBuf;
use super::rect::Rect;
use super::{Region, RegionError};

/// A region under construction.
struct Run {
    rects: RectBuf,
    prev_band: usize,
    cur_band: usize,
    extents: Rect,
}

impl Run {
    fn start(rect: Rect) -> Result<Self, RegionError> {
        let mut rects = RectBuf::with_capacity(8)?;
        rects.push(rect)?;
        Ok(Self { rects, prev_band: 0, cur_band: 0, extents: rect })
    }

    /// Try to append `rect`; returns `Ok(false)` when it does not fit.
    fn try_append(&mut self, rect: Rect) -> Result<bool, RegionError> {
        let Some(last) = self.rects.last_mut() else {
            return Ok(false);
        };

        if rect.y1 == last.y1 && rect.y2 == last.y2 {
            // Same band: extend the last span or start a new one to its right.
            if rect.x1 <= last.x2 {
                last.x2 = last.x2.max(rect.x2);
            } else {
                self.rects.push(rect)?;
            }
        } else if rect.y1 >= last.y2 {
            // New band below the current one.
            self.prev_band = self.rects.coalesce(self.prev_band, self.cur_band);
            self.cur_band = self.rects.len();
            self.rects.push(rect)?;
        } else {
            return Ok(false);
        }

        self.extents = self.extents.bounding_union(&rect);
        Ok(true)
    }

    fn finish(mut self) -> Region {
        self.rects.coalesce(self.prev_band, self.cur_band);
        Region::from_parts(self.extents, self.rects.into_vec())
    }
}

/// Build a region covering exactly the union of `rects`, in any order.
///
/// Empty rectangles are ignored.
///
/// # Errors
///
/// Returns [`RegionError::OutOfMemory`] if rectangle storage cannot grow.
pub fn validate(rects: &[Rect]) -> Result<Region, RegionError> {
    let mut sorted: Vec<Rect> = Vec::new();
    sorted.try_reserve(rects.len()).map_err(|_| RegionError::OutOfMemory)?;
    sorted.extend(rects.iter().copied().filter(|r| !r.is_empty()));

    match sorted.len() {
        0 => return Ok(Region::new()),
        1 => return Ok(Region::from_rect(sorted[0])),
        _ => {}
    }
    sorted.sort_unstable_by_key(|r| (r.y1, r.x1));

    let mut runs: Vec<Run> = Vec::new();
    'next: for rect in sorted {
        for run in &mut runs {
            if run.try_append(rect)? {
                continue 'next;
            }
        }
        runs.try_reserve(1).map_err(|_| RegionError::OutOfMemory)?;
        runs.push(Run::start(rect)?);
    }

    let mut regions: Vec<Region> = runs.into_iter().map(Run::finish).collect();

    // Merge pairwise until one region is left.
    while regions.len() > 1 {
        let half = regions.len().div_ceil(2);
        let upper = regions.split_off(half);
        for (slot, other) in regions.iter_mut().zip(upper) {
            slot.union_assign(&other)?;
        }
    }

    Ok(regions.pop().unwrap_or_default())
}
