//! Band sweep shared by union, intersection and subtraction.
//!
//! Both operands are walked band by band along the y axis. Each horizontal
//! strip belongs to the first operand only, the second only, or both. Strips
//! owned by a single operand are copied (clipped to the strip) when the
//! operation asks for it; strips covered by both are handed to the
//! operation's overlap function. After every emitted band the previous band
//! is coalesced with it when they share an edge and have identical spans.

use super::RegionError;
use super::rect::Rect;

/// Upper bound on rectangles a single region may hold.
pub const MAX_RECTS: usize = 1 << 16;

/// Growable rectangle storage with fallible allocation.
#[derive(Debug, Default)]
pub(crate) struct RectBuf {
    rects: Vec<Rect>,
}

impl RectBuf {
    pub(crate) fn with_capacity(capacity: usize) -> Result<Self, RegionError> {
        let mut rects = Vec::new();
        rects.try_reserve(capacity.min(MAX_RECTS)).map_err(|_| RegionError::OutOfMemory)?;
        Ok(Self { rects })
    }

    pub(crate) fn push(&mut self, rect: Rect) -> Result<(), RegionError> {
        if self.rects.len() >= MAX_RECTS {
            return Err(RegionError::OutOfMemory);
        }
        if self.rects.len() == self.rects.capacity() {
            self.rects.try_reserve(self.rects.len().max(4)).map_err(|_| RegionError::OutOfMemory)?;
        }
        self.rects.push(rect);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize { self.rects.len() }

    pub(crate) fn last_mut(&mut self) -> Option<&mut Rect> { self.rects.last_mut() }

    pub(crate) fn into_vec(self) -> Vec<Rect> { self.rects }

    /// Merge the band starting at `cur` into the band starting at `prev` if
    /// they touch vertically and have identical horizontal spans.
    ///
    /// Returns the start of the band that subsequent bands should be compared
    /// against.
    pub(crate) fn coalesce(&mut self, prev: usize, cur: usize) -> usize {
        let cur_len = self.rects.len() - cur;
        let prev_len = cur - prev;
        if cur_len == 0 || prev_len != cur_len {
            return cur;
        }

        let (prev_band, cur_band) = self.rects[prev..].split_at(prev_len);
        if prev_band[0].y2 != cur_band[0].y1 {
            return cur;
        }
        let same_spans =
            prev_band.iter().zip(cur_band).all(|(p, c)| p.x1 == c.x1 && p.x2 == c.x2);
        if !same_spans {
            return cur;
        }

        let y2 = cur_band[0].y2;
        for rect in &mut self.rects[prev..cur] {
            rect.y2 = y2;
        }
        self.rects.truncate(cur);
        prev
    }

    /// Copy `band` clipped to the strip `[y1, y2)`.
    fn append_band(&mut self, band: &[Rect], y1: i16, y2: i16) -> Result<(), RegionError> {
        for rect in band {
            self.push(Rect::new(rect.x1, y1, rect.x2, y2))?;
        }
        Ok(())
    }
}

/// Which operation a sweep performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum SetOp {
    Union,
    Intersect,
    Subtract,
}

impl SetOp {
    /// Whether strips covered only by the first operand are kept.
    const fn keeps_first_only(self) -> bool { matches!(self, Self::Union | Self::Subtract) }

    /// Whether strips covered only by the second operand are kept.
    const fn keeps_second_only(self) -> bool { matches!(self, Self::Union) }

    fn overlap(
        self,
        out: &mut RectBuf,
        a: &[Rect],
        b: &[Rect],
        y1: i16,
        y2: i16,
    ) -> Result<(), RegionError> {
        match self {
            Self::Union => union_overlap(out, a, b, y1, y2),
            Self::Intersect => intersect_overlap(out, a, b, y1, y2),
            Self::Subtract => subtract_overlap(out, a, b, y1, y2),
        }
    }
}

/// End index (exclusive) of the band starting at `start`.
fn band_end(rects: &[Rect], start: usize) -> usize {
    let y1 = rects[start].y1;
    rects[start..].iter().position(|r| r.y1 != y1).map_or(rects.len(), |n| start + n)
}

/// Run the sweep over two banded rectangle lists.
///
/// Both inputs must be non-empty and satisfy the region invariants.
pub(crate) fn sweep(op: SetOp, a: &[Rect], b: &[Rect]) -> Result<Vec<Rect>, RegionError> {
    debug_assert!(!a.is_empty() && !b.is_empty());

    let mut out = RectBuf::with_capacity(a.len().max(b.len()) * 2)?;
    let mut prev_band = 0;

    let (mut ia, mut ib) = (0, 0);
    let mut ybot = a[0].y1.min(b[0].y1);

    while ia < a.len() && ib < b.len() {
        let a_end = band_end(a, ia);
        let b_end = band_end(b, ib);
        let (ra, rb) = (a[ia], b[ib]);

        // Strip above the overlap belongs to one operand only.
        let ytop = if ra.y1 < rb.y1 {
            if op.keeps_first_only() {
                let top = ra.y1.max(ybot);
                let bot = ra.y2.min(rb.y1);
                if top != bot {
                    let cur_band = out.len();
                    out.append_band(&a[ia..a_end], top, bot)?;
                    prev_band = out.coalesce(prev_band, cur_band);
                }
            }
            rb.y1
        } else if rb.y1 < ra.y1 {
            if op.keeps_second_only() {
                let top = rb.y1.max(ybot);
                let bot = rb.y2.min(ra.y1);
                if top != bot {
                    let cur_band = out.len();
                    out.append_band(&b[ib..b_end], top, bot)?;
                    prev_band = out.coalesce(prev_band, cur_band);
                }
            }
            ra.y1
        } else {
            ra.y1
        };

        ybot = ra.y2.min(rb.y2);
        if ybot > ytop {
            let cur_band = out.len();
            op.overlap(&mut out, &a[ia..a_end], &b[ib..b_end], ytop, ybot)?;
            if out.len() != cur_band {
                prev_band = out.coalesce(prev_band, cur_band);
            } else {
                prev_band = cur_band;
            }
        }

        if ra.y2 == ybot {
            ia = a_end;
        }
        if rb.y2 == ybot {
            ib = b_end;
        }
    }

    // Whatever is left of one operand lies below everything in the other.
    let (rest, start, keep) = if ia < a.len() {
        (a, ia, op.keeps_first_only())
    } else {
        (b, ib, op.keeps_second_only())
    };
    if keep && start < rest.len() {
        let first_end = band_end(rest, start);
        let cur_band = out.len();
        out.append_band(&rest[start..first_end], rest[start].y1.max(ybot), rest[start].y2)?;
        out.coalesce(prev_band, cur_band);
        for rect in &rest[first_end..] {
            out.push(*rect)?;
        }
    }

    Ok(out.into_vec())
}

/// Accumulates one output span at a time while walking a band left to right.
struct SpanMerger {
    y1: i16,
    y2: i16,
    span: Option<(i16, i16)>,
}

impl SpanMerger {
    fn merge(&mut self, out: &mut RectBuf, rect: Rect) -> Result<(), RegionError> {
        match self.span {
            Some((x1, x2)) if rect.x1 <= x2 => self.span = Some((x1, x2.max(rect.x2))),
            Some((x1, x2)) => {
                out.push(Rect::new(x1, self.y1, x2, self.y2))?;
                self.span = Some((rect.x1, rect.x2));
            }
            None => self.span = Some((rect.x1, rect.x2)),
        }
        Ok(())
    }

    fn finish(self, out: &mut RectBuf) -> Result<(), RegionError> {
        match self.span {
            Some((x1, x2)) => out.push(Rect::new(x1, self.y1, x2, self.y2)),
            None => Ok(()),
        }
    }
}

/// Merge two bands, joining spans that overlap or touch.
fn union_overlap(
    out: &mut RectBuf,
    a: &[Rect],
    b: &[Rect],
    y1: i16,
    y2: i16,
) -> Result<(), RegionError> {
    let (mut ia, mut ib) = (0, 0);
    let mut merger = SpanMerger { y1, y2, span: None };

    while ia < a.len() && ib < b.len() {
        if a[ia].x1 < b[ib].x1 {
            merger.merge(out, a[ia])?;
            ia += 1;
        } else {
            merger.merge(out, b[ib])?;
            ib += 1;
        }
    }
    for rect in a[ia..].iter().chain(&b[ib..]) {
        merger.merge(out, *rect)?;
    }

    merger.finish(out)
}

/// Keep only the horizontal overlaps of two bands.
fn intersect_overlap(
    out: &mut RectBuf,
    a: &[Rect],
    b: &[Rect],
    y1: i16,
    y2: i16,
) -> Result<(), RegionError> {
    let (mut ia, mut ib) = (0, 0);
    while ia < a.len() && ib < b.len() {
        let x1 = a[ia].x1.max(b[ib].x1);
        let x2 = a[ia].x2.min(b[ib].x2);
        if x1 < x2 {
            out.push(Rect::new(x1, y1, x2, y2))?;
        }

        match a[ia].x2.cmp(&b[ib].x2) {
            std::cmp::Ordering::Less => ia += 1,
            std::cmp::Ordering::Greater => ib += 1,
            std::cmp::Ordering::Equal => {
                ia += 1;
                ib += 1;
            }
        }
    }
    Ok(())
}

/// Remove the spans of `sub` from the spans of `min`.
fn subtract_overlap(
    out: &mut RectBuf,
    min: &[Rect],
    sub: &[Rect],
    y1: i16,
    y2: i16,
) -> Result<(), RegionError> {
    let (mut im, mut is) = (0, 0);
    let mut x1 = min[0].x1;

    while im < min.len() && is < sub.len() {
        let (m, s) = (min[im], sub[is]);
        if s.x2 <= x1 {
            // Subtrahend entirely to the left.
            is += 1;
        } else if s.x1 <= x1 {
            // Subtrahend covers the left edge of what is left of the minuend.
            x1 = s.x2;
            if x1 >= m.x2 {
                im += 1;
                if im < min.len() {
                    x1 = min[im].x1;
                }
            } else {
                is += 1;
            }
        } else if s.x1 < m.x2 {
            // Part of the minuend survives left of the subtrahend.
            out.push(Rect::new(x1, y1, s.x1, y2))?;
            x1 = s.x2;
            if x1 >= m.x2 {
                im += 1;
                if im < min.len() {
                    x1 = min[im].x1;
                }
            } else {
                is += 1;
            }
        } else {
            // Subtrahend starts past the minuend.
            if m.x2 > x1 {
                out.push(Rect::new(x1, y1, m.x2, y2))?;
            }
            im += 1;
            if im < min.len() {
                x1 = min[im].x1;
            }
        }
    }

    while im < min.len() {
        out.push(Rect::new(x1, y1, min[im].x2, y2))?;
        im += 1;
        if im < min.len() {
            x1 = min[im].x1;
        }
    }
    Ok(())
}
