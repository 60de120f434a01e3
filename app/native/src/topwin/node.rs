//! Forest nodes and their flag sets.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

use crate::app::AppHandle;
use crate::messaging::WindowId;
use crate::region::{Rect, Region};

/// Stable index of a node in the forest arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

bitflags! {
    /// Window style bits supplied at creation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowStyle: u32 {
        /// Stays above every normal window.
        const ON_TOP = 1 << 0;
        /// Stays below every normal window.
        const ON_BOTTOM = 1 << 1;
        /// Never takes focus.
        const NO_FOCUS = 1 << 2;
    }
}

bitflags! {
    /// Manager-maintained node state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct NodeFlags: u32 {
        const SHOWN = 1 << 0;
        const ACTIVATED = 1 << 1;
        const ON_TOP = 1 << 2;
        const ON_BOTTOM = 1 << 3;
        const NO_FOCUS = 1 << 4;
        /// Blocked by a descendant's modal session.
        const MODALED = 1 << 5;
        /// Owns a modal session.
        const MODAL_OWNER = 1 << 6;
    }
}

// Styles travel as their raw bits; unknown bits are dropped.
impl Serialize for WindowStyle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WindowStyle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_bits_truncate)
    }
}

impl NodeFlags {
    /// Lower-case names of the set flags, for display.
    #[must_use]
    pub fn names(self) -> Vec<&'static str> {
        self.iter_names().map(|(name, _)| flag_label(name)).collect()
    }
}

fn flag_label(name: &str) -> &'static str {
    match name {
        "SHOWN" => "shown",
        "ACTIVATED" => "activated",
        "ON_TOP" => "on-top",
        "ON_BOTTOM" => "on-bottom",
        "NO_FOCUS" => "no-focus",
        "MODALED" => "modaled",
        "MODAL_OWNER" => "modal-owner",
        _ => "?",
    }
}

/// Stacking layer, front-most first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Layer {
    Top,
    Normal,
    Bottom,
}

impl Layer {
    #[must_use]
    pub const fn from_style(style: WindowStyle) -> Self {
        if style.contains(WindowStyle::ON_TOP) {
            Self::Top
        } else if style.contains(WindowStyle::ON_BOTTOM) {
            Self::Bottom
        } else {
            Self::Normal
        }
    }
}

/// Geometry and style of a window as requested by its application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSpec {
    /// Client area in screen coordinates.
    pub rect: Rect,
    /// Height of the title bar drawn directly above `rect` (0 for none).
    #[serde(default)]
    pub title_height: u16,
    #[serde(default)]
    pub style: WindowStyle,
}

impl WindowSpec {
    #[must_use]
    pub const fn new(rect: Rect) -> Self { Self { rect, title_height: 0, style: WindowStyle::empty() } }

    #[must_use]
    pub const fn with_title(mut self, height: u16) -> Self {
        self.title_height = height;
        self
    }

    #[must_use]
    pub const fn with_style(mut self, style: WindowStyle) -> Self {
        self.style = style;
        self
    }

    /// Title bar rectangle, if any.
    #[must_use]
    pub fn title_rect(&self) -> Option<Rect> {
        (self.title_height > 0).then(|| {
            let top = crate::region::clamp_coord(i32::from(self.rect.y1) - i32::from(self.title_height));
            Rect::new(self.rect.x1, top, self.rect.x2, self.rect.y1)
        })
    }

    /// Client area unioned with the title bar.
    #[must_use]
    pub fn extent(&self) -> Rect {
        self.title_rect().map_or(self.rect, |title| self.rect.bounding_union(&title))
    }
}

/// One window in the forest.
#[derive(Debug, Clone)]
pub struct TopWinNode {
    pub(crate) window: WindowId,
    pub(crate) app: AppHandle,
    pub(crate) spec: WindowSpec,
    pub(crate) extent: Rect,
    pub(crate) layer: Layer,
    pub(crate) flags: NodeFlags,
    pub(crate) clip: Region,
    pub(crate) monitors: Vec<Rect>,
    pub(crate) parent: Option<NodeId>,
    /// Front-most first; shown children precede hidden ones.
    pub(crate) children: SmallVec<[NodeId; 4]>,
    /// Number of modal sessions currently blocking this node.
    pub(crate) modal_holds: u32,
    /// Nodes this node blocked when it entered its modal session.
    pub(crate) modal_blocked: Vec<(NodeId, WindowId)>,
}

impl TopWinNode {
    pub(crate) fn new(window: WindowId, app: AppHandle, spec: WindowSpec, layer: Layer) -> Self {
        let mut flags = NodeFlags::empty();
        match layer {
            Layer::Top => flags |= NodeFlags::ON_TOP,
            Layer::Bottom => flags |= NodeFlags::ON_BOTTOM,
            Layer::Normal => {}
        }
        if spec.style.contains(WindowStyle::NO_FOCUS) {
            flags |= NodeFlags::NO_FOCUS;
        }

        Self {
            window,
            app,
            spec,
            extent: spec.extent(),
            layer,
            flags,
            clip: Region::new(),
            monitors: Vec::new(),
            parent: None,
            children: SmallVec::new(),
            modal_holds: 0,
            modal_blocked: Vec::new(),
        }
    }

    #[must_use]
    pub const fn window(&self) -> WindowId { self.window }

    #[must_use]
    pub const fn app(&self) -> &AppHandle { &self.app }

    #[must_use]
    pub const fn extent(&self) -> Rect { self.extent }

    #[must_use]
    pub const fn spec(&self) -> &WindowSpec { &self.spec }

    #[must_use]
    pub const fn layer(&self) -> Layer { self.layer }

    #[must_use]
    pub const fn flags(&self) -> NodeFlags { self.flags }

    #[must_use]
    pub const fn clip(&self) -> &Region { &self.clip }

    #[must_use]
    pub fn monitors(&self) -> &[Rect] { &self.monitors }

    #[must_use]
    pub const fn parent(&self) -> Option<NodeId> { self.parent }

    #[must_use]
    pub fn children(&self) -> &[NodeId] { &self.children }

    #[must_use]
    pub const fn is_shown(&self) -> bool { self.flags.contains(NodeFlags::SHOWN) }

    /// Whether `(x, y)` falls inside one of the monitor rectangles.
    #[must_use]
    pub fn in_monitor(&self, x: i16, y: i16) -> bool {
        self.monitors.iter().any(|rect| rect.contains_point(x, y))
    }

    /// Replace the client area, keeping the extent in sync.
    pub(crate) fn set_rect(&mut self, rect: Rect) {
        self.spec.rect = rect;
        self.extent = self.spec.extent();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_from_style() {
        assert_eq!(Layer::from_style(WindowStyle::empty()), Layer::Normal);
        assert_eq!(Layer::from_style(WindowStyle::ON_TOP), Layer::Top);
        assert_eq!(Layer::from_style(WindowStyle::ON_BOTTOM | WindowStyle::NO_FOCUS), Layer::Bottom);
        assert!(Layer::Top < Layer::Normal && Layer::Normal < Layer::Bottom);
    }

    #[test]
    fn test_extent_includes_title_bar() {
        let spec = WindowSpec::new(Rect::new(10, 30, 110, 130)).with_title(20);
        assert_eq!(spec.title_rect(), Some(Rect::new(10, 10, 110, 30)));
        assert_eq!(spec.extent(), Rect::new(10, 10, 110, 130));
        assert_eq!(WindowSpec::new(Rect::new(0, 0, 5, 5)).extent(), Rect::new(0, 0, 5, 5));
    }

    #[test]
    fn test_flag_names() {
        let flags = NodeFlags::SHOWN | NodeFlags::MODAL_OWNER;
        assert_eq!(flags.names(), vec!["shown", "modal-owner"]);
    }

    #[test]
    fn test_style_deserializes_from_bits() {
        let spec: WindowSpec =
            serde_json::from_str(r#"{"rect":{"x1":0,"y1":0,"x2":4,"y2":4},"style":5}"#).unwrap();
        assert_eq!(spec.style, WindowStyle::ON_TOP | WindowStyle::NO_FOCUS);
        assert_eq!(spec.title_height, 0);
    }
}
