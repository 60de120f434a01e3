//! Top-window manager.
//!
//! Owns the forest of windows, the global stacking order, focus, modal
//! sessions and every window's visible (clip) region. All state is mutated
//! by the single server task; results that other tasks must hear about are
//! queued as [`Effect`]s.

mod clip;
mod effects;
mod focus;
mod forest;
mod hit;
mod manager;
mod node;

pub use effects::Effect;
pub use forest::Forest;
pub use hit::HitMode;
pub use manager::{TopWinManager, WindowInfo};
pub use node::{Layer, NodeFlags, NodeId, TopWinNode, WindowSpec, WindowStyle};
