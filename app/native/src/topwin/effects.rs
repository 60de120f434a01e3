//! Notifications produced by manager operations.
//!
//! The manager never talks to applications directly. Every operation pushes
//! effects into an outbox that the server drains and delivers once the
//! request itself has been acknowledged.

use crate::app::AppHandle;
use crate::messaging::{MessageKind, WindowId};
use crate::region::{Rect, Region};

#[derive(Debug, Clone)]
pub enum Effect {
    /// The window gained focus.
    Activate { app: AppHandle, window: WindowId },
    /// The window lost focus.
    Deactivate { app: AppHandle, window: WindowId },
    /// The window's visible region changed.
    Clip {
        app: AppHandle,
        window: WindowId,
        clip: Region,
    },
    /// Part of the window must be redrawn.
    Paint {
        app: AppHandle,
        window: WindowId,
        rect: Rect,
    },
    /// The window became blocked or unblocked by a modal session.
    ModalState {
        app: AppHandle,
        window: WindowId,
        blocked: bool,
    },
}

impl Effect {
    #[must_use]
    pub const fn app(&self) -> &AppHandle {
        match self {
            Self::Activate { app, .. }
            | Self::Deactivate { app, .. }
            | Self::Clip { app, .. }
            | Self::Paint { app, .. }
            | Self::ModalState { app, .. } => app,
        }
    }

    #[must_use]
    pub const fn window(&self) -> WindowId {
        match self {
            Self::Activate { window, .. }
            | Self::Deactivate { window, .. }
            | Self::Clip { window, .. }
            | Self::Paint { window, .. }
            | Self::ModalState { window, .. } => *window,
        }
    }

    /// Whether delivery waits for the application's acknowledgement.
    #[must_use]
    pub const fn is_sync(&self) -> bool {
        matches!(self, Self::Activate { .. } | Self::Deactivate { .. } | Self::Clip { .. })
    }

    /// The message delivered to the application.
    #[must_use]
    pub fn into_message(self) -> (AppHandle, MessageKind) {
        match self {
            Self::Activate { app, window } => (app, MessageKind::Activate { window }),
            Self::Deactivate { app, window } => (app, MessageKind::Deactivate { window }),
            Self::Clip { app, window, clip } => (app, MessageKind::ClipInfo { window, clip }),
            Self::Paint { app, window, rect } => (app, MessageKind::Paint { window, rect }),
            Self::ModalState { app, window, blocked } => {
                (app, MessageKind::ModalState { window, blocked })
            }
        }
    }
}
