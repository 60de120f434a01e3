//! State owned by the server task.

use std::collections::HashMap;

use crate::app::{AppHandle, AppId};
use crate::error::{ServerError, ServerResult};
use crate::messaging::{InputEvent, WindowId, WmEventKind};
use crate::region::Rect;
use crate::topwin::TopWinManager;

/// A topology change to report to the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WmNotice {
    pub window: WindowId,
    pub owner: AppId,
    pub event: WmEventKind,
}

/// Input waiting to be stamped and delivered.
#[derive(Debug, Clone)]
pub struct RoutedInput {
    pub app: AppHandle,
    pub window: WindowId,
    pub event: InputEvent,
}

/// Everything the server task owns. Handlers mutate it; the loop drains the
/// queued notifications afterwards.
#[derive(Debug)]
pub struct ServerState {
    pub manager: TopWinManager,
    pub apps: HashMap<AppId, AppHandle>,
    pub wm: Option<AppId>,
    pub click_to_focus: bool,
    pub notices: Vec<WmNotice>,
    pub routed: Vec<RoutedInput>,
}

impl ServerState {
    #[must_use]
    pub fn new(screen: Rect, click_to_focus: bool) -> Self {
        Self {
            manager: TopWinManager::new(screen),
            apps: HashMap::new(),
            wm: None,
            click_to_focus,
            notices: Vec::new(),
            routed: Vec::new(),
        }
    }

    /// The connected application that sent a message.
    ///
    /// # Errors
    ///
    /// [`ServerError::UnknownApp`] if the sender is anonymous or not connected.
    pub fn sender_app(&self, sender: Option<AppId>) -> ServerResult<&AppHandle> {
        sender.and_then(|id| self.apps.get(&id)).ok_or(ServerError::UnknownApp)
    }

    /// The registered window manager, if it is still connected.
    #[must_use]
    pub fn wm_app(&self) -> Option<&AppHandle> { self.wm.and_then(|id| self.apps.get(&id)) }

    /// Check that `sender` may change `window`.
    ///
    /// The owner and the window manager may; so may anonymous senders such
    /// as drivers and the server handle.
    ///
    /// # Errors
    ///
    /// [`ServerError::WindowNotFound`] or [`ServerError::PermissionDenied`].
    pub fn check_owner(&self, sender: Option<AppId>, window: WindowId) -> ServerResult<()> {
        let owner = self.manager.owner(window).ok_or(ServerError::WindowNotFound)?;
        match sender {
            None => Ok(()),
            Some(id) if id == owner.id() || self.wm == Some(id) => Ok(()),
            Some(_) => Err(ServerError::PermissionDenied),
        }
    }

    /// Queue a notice for the window manager.
    pub fn notice(&mut self, window: WindowId, owner: AppId, event: WmEventKind) {
        if self.wm.is_some() {
            self.notices.push(WmNotice { window, owner, event });
        }
    }

    /// Queue an activation notice if focus moved since `before`.
    pub fn note_focus_change(&mut self, before: Option<WindowId>) {
        let after = self.manager.focus();
        if after == before {
            return;
        }
        if let Some(window) = after
            && let Some(owner) = self.manager.owner(window).map(AppHandle::id)
        {
            self.notice(window, owner, WmEventKind::Activated);
        }
    }
}
