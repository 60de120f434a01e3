//! Message handlers for the server task.
//!
//! Each handler validates the request, mutates [`ServerState`] and returns
//! the status word the sender receives. Notifications produced along the
//! way are queued and delivered by the server loop after the reply.

use tokio::sync::oneshot;

use super::state::{RoutedInput, ServerState};
use crate::app::{AppHandle, AppId};
use crate::error::ServerError;
use crate::messaging::{InputEvent, Status, WindowId, WmEventKind};
use crate::region::Rect;
use crate::topwin::{HitMode, WindowInfo, WindowSpec};

// ============================================================================
// Applications
// ============================================================================

/// Registers an application. Reconnecting the same handle is harmless.
pub fn on_app_connect(state: &mut ServerState, app: AppHandle) -> Status {
    tracing::debug!(app = %app.id(), name = app.name(), "server: app connected");
    state.apps.insert(app.id(), app);
    Ok(0)
}

/// Unregisters the sender and destroys every window it owns.
pub fn on_app_disconnect(state: &mut ServerState, sender: Option<AppId>) -> Status {
    let app = state.sender_app(sender)?.clone();

    let mut destroyed = 0;
    for window in state.manager.top_windows_of(app.id()) {
        // An earlier removal may already have taken this window with it.
        if let Ok(removed) = state.manager.remove(window) {
            destroyed += removed.len();
            for (window, owner) in removed {
                state.notice(window, owner.id(), WmEventKind::Destroyed);
            }
        }
    }

    state.apps.remove(&app.id());
    if state.wm == Some(app.id()) {
        state.wm = None;
        tracing::info!(app = %app.id(), "server: window manager disconnected");
    }
    tracing::debug!(app = %app.id(), destroyed, "server: app disconnected");
    Ok(u32::try_from(destroyed).unwrap_or(u32::MAX))
}

/// Registers the sender as the window manager.
pub fn on_set_wm(state: &mut ServerState, sender: Option<AppId>) -> Status {
    let id = state.sender_app(sender)?.id();
    match state.wm {
        Some(current) if current != id => {
            tracing::warn!(app = %id, current = %current, "server: second window manager rejected");
            Err(ServerError::WindowManagerExists)
        }
        _ => {
            state.wm = Some(id);
            tracing::info!(app = %id, "server: window manager registered");
            Ok(0)
        }
    }
}

// ============================================================================
// Windows
// ============================================================================

/// Creates a hidden window owned by the sender.
pub fn on_win_create(
    state: &mut ServerState,
    sender: Option<AppId>,
    window: WindowId,
    parent: Option<WindowId>,
    spec: WindowSpec,
) -> Status {
    let app = state.sender_app(sender)?.clone();
    state.manager.add(&app, window, parent, spec)?;
    state.notice(window, app.id(), WmEventKind::Created);
    Ok(0)
}

pub fn on_win_show(state: &mut ServerState, sender: Option<AppId>, window: WindowId) -> Status {
    state.check_owner(sender, window)?;
    state.manager.show(window)?;
    notice_owner(state, window, WmEventKind::Shown);
    Ok(0)
}

pub fn on_win_hide(state: &mut ServerState, sender: Option<AppId>, window: WindowId) -> Status {
    state.check_owner(sender, window)?;
    let was_shown = state.manager.node(window).is_some_and(|node| node.is_shown());
    state.manager.hide(window)?;
    if was_shown {
        notice_owner(state, window, WmEventKind::Hidden);
    }
    Ok(0)
}

/// Destroys a window and its subtree; replies with the number destroyed.
pub fn on_win_destroy(state: &mut ServerState, sender: Option<AppId>, window: WindowId) -> Status {
    state.check_owner(sender, window)?;
    let removed = state.manager.remove(window)?;
    let count = removed.len();
    for (window, owner) in removed {
        state.notice(window, owner.id(), WmEventKind::Destroyed);
    }
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}

pub fn on_win_move(state: &mut ServerState, sender: Option<AppId>, window: WindowId, x: i16, y: i16) -> Status {
    state.check_owner(sender, window)?;
    state.manager.move_to(window, x, y)?;
    Ok(0)
}

pub fn on_win_resize(state: &mut ServerState, sender: Option<AppId>, window: WindowId, rect: Rect) -> Status {
    state.check_owner(sender, window)?;
    state.manager.resize(window, rect)?;
    Ok(0)
}

/// Replies 1 when focus moved, 0 when the window already had it.
pub fn on_win_activate(state: &mut ServerState, sender: Option<AppId>, window: WindowId) -> Status {
    state.check_owner(sender, window)?;
    Ok(u32::from(state.manager.activate(window)?))
}

pub fn on_win_modal_enter(state: &mut ServerState, sender: Option<AppId>, window: WindowId) -> Status {
    state.check_owner(sender, window)?;
    state.manager.enter_modal(window)?;
    Ok(0)
}

pub fn on_monitor_add(state: &mut ServerState, sender: Option<AppId>, window: WindowId, rect: Rect) -> Status {
    state.check_owner(sender, window)?;
    state.manager.add_monitor(window, rect)?;
    Ok(0)
}

/// Replies 1 when the rectangle was registered, 0 otherwise.
pub fn on_monitor_remove(
    state: &mut ServerState,
    sender: Option<AppId>,
    window: WindowId,
    rect: Rect,
) -> Status {
    state.check_owner(sender, window)?;
    Ok(u32::from(state.manager.remove_monitor(window, rect)?))
}

fn notice_owner(state: &mut ServerState, window: WindowId, event: WmEventKind) {
    if let Some(owner) = state.manager.owner(window).map(AppHandle::id) {
        state.notice(window, owner, event);
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Replies with the window under the point, ignoring modal sessions.
pub fn on_query_window_at(state: &ServerState, x: i16, y: i16) -> Status {
    state.manager.hit_test(x, y, HitMode::Admin).ok_or(ServerError::WindowNotFound)
}

pub fn on_snapshot(state: &ServerState, respond_to: oneshot::Sender<Vec<WindowInfo>>) -> Status {
    if respond_to.send(state.manager.snapshot()).is_err() {
        tracing::debug!("server: snapshot requester went away");
    }
    Ok(0)
}

// ============================================================================
// Input
// ============================================================================

/// Routes a device event to the window under the pointer or to the focus.
///
/// A button press on an unfocused window activates it first when
/// click-to-focus is on. The routed copy is stamped on delivery.
pub fn on_input(state: &mut ServerState, event: InputEvent) -> Status {
    let target = match event {
        InputEvent::Motion { x, y } => state.manager.hit_test(x, y, HitMode::Routing),
        InputEvent::Button { x, y, pressed, .. } => {
            let hit = state.manager.hit_test(x, y, HitMode::Routing);
            if let Some(window) = hit
                && pressed
                && state.click_to_focus
                && state.manager.focus() != Some(window)
                && let Err(err) = state.manager.activate(window)
            {
                tracing::trace!(window, error = %err, "server: click did not focus");
            }
            hit
        }
        InputEvent::Key { .. } => state.manager.focus(),
    };

    let Some(window) = target else {
        tracing::trace!(?event, "server: input has no target");
        return Ok(0);
    };
    if let Some(app) = state.manager.owner(window).cloned() {
        state.routed.push(RoutedInput { app, window, event });
    }
    Ok(window)
}
