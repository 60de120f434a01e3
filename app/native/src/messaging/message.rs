//! Message types exchanged between applications, the server and drivers.

use serde::Serialize;
use tokio::sync::{OwnedSemaphorePermit, oneshot};

use super::timer::TimerTicket;
use crate::app::{AppHandle, AppId};
use crate::error::ServerError;
use crate::region::{Rect, Region};
use crate::topwin::{WindowInfo, WindowSpec};

/// Client-chosen window identifier.
pub type WindowId = u32;

/// Acknowledgement word delivered through a reply channel.
///
/// `Ok` carries a 32-bit payload (0 for a plain acknowledgement).
pub type Status = Result<u32, ServerError>;

/// Pointer buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MouseButton {
    Left,
    Middle,
    Right,
}

/// Raw input as produced by a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InputEvent {
    /// Pointer moved to an absolute screen position.
    Motion { x: i16, y: i16 },
    /// Pointer button pressed or released.
    Button {
        x: i16,
        y: i16,
        button: MouseButton,
        pressed: bool,
    },
    /// Key pressed or released.
    Key { code: u32, pressed: bool },
}

/// Topology changes reported to the window manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WmEventKind {
    Created,
    Shown,
    Hidden,
    Destroyed,
    Activated,
}

/// Closed set of message kinds.
#[derive(Debug)]
pub enum MessageKind {
    // ════════════════════════════════════════════════════════════════════════
    // Application → server
    // ════════════════════════════════════════════════════════════════════════
    /// Register an application with the server.
    AppConnect(AppHandle),
    /// Unregister the sender and destroy all of its windows.
    AppDisconnect,
    /// Register the sender as the window manager.
    SetWm,
    /// Create a window, optionally owned by `parent`. New windows are hidden.
    WinCreate {
        window: WindowId,
        parent: Option<WindowId>,
        spec: WindowSpec,
    },
    WinShow { window: WindowId },
    WinHide { window: WindowId },
    WinDestroy { window: WindowId },
    /// Move the window's top-left corner to `(x, y)`.
    WinMove { window: WindowId, x: i16, y: i16 },
    WinResize { window: WindowId, rect: Rect },
    WinActivate { window: WindowId },
    WinModalEnter { window: WindowId },
    MonitorAdd { window: WindowId, rect: Rect },
    MonitorRemove { window: WindowId, rect: Rect },
    /// Which window is at a point, ignoring modal sessions and monitors.
    QueryWindowAt { x: i16, y: i16 },
    /// Dump the forest for inspection.
    Snapshot { respond_to: oneshot::Sender<Vec<WindowInfo>> },

    // ════════════════════════════════════════════════════════════════════════
    // Driver → server
    // ════════════════════════════════════════════════════════════════════════
    Input(InputEvent),

    // ════════════════════════════════════════════════════════════════════════
    // Server → application
    // ════════════════════════════════════════════════════════════════════════
    Activate { window: WindowId },
    Deactivate { window: WindowId },
    ClipInfo { window: WindowId, clip: Region },
    Paint { window: WindowId, rect: Rect },
    ModalState { window: WindowId, blocked: bool },
    WmEvent {
        window: WindowId,
        owner: AppId,
        event: WmEventKind,
    },
    RoutedInput { window: WindowId, event: InputEvent },

    // ════════════════════════════════════════════════════════════════════════
    // Timer → application
    // ════════════════════════════════════════════════════════════════════════
    Timer(TimerTicket),

    // ════════════════════════════════════════════════════════════════════════
    // Any direction
    // ════════════════════════════════════════════════════════════════════════
    /// Application-defined message.
    User { code: u32, param: u64 },
    /// Stop the receiving loop.
    Quit,
}

impl MessageKind {
    /// Short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::AppConnect(_) => "AppConnect",
            Self::AppDisconnect => "AppDisconnect",
            Self::SetWm => "SetWm",
            Self::WinCreate { .. } => "WinCreate",
            Self::WinShow { .. } => "WinShow",
            Self::WinHide { .. } => "WinHide",
            Self::WinDestroy { .. } => "WinDestroy",
            Self::WinMove { .. } => "WinMove",
            Self::WinResize { .. } => "WinResize",
            Self::WinActivate { .. } => "WinActivate",
            Self::WinModalEnter { .. } => "WinModalEnter",
            Self::MonitorAdd { .. } => "MonitorAdd",
            Self::MonitorRemove { .. } => "MonitorRemove",
            Self::QueryWindowAt { .. } => "QueryWindowAt",
            Self::Snapshot { .. } => "Snapshot",
            Self::Input(_) => "Input",
            Self::Activate { .. } => "Activate",
            Self::Deactivate { .. } => "Deactivate",
            Self::ClipInfo { .. } => "ClipInfo",
            Self::Paint { .. } => "Paint",
            Self::ModalState { .. } => "ModalState",
            Self::WmEvent { .. } => "WmEvent",
            Self::RoutedInput { .. } => "RoutedInput",
            Self::Timer(_) => "Timer",
            Self::User { .. } => "User",
            Self::Quit => "Quit",
        }
    }
}

/// A message plus its routing data and pool slot.
///
/// The pool slot is released when the message (or the [`Envelope`] split off
/// from it) is dropped. Dropping a synchronous message without responding
/// makes the waiting sender observe [`ServerError::NoResponse`].
#[derive(Debug)]
pub struct Message {
    pub kind: MessageKind,
    envelope: Envelope,
}

/// Routing data of a message, separated from its payload.
#[derive(Debug)]
pub struct Envelope {
    sender: Option<AppId>,
    stamp: Option<u32>,
    reply: Option<oneshot::Sender<Status>>,
    _slot: OwnedSemaphorePermit,
}

impl Envelope {
    /// The originating application, if any.
    #[must_use]
    pub const fn sender(&self) -> Option<AppId> { self.sender }

    /// Activation counter value stamped on routed input.
    #[must_use]
    pub const fn stamp(&self) -> Option<u32> { self.stamp }

    /// Whether the sender is waiting for a reply.
    #[must_use]
    pub const fn is_sync(&self) -> bool { self.reply.is_some() }

    /// Deliver the status word to a waiting sender.
    ///
    /// Returns `false` if there was no reply channel or the sender stopped
    /// waiting. Only the first call delivers anything.
    pub fn respond(&mut self, status: Status) -> bool {
        self.reply.take().is_some_and(|reply| reply.send(status).is_ok())
    }
}

impl Message {
    pub(crate) fn new(kind: MessageKind, slot: OwnedSemaphorePermit) -> Self {
        Self {
            kind,
            envelope: Envelope { sender: None, stamp: None, reply: None, _slot: slot },
        }
    }

    /// Set the originating application.
    #[must_use]
    pub fn with_sender(mut self, sender: AppId) -> Self {
        self.envelope.sender = Some(sender);
        self
    }

    /// Stamp an activation counter value.
    #[must_use]
    pub fn with_stamp(mut self, stamp: u32) -> Self {
        self.envelope.stamp = Some(stamp);
        self
    }

    #[must_use]
    pub const fn sender(&self) -> Option<AppId> { self.envelope.sender }

    #[must_use]
    pub const fn stamp(&self) -> Option<u32> { self.envelope.stamp }

    #[must_use]
    pub const fn is_sync(&self) -> bool { self.envelope.is_sync() }

    /// See [`Envelope::respond`].
    pub fn respond(&mut self, status: Status) -> bool { self.envelope.respond(status) }

    /// Attach a fresh reply channel and return its receiving end.
    pub(crate) fn attach_reply(&mut self) -> oneshot::Receiver<Status> {
        let (tx, rx) = oneshot::channel();
        self.envelope.reply = Some(tx);
        rx
    }

    /// Split the payload from the routing data.
    #[must_use]
    pub fn into_parts(self) -> (MessageKind, Envelope) { (self.kind, self.envelope) }
}

#[cfg(test)]
mod tests {
    use super::super::MessagePool;
    use super::*;

    #[test]
    fn test_respond_delivers_once() {
        let pool = MessagePool::new(1);
        let mut msg = pool.alloc(MessageKind::Quit).unwrap();
        let mut rx = msg.attach_reply();
        assert!(msg.is_sync());

        assert!(msg.respond(Ok(7)));
        assert!(!msg.respond(Ok(8)));
        assert!(!msg.is_sync());
        assert_eq!(rx.try_recv().unwrap(), Ok(7));
    }

    #[test]
    fn test_dropping_sync_message_closes_reply() {
        let pool = MessagePool::new(1);
        let mut msg = pool.alloc(MessageKind::Quit).unwrap();
        let mut rx = msg.attach_reply();
        drop(msg);
        assert!(rx.try_recv().is_err());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn test_envelope_keeps_slot_until_dropped() {
        let pool = MessagePool::new(2);
        let msg = pool.alloc(MessageKind::User { code: 1, param: 2 }).unwrap().with_stamp(3);
        assert_eq!(msg.stamp(), Some(3));

        let (kind, envelope) = msg.into_parts();
        assert_eq!(kind.name(), "User");
        assert_eq!(pool.available(), 1);
        drop(envelope);
        assert_eq!(pool.available(), 2);
    }
}
