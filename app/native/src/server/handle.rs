//! Handle for talking to the server task.
//!
//! Messages sent through the handle carry no sender, so the server treats
//! them like driver input: they may act on any window.

use std::time::Duration;

use tokio::sync::oneshot;

use crate::error::{ServerError, ServerResult};
use crate::messaging::{InputEvent, MessageKind, MessagePool, Postbox, Status, WindowId};
use crate::topwin::WindowInfo;

/// Cheap to clone; every clone feeds the same server mailbox.
#[derive(Clone, Debug)]
pub struct ServerHandle {
    postbox: Postbox,
    pool: MessagePool,
    sync_timeout: Duration,
    mailbox_capacity: usize,
}

impl ServerHandle {
    pub(crate) const fn new(
        postbox: Postbox,
        pool: MessagePool,
        sync_timeout: Duration,
        mailbox_capacity: usize,
    ) -> Self {
        Self { postbox, pool, sync_timeout, mailbox_capacity }
    }

    #[must_use]
    pub const fn postbox(&self) -> &Postbox { &self.postbox }

    /// The pool every message to and from this server is allocated from.
    #[must_use]
    pub const fn pool(&self) -> &MessagePool { &self.pool }

    /// Bound on every synchronous round-trip.
    #[must_use]
    pub const fn sync_timeout(&self) -> Duration { self.sync_timeout }

    /// Capacity for application mailboxes.
    #[must_use]
    pub const fn mailbox_capacity(&self) -> usize { self.mailbox_capacity }

    /// Whether the server task has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.postbox.is_closed() }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Send a request and wait for the status word.
    ///
    /// # Errors
    ///
    /// Returns the server's error status or a transport error.
    pub async fn request(&self, kind: MessageKind) -> Status {
        let msg = self.pool.alloc(kind)?;
        self.postbox.post_sync(msg, self.sync_timeout).await
    }

    /// Send a message without waiting.
    ///
    /// # Errors
    ///
    /// Fails if the pool is exhausted or the server queue is full or gone.
    pub fn notify(&self, kind: MessageKind) -> ServerResult<()> {
        let msg = self.pool.alloc(kind)?;
        Ok(self.postbox.post(msg)?)
    }

    /// Feed a device event into the server.
    ///
    /// # Errors
    ///
    /// Same as [`Self::notify`].
    pub fn inject(&self, event: InputEvent) -> ServerResult<()> { self.notify(MessageKind::Input(event)) }

    /// Stop the server loop.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the server is already gone.
    pub async fn shutdown(&self) -> ServerResult<()> { self.request(MessageKind::Quit).await.map(|_| ()) }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Every window, shown ones in stacking order first.
    ///
    /// # Errors
    ///
    /// Returns a transport error or [`ServerError::Timeout`].
    pub async fn windows(&self) -> ServerResult<Vec<WindowInfo>> {
        let (tx, rx) = oneshot::channel();
        self.notify(MessageKind::Snapshot { respond_to: tx })?;
        match tokio::time::timeout(self.sync_timeout, rx).await {
            Ok(Ok(windows)) => Ok(windows),
            Ok(Err(_)) => Err(ServerError::NoResponse),
            Err(_) => Err(ServerError::Timeout),
        }
    }

    /// The window at a point, ignoring modal sessions.
    ///
    /// # Errors
    ///
    /// [`ServerError::WindowNotFound`] if no window covers the point.
    pub async fn window_at(&self, x: i16, y: i16) -> ServerResult<WindowId> {
        self.request(MessageKind::QueryWindowAt { x, y }).await
    }
}
