//! Application receive loop and client API.

use std::time::Duration;

use super::handle::{AppHandle, AppId, RunState};
use crate::error::{ServerError, ServerResult};
use crate::messaging::{
    Mailbox, Message, MessageKind, MessagePool, Postbox, Status, Timer, TimerMode, Wait, WindowId,
    mailbox,
};
use crate::region::Rect;
use crate::server::ServerHandle;
use crate::topwin::WindowSpec;

/// Per-application event dispatch.
///
/// The returned status answers the sender when the message was posted
/// synchronously and is ignored otherwise.
pub trait EventHandler {
    fn handle_event(&mut self, app: &AppClient, msg: &Message) -> Status;
}

impl<F> EventHandler for F
where
    F: FnMut(&AppClient, &Message) -> Status,
{
    fn handle_event(&mut self, app: &AppClient, msg: &Message) -> Status { self(app, msg) }
}

/// Cloneable request side of an application.
///
/// Every message it sends is stamped with the application's identity.
#[derive(Clone, Debug)]
pub struct AppClient {
    handle: AppHandle,
    server: Postbox,
    pool: MessagePool,
    sync_timeout: Duration,
}

impl AppClient {
    #[must_use]
    pub const fn handle(&self) -> &AppHandle { &self.handle }

    #[must_use]
    pub fn id(&self) -> AppId { self.handle.id() }

    fn message(&self, kind: MessageKind) -> ServerResult<Message> {
        Ok(self.pool.alloc(kind)?.with_sender(self.handle.id()))
    }

    /// Send a request to the server and wait for its status word.
    ///
    /// # Errors
    ///
    /// Returns the server's error status or a transport error.
    pub async fn request(&self, kind: MessageKind) -> Status {
        let msg = self.message(kind)?;
        self.server.post_sync(msg, self.sync_timeout).await
    }

    /// Send a message to the server without waiting.
    ///
    /// # Errors
    ///
    /// Fails if the pool is exhausted or the server queue is full or gone.
    pub fn notify(&self, kind: MessageKind) -> ServerResult<()> {
        let msg = self.message(kind)?;
        Ok(self.server.post(msg)?)
    }

    /// Post a message into this application's own mailbox.
    ///
    /// # Errors
    ///
    /// Fails if the pool is exhausted or the mailbox is full or gone.
    pub fn post_self(&self, kind: MessageKind) -> ServerResult<()> {
        let msg = self.message(kind)?;
        Ok(self.handle.post(msg)?)
    }

    /// Release one keep-alive hold of the receive loop.
    ///
    /// # Errors
    ///
    /// Same as [`Self::post_self`].
    pub fn quit(&self) -> ServerResult<()> { self.post_self(MessageKind::Quit) }

    /// Start a timer that posts into this application's mailbox.
    #[must_use]
    pub fn start_timer(&self, period: Duration, mode: TimerMode) -> Timer {
        Timer::start(
            self.handle.postbox().clone(),
            self.pool.clone(),
            Some(self.handle.id()),
            period,
            mode,
        )
    }

    // ========================================================================
    // Window requests
    // ========================================================================

    async fn ack(&self, kind: MessageKind) -> ServerResult<()> { self.request(kind).await.map(|_| ()) }

    /// Create a hidden window.
    ///
    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn create_window(
        &self,
        window: WindowId,
        parent: Option<WindowId>,
        spec: WindowSpec,
    ) -> ServerResult<()> {
        self.ack(MessageKind::WinCreate { window, parent, spec }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn show_window(&self, window: WindowId) -> ServerResult<()> {
        self.ack(MessageKind::WinShow { window }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn hide_window(&self, window: WindowId) -> ServerResult<()> {
        self.ack(MessageKind::WinHide { window }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn destroy_window(&self, window: WindowId) -> ServerResult<()> {
        self.ack(MessageKind::WinDestroy { window }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn move_window(&self, window: WindowId, x: i16, y: i16) -> ServerResult<()> {
        self.ack(MessageKind::WinMove { window, x, y }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn resize_window(&self, window: WindowId, rect: Rect) -> ServerResult<()> {
        self.ack(MessageKind::WinResize { window, rect }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn activate_window(&self, window: WindowId) -> ServerResult<()> {
        self.ack(MessageKind::WinActivate { window }).await
    }

    /// Start a modal session owned by `window`.
    ///
    /// Takes a keep-alive hold on the receive loop; the matching
    /// [`Self::quit`] ends the session's hold without stopping the loop.
    ///
    /// # Errors
    ///
    /// Returns the server's error status; no hold is kept in that case.
    pub async fn enter_modal(&self, window: WindowId) -> ServerResult<()> {
        if !self.handle.hold() {
            return Err(ServerError::Disconnected);
        }
        let result = self.ack(MessageKind::WinModalEnter { window }).await;
        if result.is_err() {
            self.handle.release();
        }
        result
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn add_monitor(&self, window: WindowId, rect: Rect) -> ServerResult<()> {
        self.ack(MessageKind::MonitorAdd { window, rect }).await
    }

    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn remove_monitor(&self, window: WindowId, rect: Rect) -> ServerResult<()> {
        self.ack(MessageKind::MonitorRemove { window, rect }).await
    }

    /// Register this application as the window manager.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::WindowManagerExists`] if another application
    /// holds the role.
    pub async fn set_window_manager(&self) -> ServerResult<()> {
        self.ack(MessageKind::SetWm).await
    }

    /// Unregister from the server, destroying every owned window.
    ///
    /// # Errors
    ///
    /// Returns the server's error status.
    pub async fn disconnect(&self) -> ServerResult<()> { self.ack(MessageKind::AppDisconnect).await }
}

/// An application task: its mailbox plus the client used to talk to the
/// server.
#[derive(Debug)]
pub struct Application {
    client: AppClient,
    mailbox: Mailbox,
}

impl Application {
    /// Create an application and register it with the server.
    ///
    /// # Errors
    ///
    /// Returns the server's error status or a transport error.
    pub async fn connect(server: &ServerHandle, name: &str) -> ServerResult<Self> {
        let (postbox, mailbox) = mailbox(server.mailbox_capacity());
        let handle = AppHandle::new(name, postbox);
        let client = AppClient {
            handle: handle.clone(),
            server: server.postbox().clone(),
            pool: server.pool().clone(),
            sync_timeout: server.sync_timeout(),
        };

        client.request(MessageKind::AppConnect(handle)).await?;
        tracing::debug!(app = %client.id(), name, "app: connected");
        Ok(Self { client, mailbox })
    }

    #[must_use]
    pub fn client(&self) -> AppClient { self.client.clone() }

    #[must_use]
    pub const fn handle(&self) -> &AppHandle { &self.client.handle }

    /// Run the receive loop until the last keep-alive hold is released.
    pub async fn run<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> RunState {
        if !self.client.handle.hold() {
            return RunState::Exited;
        }
        tracing::debug!(app = %self.client.id(), "app: receive loop starting");

        loop {
            let msg = match self.mailbox.receive(Wait::Forever).await {
                Ok(msg) => msg,
                Err(err) => {
                    tracing::debug!(app = %self.client.id(), error = %err, "app: mailbox closed");
                    self.mailbox.close();
                    return self.client.handle.release();
                }
            };
            if !self.dispatch(handler, msg) {
                break;
            }
        }

        self.mailbox.close();
        tracing::debug!(app = %self.client.id(), "app: receive loop finished");
        self.client.handle.run_state()
    }

    /// Dispatch every queued message without waiting. Returns how many
    /// messages were taken off the queue.
    pub async fn pump<H: EventHandler + ?Sized>(&mut self, handler: &mut H) -> usize {
        let mut taken = 0;
        while let Ok(msg) = self.mailbox.receive(Wait::Poll).await {
            taken += 1;
            if !self.dispatch(handler, msg) {
                break;
            }
        }
        taken
    }

    /// Handle one message; returns `false` once the loop should stop.
    fn dispatch<H: EventHandler + ?Sized>(&self, handler: &mut H, mut msg: Message) -> bool {
        match &msg.kind {
            MessageKind::Quit => {
                msg.respond(Ok(0));
                return self.client.handle.release() != RunState::Exited;
            }
            MessageKind::RoutedInput { window, .. }
                if msg.stamp().is_some_and(|stamp| stamp != self.client.handle.activation()) =>
            {
                tracing::trace!(app = %self.client.id(), window, "app: dropping stale input");
                return true;
            }
            MessageKind::Timer(ticket) if !ticket.is_live() => {
                tracing::trace!(app = %self.client.id(), timer = ticket.id().get(), "app: dropping stale timer tick");
                return true;
            }
            _ => {}
        }

        let status = handler.handle_event(&self.client, &msg);
        if msg.is_sync() {
            msg.respond(status);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::messaging::InputEvent;

    fn offline_app() -> Application {
        let (server, _server_mailbox) = mailbox(8);
        let (postbox, mailbox) = mailbox(8);
        let client = AppClient {
            handle: AppHandle::new("offline", postbox),
            server,
            pool: MessagePool::new(16),
            sync_timeout: Duration::from_millis(100),
        };
        Application { client, mailbox }
    }

    #[tokio::test]
    async fn test_quit_ends_loop_when_last_hold_released() {
        let mut app = offline_app();
        let client = app.client();
        client.post_self(MessageKind::User { code: 1, param: 0 }).unwrap();
        client.quit().unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        let mut handler = move |_: &AppClient, msg: &Message| -> Status {
            log.lock().push(msg.kind.name());
            Ok(0)
        };

        assert_eq!(app.run(&mut handler).await, RunState::Exited);
        assert_eq!(*seen.lock(), vec!["User"]);
        assert_eq!(app.handle().holds(), 0);
    }

    #[tokio::test]
    async fn test_extra_hold_survives_one_quit() {
        let mut app = offline_app();
        let client = app.client();
        assert!(client.handle().hold());
        client.quit().unwrap();
        client.post_self(MessageKind::User { code: 2, param: 0 }).unwrap();
        client.quit().unwrap();

        let mut users = 0;
        let mut handler = |_: &AppClient, msg: &Message| -> Status {
            if matches!(msg.kind, MessageKind::User { .. }) {
                users += 1;
            }
            Ok(0)
        };
        assert_eq!(app.run(&mut handler).await, RunState::Exited);
        assert_eq!(users, 1);
    }

    #[tokio::test]
    async fn test_stale_input_is_dropped() {
        let mut app = offline_app();
        let client = app.client();
        let event = InputEvent::Key { code: 30, pressed: true };

        let stale = client.message(MessageKind::RoutedInput { window: 1, event }).unwrap();
        client.handle().bump_activation();
        let fresh = client
            .message(MessageKind::RoutedInput { window: 1, event })
            .unwrap()
            .with_stamp(client.handle().activation());
        client.handle().post(stale.with_stamp(0)).unwrap();
        client.handle().post(fresh).unwrap();

        let mut delivered = 0;
        let mut handler = |_: &AppClient, _: &Message| -> Status {
            delivered += 1;
            Ok(0)
        };
        assert_eq!(app.pump(&mut handler).await, 2);
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_sync_message_gets_handler_status() {
        let mut app = offline_app();
        let client = app.client();
        let postbox = client.handle().postbox().clone();
        let msg = client.message(MessageKind::User { code: 5, param: 0 }).unwrap();

        let waiter =
            tokio::spawn(async move { postbox.post_sync(msg, Duration::from_secs(1)).await });
        tokio::task::yield_now().await;

        let mut handler = |_: &AppClient, msg: &Message| -> Status {
            match msg.kind {
                MessageKind::User { code, .. } => Ok(code + 1),
                _ => Err(ServerError::Unsupported),
            }
        };
        assert_eq!(app.pump(&mut handler).await, 1);
        assert_eq!(waiter.await.unwrap(), Ok(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_ticks_reach_handler() {
        let mut app = offline_app();
        let client = app.client();
        let timer = client.start_timer(Duration::from_millis(10), TimerMode::OneShot);

        let mut ticks = Vec::new();
        let mut handler = |app: &AppClient, msg: &Message| -> Status {
            if let MessageKind::Timer(ticket) = &msg.kind {
                ticks.push(ticket.id());
                app.quit()?;
            }
            Ok(0)
        };
        assert_eq!(app.run(&mut handler).await, RunState::Exited);
        assert_eq!(ticks, vec![timer.id()]);
    }
}
