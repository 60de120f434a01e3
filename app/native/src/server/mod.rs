//! The window server task.
//!
//! [`WindowServer`] owns the window forest and every application registry
//! entry, and processes messages from its mailbox one at a time. Requests
//! are acknowledged first; the notifications they produce are delivered
//! afterwards, synchronously where the protocol requires an answer.

mod device;
pub mod handlers;
mod handle;
mod screen_lock;
mod state;

use std::sync::Arc;
use std::time::{Duration, Instant};

pub use device::{GraphicsDevice, HeadlessDevice};
pub use handle::ServerHandle;
pub use screen_lock::{Frozen, ScreenGuard, ScreenLock};
pub use state::{RoutedInput, ServerState, WmNotice};
use tokio::task::JoinHandle;

use crate::app::{AppHandle, AppId};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::messaging::{Mailbox, MailboxError, Message, MessageKind, MessagePool, Status, Wait, mailbox};
use crate::topwin::Effect;

/// The server task: state, mailbox and graphics device.
#[derive(Debug)]
pub struct WindowServer {
    state: ServerState,
    mailbox: Mailbox,
    pool: MessagePool,
    device: Arc<dyn GraphicsDevice>,
    sync_timeout: Duration,
    idle_tick: Duration,
    last_flush: Instant,
}

impl WindowServer {
    /// Spawn the server task on the current tokio runtime.
    #[must_use]
    pub fn spawn(config: &ServerConfig, device: Arc<dyn GraphicsDevice>) -> (ServerHandle, JoinHandle<()>) {
        let screen = device.screen_rect();
        tracing::debug!(%screen, pool = config.messaging.pool_size, "server: spawning");

        let (postbox, mailbox) = mailbox(config.messaging.mailbox_capacity);
        let pool = MessagePool::new(config.messaging.pool_size);
        let server = Self {
            state: ServerState::new(screen, config.server.click_to_focus),
            mailbox,
            pool: pool.clone(),
            device,
            sync_timeout: config.messaging.sync_timeout(),
            idle_tick: config.server.idle_tick(),
            last_flush: Instant::now(),
        };

        let handle = ServerHandle::new(
            postbox,
            pool,
            config.messaging.sync_timeout(),
            config.messaging.mailbox_capacity,
        );
        let task = tokio::spawn(server.run());
        (handle, task)
    }

    /// Run the message loop until `Quit` arrives or every sender is gone.
    async fn run(mut self) {
        tracing::debug!("server: message loop starting");

        loop {
            match self.mailbox.receive(Wait::For(self.idle_tick)).await {
                Ok(msg) => {
                    if !self.process(msg).await {
                        break;
                    }
                }
                Err(MailboxError::Timeout) => self.on_idle(),
                Err(err) => {
                    tracing::debug!(error = %err, "server: mailbox closed");
                    break;
                }
            }
            if self.last_flush.elapsed() >= self.idle_tick {
                self.on_idle();
            }
        }

        self.mailbox.close();
        self.on_idle();
        tracing::debug!("server: message loop finished");
    }

    /// Handle one message. Returns `false` when the loop should stop.
    async fn process(&mut self, msg: Message) -> bool {
        let (kind, mut envelope) = msg.into_parts();
        let name = kind.name();
        let sender = envelope.sender();
        tracing::trace!(message = name, sender = ?sender, "server: received");

        if matches!(kind, MessageKind::Quit) {
            envelope.respond(Ok(0));
            tracing::debug!("server: quit requested");
            return false;
        }

        let focus_before = self.state.manager.focus();
        let status = self.handle_message(kind, sender);
        if let Err(err) = status {
            tracing::debug!(message = name, sender = ?sender, error = %err, "server: request failed");
        }
        envelope.respond(status);
        drop(envelope);

        self.state.note_focus_change(focus_before);
        self.deliver().await;
        true
    }

    fn handle_message(&mut self, kind: MessageKind, sender: Option<AppId>) -> Status {
        let state = &mut self.state;
        match kind {
            MessageKind::AppConnect(app) => handlers::on_app_connect(state, app),
            MessageKind::AppDisconnect => handlers::on_app_disconnect(state, sender),
            MessageKind::SetWm => handlers::on_set_wm(state, sender),
            MessageKind::WinCreate { window, parent, spec } => {
                handlers::on_win_create(state, sender, window, parent, spec)
            }
            MessageKind::WinShow { window } => handlers::on_win_show(state, sender, window),
            MessageKind::WinHide { window } => handlers::on_win_hide(state, sender, window),
            MessageKind::WinDestroy { window } => handlers::on_win_destroy(state, sender, window),
            MessageKind::WinMove { window, x, y } => handlers::on_win_move(state, sender, window, x, y),
            MessageKind::WinResize { window, rect } => {
                handlers::on_win_resize(state, sender, window, rect)
            }
            MessageKind::WinActivate { window } => handlers::on_win_activate(state, sender, window),
            MessageKind::WinModalEnter { window } => {
                handlers::on_win_modal_enter(state, sender, window)
            }
            MessageKind::MonitorAdd { window, rect } => {
                handlers::on_monitor_add(state, sender, window, rect)
            }
            MessageKind::MonitorRemove { window, rect } => {
                handlers::on_monitor_remove(state, sender, window, rect)
            }
            MessageKind::QueryWindowAt { x, y } => handlers::on_query_window_at(state, x, y),
            MessageKind::Snapshot { respond_to } => handlers::on_snapshot(state, respond_to),
            MessageKind::Input(event) => handlers::on_input(state, event),
            other => {
                tracing::warn!(message = other.name(), sender = ?sender, "server: unsupported message");
                Err(ServerError::Unsupported)
            }
        }
    }

    // ========================================================================
    // Delivery
    // ========================================================================

    /// Deliver everything the last message produced: manager effects, then
    /// window-manager notices, then routed input.
    async fn deliver(&mut self) {
        for effect in self.state.manager.drain_effects() {
            let sync = effect.is_sync();
            if let Effect::Activate { app, .. } = &effect {
                app.bump_activation();
            }
            let (app, kind) = effect.into_message();
            send(&self.pool, self.sync_timeout, &app, kind, sync, None).await;
        }

        let notices = std::mem::take(&mut self.state.notices);
        if let Some(wm) = self.state.wm_app().cloned() {
            for notice in notices {
                let kind =
                    MessageKind::WmEvent { window: notice.window, owner: notice.owner, event: notice.event };
                send(&self.pool, self.sync_timeout, &wm, kind, false, None).await;
            }
        }

        for routed in std::mem::take(&mut self.state.routed) {
            let stamp = routed.app.activation();
            let kind = MessageKind::RoutedInput { window: routed.window, event: routed.event };
            send(&self.pool, self.sync_timeout, &routed.app, kind, false, Some(stamp)).await;
        }
    }

    // ========================================================================
    // Idle
    // ========================================================================

    /// Flush accumulated screen damage to the device.
    fn on_idle(&mut self) {
        self.last_flush = Instant::now();
        let damage = self.state.manager.take_damage();
        if damage.is_empty() {
            return;
        }
        tracing::trace!(rects = damage.num_rects(), extents = %damage.extents(), "server: flushing damage");
        for rect in damage.rects() {
            self.device.update(*rect);
        }
    }
}

/// Post one notification, waiting for the answer when `sync` is set.
/// Failures are logged; the server never retries.
async fn send(
    pool: &MessagePool,
    sync_timeout: Duration,
    app: &AppHandle,
    kind: MessageKind,
    sync: bool,
    stamp: Option<u32>,
) {
    let name = kind.name();
    let msg = match pool.alloc(kind) {
        Ok(msg) => msg,
        Err(err) => {
            tracing::warn!(app = %app.id(), message = name, error = %err, "server: dropping notification");
            return;
        }
    };
    let msg = match stamp {
        Some(stamp) => msg.with_stamp(stamp),
        None => msg,
    };

    let result = if sync {
        app.postbox().post_sync(msg, sync_timeout).await.map(|_| ())
    } else {
        app.post(msg).map_err(ServerError::from)
    };
    if let Err(err) = result {
        tracing::debug!(app = %app.id(), message = name, error = %err, "server: delivery failed");
    }
}
