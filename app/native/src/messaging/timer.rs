//! Timers that post `Timer` messages into a mailbox.
//!
//! Every delivery carries a [`TimerTicket`] and counts as *pending* until
//! the ticket is dropped, which happens when the receiving handler is done
//! with the message (or when the message is discarded undelivered). A
//! destroy request made while deliveries are pending only moves the timer to
//! [`TimerState::Destroying`]; the last ticket to drop completes it.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

use super::mailbox::{MailboxError, Postbox};
use super::message::MessageKind;
use super::pool::MessagePool;
use crate::app::AppId;

static NEXT_TIMER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique timer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    fn next() -> Self { Self(NEXT_TIMER_ID.fetch_add(1, Ordering::Relaxed)) }

    #[must_use]
    pub const fn get(self) -> u64 { self.0 }
}

/// Whether a timer fires once or keeps firing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    OneShot,
    Repeating,
}

/// Lifecycle of a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Firing normally.
    Armed,
    /// Stopped; deliveries already queued are stale.
    Cancelled,
    /// Destroy requested while deliveries were pending.
    Destroying,
    /// Torn down.
    Destroyed,
}

#[derive(Debug)]
struct Lifecycle {
    state: TimerState,
    pending: usize,
}

#[derive(Debug)]
struct Shared {
    id: TimerId,
    life: Mutex<Lifecycle>,
}

impl Shared {
    /// Count a new delivery if the timer is still armed.
    fn begin_delivery(&self) -> bool {
        let mut life = self.life.lock();
        if life.state != TimerState::Armed {
            return false;
        }
        life.pending += 1;
        true
    }

    fn end_delivery(&self) {
        let mut life = self.life.lock();
        life.pending = life.pending.saturating_sub(1);
        if life.pending == 0 && life.state == TimerState::Destroying {
            life.state = TimerState::Destroyed;
            tracing::trace!(timer = self.id.get(), "timer: deferred destroy completed");
        }
    }
}

/// One delivery of a timer, carried inside a `Timer` message.
#[derive(Debug)]
pub struct TimerTicket {
    shared: Arc<Shared>,
}

impl TimerTicket {
    #[must_use]
    pub fn id(&self) -> TimerId { self.shared.id }

    /// Whether the timer is still armed. Handlers should ignore stale
    /// deliveries of cancelled or destroyed timers.
    #[must_use]
    pub fn is_live(&self) -> bool { self.shared.life.lock().state == TimerState::Armed }
}

impl Drop for TimerTicket {
    fn drop(&mut self) { self.shared.end_delivery(); }
}

/// Owning handle of a running timer. Dropping it destroys the timer.
#[derive(Debug)]
pub struct Timer {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl Timer {
    /// Start a timer that posts into `postbox` every `period`.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(
        postbox: Postbox,
        pool: MessagePool,
        owner: Option<AppId>,
        period: Duration,
        mode: TimerMode,
    ) -> Self {
        let shared = Arc::new(Shared {
            id: TimerId::next(),
            life: Mutex::new(Lifecycle { state: TimerState::Armed, pending: 0 }),
        });

        let task_shared = Arc::clone(&shared);
        let task = tokio::spawn(async move {
            loop {
                tokio::time::sleep(period).await;
                if !deliver(&task_shared, &postbox, &pool, owner) {
                    break;
                }
                if mode == TimerMode::OneShot {
                    break;
                }
            }
        });

        Self { shared, task }
    }

    #[must_use]
    pub fn id(&self) -> TimerId { self.shared.id }

    #[must_use]
    pub fn state(&self) -> TimerState { self.shared.life.lock().state }

    /// Deliveries posted but not yet finished.
    #[must_use]
    pub fn pending(&self) -> usize { self.shared.life.lock().pending }

    /// Stop firing. Deliveries already queued become stale.
    pub fn cancel(&self) {
        self.task.abort();
        let mut life = self.shared.life.lock();
        if life.state == TimerState::Armed {
            life.state = TimerState::Cancelled;
        }
    }

    /// Tear the timer down, deferring while deliveries are pending.
    ///
    /// Returns the resulting state.
    pub fn destroy(&self) -> TimerState {
        self.task.abort();
        let mut life = self.shared.life.lock();
        if life.state != TimerState::Destroyed {
            life.state = if life.pending == 0 {
                TimerState::Destroyed
            } else {
                TimerState::Destroying
            };
        }
        life.state
    }
}

impl Drop for Timer {
    fn drop(&mut self) { self.destroy(); }
}

/// Post one `Timer` message; returns `false` when the timer should stop.
fn deliver(shared: &Arc<Shared>, postbox: &Postbox, pool: &MessagePool, owner: Option<AppId>) -> bool {
    if !shared.begin_delivery() {
        return false;
    }
    // From here on the ticket owns the pending count.
    let ticket = TimerTicket { shared: Arc::clone(shared) };

    let msg = match pool.alloc(MessageKind::Timer(ticket)) {
        Ok(msg) => msg,
        Err(err) => {
            tracing::warn!(timer = shared.id.get(), error = %err, "timer: dropping tick");
            return true;
        }
    };
    let msg = match owner {
        Some(owner) => msg.with_sender(owner),
        None => msg,
    };

    match postbox.post(msg) {
        Ok(()) => true,
        Err(MailboxError::Disconnected) => {
            tracing::debug!(timer = shared.id.get(), "timer: mailbox closed, stopping");
            false
        }
        Err(err) => {
            tracing::warn!(timer = shared.id.get(), error = %err, "timer: dropping tick");
            true
        }
    }
}
