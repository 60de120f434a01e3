//! Per-application identity and lifecycle state.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::messaging::{MailboxError, Message, Postbox};

/// Unique application identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AppId(Uuid);

impl AppId {
    #[must_use]
    pub fn new() -> Self { Self(Uuid::now_v7()) }

    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid { &self.0 }
}

impl Default for AppId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// Lifecycle of an application task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    /// Handle exists, receive loop not entered yet.
    Created,
    /// At least one receive loop is active.
    Running,
    /// The last keep-alive hold was released.
    Exited,
}

#[derive(Debug)]
struct Lifecycle {
    state: RunState,
    holds: usize,
}

struct Inner {
    id: AppId,
    name: String,
    postbox: Postbox,
    activation: AtomicU32,
    windows: AtomicUsize,
    life: Mutex<Lifecycle>,
}

/// Shared handle to one application. Cheap to clone; equality is identity.
#[derive(Clone)]
pub struct AppHandle {
    inner: Arc<Inner>,
}

impl AppHandle {
    /// Create a handle for an application reachable through `postbox`.
    #[must_use]
    pub fn new(name: impl Into<String>, postbox: Postbox) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: AppId::new(),
                name: name.into(),
                postbox,
                activation: AtomicU32::new(0),
                windows: AtomicUsize::new(0),
                life: Mutex::new(Lifecycle { state: RunState::Created, holds: 0 }),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> AppId { self.inner.id }

    #[must_use]
    pub fn name(&self) -> &str { &self.inner.name }

    #[must_use]
    pub fn postbox(&self) -> &Postbox { &self.inner.postbox }

    /// Enqueue a message for this application.
    ///
    /// # Errors
    ///
    /// Fails if the application's queue is full or gone.
    pub fn post(&self, msg: Message) -> Result<(), MailboxError> { self.inner.postbox.post(msg) }

    // ========================================================================
    // Activation counter
    // ========================================================================

    /// Current activation generation.
    #[must_use]
    pub fn activation(&self) -> u32 { self.inner.activation.load(Ordering::Acquire) }

    /// Advance the activation generation; returns the new value.
    pub fn bump_activation(&self) -> u32 {
        self.inner.activation.fetch_add(1, Ordering::AcqRel).wrapping_add(1)
    }

    // ========================================================================
    // Window count
    // ========================================================================

    #[must_use]
    pub fn window_count(&self) -> usize { self.inner.windows.load(Ordering::Acquire) }

    pub(crate) fn window_created(&self) { self.inner.windows.fetch_add(1, Ordering::AcqRel); }

    pub(crate) fn window_destroyed(&self) {
        let _ = self
            .inner
            .windows
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    #[must_use]
    pub fn run_state(&self) -> RunState { self.inner.life.lock().state }

    /// Number of active keep-alive holds.
    #[must_use]
    pub fn holds(&self) -> usize { self.inner.life.lock().holds }

    /// Take a keep-alive hold, entering `Running`.
    ///
    /// Returns `false` (and takes nothing) once the application has exited.
    pub fn hold(&self) -> bool {
        let mut life = self.inner.life.lock();
        if life.state == RunState::Exited {
            return false;
        }
        life.holds += 1;
        life.state = RunState::Running;
        true
    }

    /// Release a keep-alive hold; the last release moves to `Exited`.
    pub fn release(&self) -> RunState {
        let mut life = self.inner.life.lock();
        if life.holds > 0 {
            life.holds -= 1;
            if life.holds == 0 {
                life.state = RunState::Exited;
            }
        }
        life.state
    }
}

impl PartialEq for AppHandle {
    fn eq(&self, other: &Self) -> bool { self.inner.id == other.inner.id }
}

impl Eq for AppHandle {}

impl fmt::Debug for AppHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppHandle")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::mailbox;

    fn handle() -> AppHandle {
        let (postbox, _mailbox) = mailbox(4);
        AppHandle::new("test", postbox)
    }

    #[test]
    fn test_lifecycle_nests_holds() {
        let app = handle();
        assert_eq!(app.run_state(), RunState::Created);

        assert!(app.hold());
        assert!(app.hold());
        assert_eq!(app.run_state(), RunState::Running);
        assert_eq!(app.release(), RunState::Running);
        assert_eq!(app.release(), RunState::Exited);

        // Exited is final.
        assert!(!app.hold());
        assert_eq!(app.release(), RunState::Exited);
    }

    #[test]
    fn test_activation_counter() {
        let app = handle();
        assert_eq!(app.activation(), 0);
        assert_eq!(app.bump_activation(), 1);
        assert_eq!(app.bump_activation(), 2);
        assert_eq!(app.activation(), 2);
    }

    #[test]
    fn test_window_count_never_underflows() {
        let app = handle();
        app.window_created();
        app.window_destroyed();
        app.window_destroyed();
        assert_eq!(app.window_count(), 0);
    }

    #[test]
    fn test_identity_equality() {
        let a = handle();
        let b = handle();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.id(), b.id());
    }
}
