//! Fixed-size message storage.

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::mailbox::MailboxError;
use super::message::{Message, MessageKind};

/// A bounded pool of message slots shared by every sender.
///
/// Allocation never waits: when all slots are taken, [`MessagePool::alloc`]
/// fails immediately with [`MailboxError::PoolExhausted`]. A slot returns to
/// the pool when the message holding it is dropped.
#[derive(Clone, Debug)]
pub struct MessagePool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl MessagePool {
    /// Create a pool with `capacity` slots (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self { slots: Arc::new(Semaphore::new(capacity)), capacity }
    }

    /// Take a slot and wrap `kind` in a message.
    ///
    /// # Errors
    ///
    /// Returns [`MailboxError::PoolExhausted`] if no slot is free.
    pub fn alloc(&self, kind: MessageKind) -> Result<Message, MailboxError> {
        let slot = Arc::clone(&self.slots)
            .try_acquire_owned()
            .map_err(|_| MailboxError::PoolExhausted)?;
        Ok(Message::new(kind, slot))
    }

    /// Total number of slots.
    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    /// Slots currently free.
    #[must_use]
    pub fn available(&self) -> usize { self.slots.available_permits() }

    /// Slots currently held by live messages.
    #[must_use]
    pub fn in_use(&self) -> usize { self.capacity - self.available() }
}
