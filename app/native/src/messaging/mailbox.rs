//! Bounded per-application message queues.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::{TryRecvError, TrySendError};

use super::message::{Message, Status};
use crate::error::ServerError;

/// Errors from queue operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MailboxError {
    /// The destination queue is full.
    #[error("destination queue is full")]
    QueueFull,
    /// The destination queue has been destroyed.
    #[error("destination queue is closed")]
    Disconnected,
    /// A poll found no message.
    #[error("no message available")]
    WouldBlock,
    /// A bounded wait expired.
    #[error("wait timed out")]
    Timeout,
    /// The receiver dropped a synchronous message without responding.
    #[error("receiver did not respond")]
    NoResponse,
    /// The message pool has no free slots.
    #[error("message pool exhausted")]
    PoolExhausted,
}

impl From<MailboxError> for ServerError {
    fn from(err: MailboxError) -> Self {
        match err {
            MailboxError::QueueFull => Self::QueueFull,
            MailboxError::Disconnected => Self::Disconnected,
            MailboxError::WouldBlock | MailboxError::Timeout => Self::Timeout,
            MailboxError::NoResponse => Self::NoResponse,
            MailboxError::PoolExhausted => Self::PoolExhausted,
        }
    }
}

/// How long [`Mailbox::receive`] may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Block until a message arrives or every postbox is gone.
    Forever,
    /// Block for at most this long.
    For(Duration),
    /// Return immediately.
    Poll,
}

/// Create a queue holding at most `capacity` messages.
#[must_use]
pub fn mailbox(capacity: usize) -> (Postbox, Mailbox) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (Postbox { sender }, Mailbox { receiver })
}

/// Sending side of a mailbox. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Postbox {
    sender: mpsc::Sender<Message>,
}

impl Postbox {
    /// Enqueue a message without waiting.
    ///
    /// On failure the message is dropped, which releases its pool slot.
    ///
    /// # Errors
    ///
    /// Returns [`MailboxError::QueueFull`] or [`MailboxError::Disconnected`].
    pub fn post(&self, msg: Message) -> Result<(), MailboxError> {
        self.sender.try_send(msg).map_err(|err| match err {
            TrySendError::Full(_) => MailboxError::QueueFull,
            TrySendError::Closed(_) => MailboxError::Disconnected,
        })
    }

    /// Enqueue a message with a reply channel and wait for the receiver to
    /// respond.
    ///
    /// # Errors
    ///
    /// Returns the receiver's error status, or [`ServerError::Timeout`] if no
    /// response arrives within `timeout`, or [`ServerError::NoResponse`] if
    /// the receiver drops the message without responding.
    pub async fn post_sync(&self, mut msg: Message, timeout: Duration) -> Status {
        let reply = msg.attach_reply();
        self.post(msg)?;

        match tokio::time::timeout(timeout, reply).await {
            Ok(Ok(status)) => status,
            Ok(Err(_)) => Err(ServerError::NoResponse),
            Err(_) => Err(ServerError::Timeout),
        }
    }

    /// Whether the receiving side is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.sender.is_closed() }

    /// Whether both postboxes feed the same mailbox.
    #[must_use]
    pub fn same_mailbox(&self, other: &Self) -> bool { self.sender.same_channel(&other.sender) }
}

/// Receiving side of a mailbox, owned by exactly one task.
#[derive(Debug)]
pub struct Mailbox {
    receiver: mpsc::Receiver<Message>,
}

impl Mailbox {
    /// Take the next message.
    ///
    /// # Errors
    ///
    /// Returns [`MailboxError::WouldBlock`] when polling an empty queue,
    /// [`MailboxError::Timeout`] when a bounded wait expires, and
    /// [`MailboxError::Disconnected`] once the queue is empty and closed.
    pub async fn receive(&mut self, wait: Wait) -> Result<Message, MailboxError> {
        match wait {
            Wait::Forever => self.receiver.recv().await.ok_or(MailboxError::Disconnected),
            Wait::For(duration) => match tokio::time::timeout(duration, self.receiver.recv()).await
            {
                Ok(Some(msg)) => Ok(msg),
                Ok(None) => Err(MailboxError::Disconnected),
                Err(_) => Err(MailboxError::Timeout),
            },
            Wait::Poll => self.receiver.try_recv().map_err(|err| match err {
                TryRecvError::Empty => MailboxError::WouldBlock,
                TryRecvError::Disconnected => MailboxError::Disconnected,
            }),
        }
    }

    /// Destroy the queue: further posts fail, queued messages stay readable.
    pub fn close(&mut self) { self.receiver.close(); }

    /// Number of queued messages.
    #[must_use]
    pub fn pending(&self) -> usize { self.receiver.len() }
}

#[cfg(test)]
mod tests {
    use super::super::{MessageKind, MessagePool};
    use super::*;

    fn user(pool: &MessagePool, code: u32) -> Message {
        pool.alloc(MessageKind::User { code, param: 0 }).unwrap()
    }

    fn code_of(msg: &Message) -> u32 {
        match msg.kind {
            MessageKind::User { code, .. } => code,
            _ => panic!("unexpected message {}", msg.kind.name()),
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let pool = MessagePool::new(8);
        let (postbox, mut mailbox) = mailbox(8);
        for code in 0..3 {
            postbox.post(user(&pool, code)).unwrap();
        }
        for code in 0..3 {
            let msg = mailbox.receive(Wait::Forever).await.unwrap();
            assert_eq!(code_of(&msg), code);
        }
    }

    #[tokio::test]
    async fn test_full_queue_rejects_and_releases_slot() {
        let pool = MessagePool::new(4);
        let (postbox, _mailbox) = mailbox(1);
        postbox.post(user(&pool, 1)).unwrap();
        assert_eq!(postbox.post(user(&pool, 2)), Err(MailboxError::QueueFull));
        assert_eq!(pool.in_use(), 1);
    }

    #[tokio::test]
    async fn test_closed_queue_rejects() {
        let pool = MessagePool::new(4);
        let (postbox, mut mailbox) = mailbox(4);
        postbox.post(user(&pool, 1)).unwrap();
        mailbox.close();
        assert_eq!(postbox.post(user(&pool, 2)), Err(MailboxError::Disconnected));
        // Already queued messages survive the close.
        assert_eq!(code_of(&mailbox.receive(Wait::Poll).await.unwrap()), 1);
    }

    #[tokio::test]
    async fn test_poll_empty_would_block() {
        let (_postbox, mut mailbox) = mailbox(1);
        assert_eq!(mailbox.receive(Wait::Poll).await.unwrap_err(), MailboxError::WouldBlock);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_wait_times_out() {
        let (_postbox, mut mailbox) = mailbox(1);
        let result = mailbox.receive(Wait::For(Duration::from_millis(50))).await;
        assert_eq!(result.unwrap_err(), MailboxError::Timeout);
    }

    #[tokio::test]
    async fn test_receive_after_all_postboxes_dropped() {
        let (postbox, mut mailbox) = mailbox(1);
        drop(postbox);
        assert_eq!(mailbox.receive(Wait::Forever).await.unwrap_err(), MailboxError::Disconnected);
    }

    #[tokio::test]
    async fn test_post_sync_round_trip() {
        let pool = MessagePool::new(4);
        let (postbox, mut mailbox) = mailbox(4);

        let responder = tokio::spawn(async move {
            let mut msg = mailbox.receive(Wait::Forever).await.unwrap();
            let code = code_of(&msg);
            msg.respond(Ok(code * 2));
        });

        let status = postbox.post_sync(user(&pool, 21), Duration::from_secs(1)).await;
        assert_eq!(status, Ok(42));
        responder.await.unwrap();
        assert_eq!(pool.in_use(), 0);
    }

    #[tokio::test]
    async fn test_post_sync_without_respond() {
        let pool = MessagePool::new(4);
        let (postbox, mut mailbox) = mailbox(4);

        let consumer = tokio::spawn(async move {
            let msg = mailbox.receive(Wait::Forever).await.unwrap();
            drop(msg);
        });

        let status = postbox.post_sync(user(&pool, 1), Duration::from_secs(1)).await;
        assert_eq!(status, Err(ServerError::NoResponse));
        consumer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_post_sync_times_out() {
        let pool = MessagePool::new(4);
        let (postbox, _mailbox) = mailbox(4);
        let status = postbox.post_sync(user(&pool, 1), Duration::from_millis(100)).await;
        assert_eq!(status, Err(ServerError::Timeout));
    }
}
