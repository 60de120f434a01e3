//! Messaging layer.
//!
//! Every application owns a bounded [`Mailbox`]; anyone holding its
//! [`Postbox`] can enqueue messages. Two send patterns exist:
//!
//! - **post**: enqueue and return immediately.
//! - **post-sync**: attach a reply channel, enqueue, and wait (bounded by a
//!   timeout) until the receiver responds with a [`Status`] word.
//!
//! Message storage comes from a fixed-size [`MessagePool`]. A message holds
//! its pool slot until it is dropped, so exactly one consumer ever releases
//! it, and a sender can never block on memory.

mod mailbox;
mod message;
mod pool;
mod timer;

pub use mailbox::{Mailbox, MailboxError, Postbox, Wait, mailbox};
pub use message::{
    Envelope, InputEvent, Message, MessageKind, MouseButton, Status, WindowId, WmEventKind,
};
pub use pool::MessagePool;
pub use timer::{Timer, TimerId, TimerMode, TimerState, TimerTicket};
