//! Application side of the protocol.
//!
//! An [`AppHandle`] is the per-task identity shared with the server; an
//! [`Application`] owns the task's mailbox and runs its receive loop,
//! dispatching every message to an [`EventHandler`].

mod handle;
mod runtime;

pub use handle::{AppHandle, AppId, RunState};
pub use runtime::{AppClient, Application, EventHandler};
