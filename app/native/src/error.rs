//! Error types for Winserve.
//!
//! [`ServerError`] is the status code carried in every reply from the window
//! server. It is `Copy` so it can travel through the shared reply channel
//! without allocation. [`CliError`] wraps it for the command line.

use serde::Serialize;
use thiserror::Error;

use crate::region::RegionError;

/// Status codes returned by the window server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ServerError {
    /// The fixed-size message pool has no free slots.
    #[error("message pool exhausted")]
    PoolExhausted,
    /// Region storage could not grow.
    #[error("region storage exhausted")]
    RegionAlloc,
    /// The window id is not present in the forest.
    #[error("window not found")]
    WindowNotFound,
    /// A window with this id already exists.
    #[error("window already exists")]
    WindowExists,
    /// The requested parent window is not present in the forest.
    #[error("parent window not found")]
    ParentNotFound,
    /// An ancestor of the window is hidden.
    #[error("an ancestor window is not shown")]
    AncestorHidden,
    /// The window must be shown for this operation.
    #[error("window is not shown")]
    NotShown,
    /// A modal session blocks the window.
    #[error("window is blocked by a modal session")]
    BlockedByModal,
    /// The sender neither owns the window nor is the window manager.
    #[error("permission denied")]
    PermissionDenied,
    /// Another application is already registered as window manager.
    #[error("a window manager is already registered")]
    WindowManagerExists,
    /// The sender has not connected to the server.
    #[error("unknown application")]
    UnknownApp,
    /// The destination queue is full.
    #[error("destination queue is full")]
    QueueFull,
    /// The destination queue is gone.
    #[error("destination queue is closed")]
    Disconnected,
    /// A synchronous round-trip did not complete in time.
    #[error("request timed out")]
    Timeout,
    /// The receiver dropped the request without responding.
    #[error("receiver did not respond")]
    NoResponse,
    /// The message kind is not handled by the receiver.
    #[error("unsupported message")]
    Unsupported,
}

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

impl From<RegionError> for ServerError {
    fn from(_: RegionError) -> Self { Self::RegionAlloc }
}

/// Errors surfaced by the command line.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// A request to the window server failed.
    #[error("Server error: {0}")]
    ServerError(ServerError),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<ServerError> for CliError {
    fn from(err: ServerError) -> Self { Self::ServerError(err) }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}
