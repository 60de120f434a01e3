//! Winserve - a window server for small devices.
//!
//! Applications talk to the server through fixed-size message pools and
//! bounded mailboxes. The server keeps a forest of top-level windows,
//! computes each window's visible clip region, tracks focus and modal
//! sessions, routes input and flushes damage to a graphics device.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod messaging;
pub mod region;
pub mod schema;
pub mod server;
pub mod topwin;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "WINSERVE_LOG";

/// Install the global tracing subscriber, writing to stderr.
///
/// `WINSERVE_LOG` takes precedence over `default_level`. Later calls are
/// ignored.
pub fn init_logging(default_level: &str) {
    let filter = std::env::var(LOG_ENV).unwrap_or_else(|_| default_level.to_string());
    let filter = tracing_subscriber::EnvFilter::try_new(&filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
