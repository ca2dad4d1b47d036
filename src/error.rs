//! Centralized error type for the midihub umbrella crate.
//!
//! Wraps all subsystem errors so `?` propagates naturally across crate boundaries.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Session: {0}")]
    Journal(#[from] midihub_journal::Error),

    #[error("Hub: {0}")]
    Daemon(#[from] midihub_daemon::Error),

    #[cfg(feature = "bridge")]
    #[error("Bridge: {0}")]
    Bridge(#[from] midihub_bridge::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
