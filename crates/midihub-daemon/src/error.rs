//! Error types for the hub daemon.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("MIDI daemon not found at {0}")]
    DaemonNotFound(PathBuf),

    #[error("Kernel module {0} not found")]
    KernelModuleMissing(String),

    #[error("Failed to spawn daemon for port {port}: {reason}")]
    Spawn { port: u16, reason: String },

    #[error("Connect {client}:{source_id} -> {client}:{destination} failed: {reason}")]
    Connect {
        client: u32,
        source_id: u32,
        destination: u32,
        reason: String,
    },

    #[error("Topology query failed: {0}")]
    TopologyQuery(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
