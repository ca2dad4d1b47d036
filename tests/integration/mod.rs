//! Integration test modules for midihub

pub mod errors;
pub mod hub;
pub mod sessions;

#[cfg(feature = "bridge")]
pub mod bridge;
