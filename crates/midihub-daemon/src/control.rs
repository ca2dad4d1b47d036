//! Signal handling.
//!
//! Signal handlers never touch hub state. They post a [`ControlRequest`] on a
//! single-slot channel that the orchestrator drains between cycles.

use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::Signals;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlRequest {
    /// Re-read the ports file.
    Reload,
    Shutdown,
}

/// A single-slot request channel.
pub fn control_channel() -> (Sender<ControlRequest>, Receiver<ControlRequest>) {
    bounded(1)
}

/// Post `request`, dropping it if one is already pending.
pub fn post(tx: &Sender<ControlRequest>, request: ControlRequest) -> bool {
    match tx.try_send(request) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            tracing::debug!("{:?} already pending", request);
            false
        }
        Err(TrySendError::Disconnected(_)) => false,
    }
}

fn request_for(signal: i32) -> Option<ControlRequest> {
    match signal {
        SIGHUP => Some(ControlRequest::Reload),
        SIGINT | SIGTERM => Some(ControlRequest::Shutdown),
        _ => None,
    }
}

/// Forward SIGHUP, SIGINT and SIGTERM to `tx` from a background thread.
pub fn install_signal_handlers(tx: Sender<ControlRequest>) -> Result<()> {
    let mut signals = Signals::new([SIGHUP, SIGINT, SIGTERM])?;
    thread::Builder::new()
        .name("midihub-signals".into())
        .spawn(move || {
            for signal in signals.forever() {
                let Some(request) = request_for(signal) else {
                    continue;
                };
                if request == ControlRequest::Shutdown {
                    tracing::info!("Interrupt - stopping");
                    // Blocks behind a pending reload; the loop drains it.
                    let _ = tx.send(request);
                    break;
                }
                post(&tx, request);
            }
        })?;
    Ok(())
}
