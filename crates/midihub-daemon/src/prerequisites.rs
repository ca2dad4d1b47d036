//! Startup checks run before the orchestrator loop.

use crate::config::HubConfig;
use crate::error::{Error, Result};
use crate::host::{KernelModules, ProcessTable};

/// Kernel modules the daemons need for their virtual sequencer ports.
pub const REQUIRED_MODULES: [&str; 2] = ["soundcore", "snd-dummy"];

/// Fail if a required kernel module or the daemon binary is missing.
pub fn check_prerequisites(config: &HubConfig, modules: &mut dyn KernelModules) -> Result<()> {
    if config.check_kernel_modules {
        for module in REQUIRED_MODULES {
            tracing::debug!("Checking for {} module", module);
            if !modules.is_available(module) {
                return Err(Error::KernelModuleMissing(module.to_string()));
            }
        }
    }

    tracing::debug!("Checking for MIDI daemon code");
    if !config.daemon_path.is_file() {
        return Err(Error::DaemonNotFound(config.daemon_path.clone()));
    }
    Ok(())
}

/// Whether another process with our executable name is alive.
pub fn already_running(processes: &mut dyn ProcessTable, own_name: &str, own_pid: u32) -> bool {
    tracing::debug!("Checking to see if we are already running");
    processes
        .list_processes()
        .iter()
        .any(|p| p.pid != own_pid && p.name == own_name)
}
