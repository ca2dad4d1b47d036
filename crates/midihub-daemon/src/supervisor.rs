//! Keeps exactly one daemon alive per configured port.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::HubConfig;
use crate::host::{DaemonLauncher, DaemonProcess, DaemonSpec, ProcessEntry, ProcessTable};
use crate::ports::PortConfig;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Ports that already had a live daemon.
    pub running: Vec<u16>,
    pub spawned: Vec<u16>,
    pub failed: Vec<u16>,
}

impl ReconcileSummary {
    pub fn spawn_requests(&self) -> usize {
        self.spawned.len() + self.failed.len()
    }
}

pub struct ProcessSupervisor {
    program: PathBuf,
    daemon_name: String,
    config: HubConfig,
    daemons: BTreeMap<u16, DaemonProcess>,
}

impl ProcessSupervisor {
    pub fn new(config: &HubConfig) -> Self {
        Self {
            program: config.daemon_path.clone(),
            daemon_name: config.daemon_name(),
            config: config.clone(),
            daemons: BTreeMap::new(),
        }
    }

    pub fn spec_for(&self, port: u16) -> DaemonSpec {
        DaemonSpec {
            program: self.program.clone(),
            port,
            control_socket: self.config.control_socket(port),
            display_name: self.config.display_name(port),
            log_path: self.config.log_path(port),
        }
    }

    /// A process belongs to `port` if it is our daemon binary and one of its
    /// arguments is the port number.
    fn serves_port(&self, entry: &ProcessEntry, port: &str) -> bool {
        let is_daemon = entry.name == self.daemon_name
            || entry
                .cmdline
                .split_whitespace()
                .next()
                .is_some_and(|argv0| argv0.rsplit('/').next() == Some(self.daemon_name.as_str()));
        is_daemon && entry.has_arg(port)
    }

    /// Spawn a daemon for every configured port that has no live process.
    ///
    /// Failed spawns are logged and retried on the next call.
    pub fn reconcile(
        &mut self,
        ports: &PortConfig,
        processes: &mut dyn ProcessTable,
        launcher: &mut dyn DaemonLauncher,
    ) -> ReconcileSummary {
        self.daemons.retain(|_, daemon| !daemon.try_reap());

        let live = processes.list_processes();
        let mut summary = ReconcileSummary::default();

        for port in ports.port_numbers() {
            let token = port.to_string();
            if live.iter().any(|entry| self.serves_port(entry, &token)) {
                summary.running.push(port);
                continue;
            }

            tracing::warn!("Midi daemon on port {} not running - starting", port);
            let spec = self.spec_for(port);
            match launcher.spawn(&spec) {
                Ok(daemon) => {
                    tracing::info!(
                        "Started {} on port {} (pid {}, log {})",
                        spec.display_name,
                        port,
                        daemon.pid,
                        daemon.log_path.display()
                    );
                    self.daemons.insert(port, daemon);
                    summary.spawned.push(port);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    summary.failed.push(port);
                }
            }
        }

        summary
    }

    /// Daemons started by this supervisor that have not been reaped.
    pub fn daemons(&self) -> impl Iterator<Item = &DaemonProcess> {
        self.daemons.values()
    }
}
