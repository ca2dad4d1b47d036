//! Host adapters.
//!
//! Everything the hub learns from or does to the host goes through one of
//! these traits, so supervision and discovery can run against fakes in tests.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use sysinfo::System;

use crate::error::{Error, Result};

/// One row of the host process table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
    /// Full command line, arguments joined by spaces.
    pub cmdline: String,
}

impl ProcessEntry {
    pub fn new(pid: u32, name: impl Into<String>, cmdline: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            cmdline: cmdline.into(),
        }
    }

    /// Whether any whitespace separated argument equals `token`.
    pub fn has_arg(&self, token: &str) -> bool {
        self.cmdline.split_whitespace().any(|arg| arg == token)
    }
}

pub trait ProcessTable {
    fn list_processes(&mut self) -> Vec<ProcessEntry>;
}

/// Everything needed to start one daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonSpec {
    pub program: PathBuf,
    pub port: u16,
    pub control_socket: PathBuf,
    pub display_name: String,
    pub log_path: PathBuf,
}

impl DaemonSpec {
    /// `--port <N> --control <socket> --name <display name>`
    pub fn args(&self) -> Vec<String> {
        vec![
            "--port".to_string(),
            self.port.to_string(),
            "--control".to_string(),
            self.control_socket.to_string_lossy().into_owned(),
            "--name".to_string(),
            self.display_name.clone(),
        ]
    }
}

/// A daemon started by this hub.
#[derive(Debug)]
pub struct DaemonProcess {
    pub port: u16,
    pub pid: u32,
    pub log_path: PathBuf,
    child: Option<Child>,
}

impl DaemonProcess {
    pub fn new(port: u16, pid: u32, log_path: PathBuf) -> Self {
        Self {
            port,
            pid,
            log_path,
            child: None,
        }
    }

    pub fn with_child(mut self, child: Child) -> Self {
        self.child = Some(child);
        self
    }

    /// Collect the exit status if the child has finished.
    ///
    /// Returns `true` once the process is gone. Handles without a child
    /// (started elsewhere) are never reaped here.
    pub fn try_reap(&mut self) -> bool {
        let Some(child) = self.child.as_mut() else {
            return false;
        };
        match child.try_wait() {
            Ok(Some(status)) => {
                tracing::info!("Daemon on port {} (pid {}) exited: {}", self.port, self.pid, status);
                self.child = None;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!("Could not poll daemon pid {}: {}", self.pid, e);
                false
            }
        }
    }
}

pub trait DaemonLauncher {
    fn spawn(&mut self, spec: &DaemonSpec) -> Result<DaemonProcess>;
}

pub trait SequencerGraph {
    /// Textual client/port listing (`aconnect -l` format).
    fn participant_graph(&mut self) -> Result<String>;

    /// Connect `client:source` to `client:destination`.
    fn connect(&mut self, client: u32, source: u32, destination: u32) -> Result<()>;
}

pub trait KernelModules {
    fn is_available(&mut self, module: &str) -> bool;
}

/// Process table backed by `sysinfo`.
pub struct SysinfoProcessTable {
    system: System,
}

impl SysinfoProcessTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoProcessTable {
    fn list_processes(&mut self) -> Vec<ProcessEntry> {
        self.system.refresh_processes();
        self.system
            .processes()
            .iter()
            .map(|(pid, process)| {
                ProcessEntry::new(pid.as_u32(), process.name(), process.cmd().join(" "))
            })
            .collect()
    }
}

/// Starts daemons as detached children with stdout appended to their log.
#[derive(Debug, Default)]
pub struct CommandLauncher;

impl DaemonLauncher for CommandLauncher {
    fn spawn(&mut self, spec: &DaemonSpec) -> Result<DaemonProcess> {
        let spawn_error = |reason: String| Error::Spawn {
            port: spec.port,
            reason,
        };

        let log = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&spec.log_path)
            .map_err(|e| spawn_error(format!("{}: {}", spec.log_path.display(), e)))?;

        let child = Command::new(&spec.program)
            .args(spec.args())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| spawn_error(e.to_string()))?;

        let pid = child.id();
        Ok(DaemonProcess::new(spec.port, pid, spec.log_path.clone()).with_child(child))
    }
}

/// ALSA sequencer access through the `aconnect` tool.
#[derive(Debug, Clone)]
pub struct AconnectGraph {
    program: PathBuf,
}

impl AconnectGraph {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("aconnect"),
        }
    }

    pub fn with_program(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
        }
    }
}

impl Default for AconnectGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SequencerGraph for AconnectGraph {
    fn participant_graph(&mut self) -> Result<String> {
        let output = Command::new(&self.program)
            .arg("-l")
            .stderr(Stdio::null())
            .output()
            .map_err(|e| Error::TopologyQuery(e.to_string()))?;
        if !output.status.success() {
            return Err(Error::TopologyQuery(format!(
                "{} -l exited with {}",
                self.program.display(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn connect(&mut self, client: u32, source: u32, destination: u32) -> Result<()> {
        let status = Command::new(&self.program)
            .arg(format!("{client}:{source}"))
            .arg(format!("{client}:{destination}"))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| Error::Connect {
                client,
                source_id: source,
                destination,
                reason: e.to_string(),
            })?;

        // Non-zero exit means the edge already exists.
        if !status.success() {
            tracing::debug!(
                "aconnect {}:{} {}:{} exited with {}",
                client,
                source,
                client,
                destination,
                status
            );
        }
        Ok(())
    }
}

/// Kernel module lookup through `modinfo`.
#[derive(Debug, Clone)]
pub struct ModinfoModules {
    program: PathBuf,
}

impl ModinfoModules {
    pub fn new() -> Self {
        Self {
            program: PathBuf::from("/usr/sbin/modinfo"),
        }
    }
}

impl Default for ModinfoModules {
    fn default() -> Self {
        Self::new()
    }
}

impl KernelModules for ModinfoModules {
    fn is_available(&mut self, module: &str) -> bool {
        match Command::new(&self.program).arg(module).output() {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                output.status.success()
                    && !stdout.contains("not found")
                    && !stderr.contains("not found")
            }
            Err(e) => {
                tracing::warn!("Could not run {}: {}", self.program.display(), e);
                false
            }
        }
    }
}
