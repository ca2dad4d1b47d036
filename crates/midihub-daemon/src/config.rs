//! Hub configuration.
//!
//! Loaded from environment variables with defaults matching a stock
//! `rtpmidid` checkout next to the working directory.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default path to the RTP-MIDI daemon binary.
pub const DEFAULT_DAEMON_PATH: &str = "rtpmidid/build/src/rtpmidid";

/// Default port configuration file.
pub const DEFAULT_PORTS_FILE: &str = "midiports";

/// Default supervision and discovery interval in seconds.
pub const DEFAULT_INTERVAL_SECONDS: u64 = 5;

/// Prefix of every daemon display name. Participants carrying it are other
/// hub daemons, never remote musicians.
pub const HUB_NAME_PREFIX: &str = "midiHub";

#[derive(Debug, Clone)]
pub struct HubConfig {
    pub daemon_path: PathBuf,
    pub ports_file: PathBuf,
    /// Directory holding per-port logs and control sockets.
    pub work_dir: PathBuf,
    pub interval: Duration,
    /// Human readable location inserted into display names.
    pub location: Option<String>,
    /// Enables the JSON report sink when set.
    pub report_dir: Option<PathBuf>,
    pub check_kernel_modules: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            daemon_path: PathBuf::from(DEFAULT_DAEMON_PATH),
            ports_file: PathBuf::from(DEFAULT_PORTS_FILE),
            work_dir: PathBuf::from("."),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECONDS),
            location: None,
            report_dir: None,
            check_kernel_modules: true,
        }
    }
}

impl HubConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let defaults = Self::default();

        let interval = match vars.get("MIDIHUB_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    Error::Config(format!("MIDIHUB_INTERVAL_SECS must be a number, got {raw:?}"))
                })?;
                if secs == 0 {
                    return Err(Error::Config(
                        "MIDIHUB_INTERVAL_SECS must be at least 1".to_string(),
                    ));
                }
                Duration::from_secs(secs)
            }
            None => defaults.interval,
        };

        let check_kernel_modules = match vars.get("MIDIHUB_SKIP_MODULE_CHECK").map(|s| s.trim()) {
            None | Some("") | Some("0") | Some("false") => true,
            Some("1") | Some("true") => false,
            Some(other) => {
                return Err(Error::Config(format!(
                    "MIDIHUB_SKIP_MODULE_CHECK must be true/false, got {other:?}"
                )))
            }
        };

        Ok(Self {
            daemon_path: vars
                .get("MIDIHUB_DAEMON")
                .map(PathBuf::from)
                .unwrap_or(defaults.daemon_path),
            ports_file: vars
                .get("MIDIHUB_PORTS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.ports_file),
            work_dir: vars
                .get("MIDIHUB_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            interval,
            location: vars
                .get("MIDIHUB_LOCATION")
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            report_dir: vars.get("MIDIHUB_REPORT_DIR").map(PathBuf::from),
            check_kernel_modules,
        })
    }

    /// File name of the daemon binary, as it shows up in the process table.
    pub fn daemon_name(&self) -> String {
        self.daemon_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.daemon_path.to_string_lossy().into_owned())
    }

    pub fn log_path(&self, port: u16) -> PathBuf {
        self.work_dir.join(format!("output-{port}.log"))
    }

    pub fn control_socket(&self, port: u16) -> PathBuf {
        self.work_dir.join(format!("control-{port}.sock"))
    }

    /// `midiHub-<location>-<port>`, or `midiHub-<port>` without a location.
    pub fn display_name(&self, port: u16) -> String {
        match &self.location {
            Some(location) => format!("{HUB_NAME_PREFIX}-{location}-{port}"),
            None => format!("{HUB_NAME_PREFIX}-{port}"),
        }
    }
}
