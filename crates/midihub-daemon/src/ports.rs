//! The set of UDP ports the hub services.
//!
//! The `midiports` file holds either a comma-separated list of ports
//! (`5004,5006`) or a JSON object of named receive/send pairs
//! (`{"GroupOne": [5140, 5142]}`). The set is replaced wholesale on reload and
//! a bad file never replaces a good configuration.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ports serviced when no `midiports` file exists.
pub const DEFAULT_PORTS: [u16; 2] = [5004, 5006];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortSpec {
    pub port: u16,
    pub group: Option<String>,
}

impl PortSpec {
    pub fn new(port: u16) -> Self {
        Self { port, group: None }
    }

    pub fn grouped(port: u16, group: impl Into<String>) -> Self {
        Self {
            port,
            group: Some(group.into()),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.group {
            Some(group) => write!(f, "{}({})", self.port, group),
            None => write!(f, "{}", self.port),
        }
    }
}

/// Explicit receive-port to send-port pairing for a named group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortPair {
    pub group: String,
    pub receive: u16,
    pub send: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    ports: Vec<PortSpec>,
    pairs: Vec<PortPair>,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            ports: DEFAULT_PORTS.iter().copied().map(PortSpec::new).collect(),
            pairs: Vec::new(),
        }
    }
}

impl PortConfig {
    /// Parse the contents of a ports file.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.starts_with('{') {
            Self::parse_groups(text)
        } else {
            Self::parse_list(text)
        }
    }

    fn parse_list(text: &str) -> Result<Self> {
        let mut ports = Vec::new();
        for entry in text.split(',') {
            let port = parse_port(entry.trim())?;
            if !ports.iter().any(|p: &PortSpec| p.port == port) {
                ports.push(PortSpec::new(port));
            }
        }
        Ok(Self {
            ports,
            pairs: Vec::new(),
        })
    }

    fn parse_groups(text: &str) -> Result<Self> {
        let groups: BTreeMap<String, Vec<u16>> = serde_json::from_str(text)?;
        if groups.is_empty() {
            return Err(Error::Config("ports file has no groups".to_string()));
        }

        let mut ports = Vec::new();
        let mut pairs = Vec::new();
        for (group, members) in groups {
            let &[receive, send] = members.as_slice() else {
                return Err(Error::Config(format!(
                    "group {group} must list exactly [receive, send], got {members:?}"
                )));
            };
            for port in [receive, send] {
                if port == 0 {
                    return Err(Error::Config(format!("group {group} uses port 0")));
                }
                if ports.iter().any(|p: &PortSpec| p.port == port) {
                    return Err(Error::Config(format!("port {port} listed twice")));
                }
                ports.push(PortSpec::grouped(port, group.clone()));
            }
            pairs.push(PortPair {
                group,
                receive,
                send,
            });
        }
        Ok(Self { ports, pairs })
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("No ports file found - using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Re-read `path`, keeping the current set if the file is bad.
    ///
    /// Returns `true` when the port set changed.
    pub fn reload(&mut self, path: &Path) -> bool {
        match Self::load(path) {
            Ok(fresh) => {
                let changed = fresh != *self;
                *self = fresh;
                tracing::info!("MIDI ports: {}", self);
                changed
            }
            Err(e) => {
                tracing::warn!("Got error {} - ports file badly formatted? Keeping {}", e, self);
                false
            }
        }
    }

    pub fn ports(&self) -> &[PortSpec] {
        &self.ports
    }

    pub fn port_numbers(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().map(|p| p.port)
    }

    pub fn pairs(&self) -> &[PortPair] {
        &self.pairs
    }

    pub fn contains(&self, port: u16) -> bool {
        self.ports.iter().any(|p| p.port == port)
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ports: Vec<String> = self.ports.iter().map(|p| p.to_string()).collect();
        write!(f, "[{}]", ports.join(", "))
    }
}

fn parse_port(text: &str) -> Result<u16> {
    match text.parse::<u16>() {
        Ok(0) => Err(Error::Config("port 0 is not a valid UDP port".to_string())),
        Ok(port) => Ok(port),
        Err(_) => Err(Error::Config(format!("{text:?} is not a UDP port"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_list() {
        let config = PortConfig::parse("5004, 5006,5008\n").unwrap();
        assert_eq!(config.port_numbers().collect::<Vec<_>>(), vec![5004, 5006, 5008]);
        assert!(config.pairs().is_empty());
    }

    #[test]
    fn test_parse_list_dedupes() {
        let config = PortConfig::parse("5004,5004").unwrap();
        assert_eq!(config.ports().len(), 1);
    }

    #[test]
    fn test_parse_groups() {
        let config =
            PortConfig::parse(r#"{"GroupOne": [5140, 5142], "GroupTwo": [5150, 5152]}"#).unwrap();
        assert_eq!(
            config.port_numbers().collect::<Vec<_>>(),
            vec![5140, 5142, 5150, 5152]
        );
        assert_eq!(config.ports()[0], PortSpec::grouped(5140, "GroupOne"));
        assert_eq!(
            config.pairs()[1],
            PortPair {
                group: "GroupTwo".to_string(),
                receive: 5150,
                send: 5152
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(PortConfig::parse("").is_err());
        assert!(PortConfig::parse("5004,,5006").is_err());
        assert!(PortConfig::parse("5004,abc").is_err());
        assert!(PortConfig::parse("70000").is_err());
        assert!(PortConfig::parse("0").is_err());
        assert!(PortConfig::parse(r#"{"G": [5140]}"#).is_err());
        assert!(PortConfig::parse(r#"{"G": [5140, 5142], "H": [5142, 5144]}"#).is_err());
        assert!(PortConfig::parse("{not json").is_err());
        assert!(PortConfig::parse("{}").is_err());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = PortConfig::load(&dir.path().join("midiports")).unwrap();
        assert_eq!(config, PortConfig::default());
        assert_eq!(config.port_numbers().collect::<Vec<_>>(), DEFAULT_PORTS.to_vec());
    }

    #[test]
    fn test_reload_keeps_previous_on_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midiports");

        std::fs::write(&path, "6000,6002").unwrap();
        let mut config = PortConfig::default();
        assert!(config.reload(&path));
        assert_eq!(config.port_numbers().collect::<Vec<_>>(), vec![6000, 6002]);

        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"6000,six thousand").unwrap();
        drop(file);
        assert!(!config.reload(&path));
        assert_eq!(config.port_numbers().collect::<Vec<_>>(), vec![6000, 6002]);
    }

    #[test]
    fn test_reload_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("midiports");
        std::fs::write(&path, "5004,5006").unwrap();
        let mut config = PortConfig::default();
        assert!(!config.reload(&path));
    }
}
