//! Participant and latency reporting.
//!
//! The hub only produces keyed records. Aggregation and storage belong to
//! whatever consumes the [`ReportSink`].

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::topology::HubClient;

/// Record key of the participant snapshot.
pub const PARTICIPANTS_KEY: &str = "Participants";

const LATENCY_PATTERN: &str = r"Latency (.+?): (-?\d+(?:\.\d+)?) ms";

/// Display names of everyone connected, keyed by hub port.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantSnapshot {
    pub ports: BTreeMap<u16, Vec<String>>,
}

impl ParticipantSnapshot {
    pub fn from_clients(clients: &[HubClient]) -> Self {
        let mut ports: BTreeMap<u16, Vec<String>> = BTreeMap::new();
        for client in clients {
            let Some(port) = client.hub_port() else {
                tracing::debug!("Client {} ({}) is not a hub daemon", client.id, client.name);
                continue;
            };
            ports
                .entry(port)
                .or_default()
                .extend(client.participants.iter().map(|p| p.name.clone()));
        }
        Self { ports }
    }

    pub fn participant_count(&self) -> usize {
        self.ports.values().map(Vec::len).sum()
    }
}

/// One latency sample from a daemon log.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    pub client: String,
    pub millis: f64,
}

/// Aggregated latency for one `<client>-<port>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub client_id: String,
    pub last: f64,
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Unix seconds.
    pub timestamp: u64,
}

#[derive(Debug, Clone)]
struct Accumulator {
    last: f64,
    sum: f64,
    count: u32,
    max: f64,
    min: f64,
}

impl Accumulator {
    fn new(value: f64) -> Self {
        Self {
            last: value,
            sum: value,
            count: 1,
            max: value,
            min: value,
        }
    }

    fn push(&mut self, value: f64) {
        self.last = value;
        self.sum += value;
        self.count += 1;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
    }

    fn stats(&self, client_id: &str, timestamp: u64) -> LatencyStats {
        let average = self.sum / f64::from(self.count);
        LatencyStats {
            client_id: client_id.to_string(),
            last: self.last,
            average: (average * 10.0).round() / 10.0,
            max: self.max,
            min: self.min,
            timestamp,
        }
    }
}

/// Tails daemon logs and aggregates their latency lines.
#[derive(Debug)]
pub struct LatencyCollector {
    pattern: Regex,
    offsets: HashMap<PathBuf, u64>,
    stats: BTreeMap<String, Accumulator>,
}

impl LatencyCollector {
    pub fn new() -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(LATENCY_PATTERN).map_err(|e| Error::Config(e.to_string()))?,
            offsets: HashMap::new(),
            stats: BTreeMap::new(),
        })
    }

    /// Extract a sample from a `... Latency <client>: <value> ms ...` line.
    pub fn parse_line(&self, line: &str) -> Option<LatencySample> {
        let caps = self.pattern.captures(line)?;
        let millis = caps[2].parse().ok()?;
        Some(LatencySample {
            client: caps[1].trim().to_string(),
            millis,
        })
    }

    pub fn record(&mut self, port: u16, sample: LatencySample) {
        let key = format!("{}-{}", sample.client, port);
        self.stats
            .entry(key)
            .and_modify(|acc| acc.push(sample.millis))
            .or_insert_with(|| Accumulator::new(sample.millis));
    }

    /// Read whatever `path` gained since the last call. Returns the number
    /// of samples recorded. A partial trailing line is left for next time.
    pub fn collect(&mut self, port: u16, path: &Path) -> Result<usize> {
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len();
        let mut offset = self.offsets.get(path).copied().unwrap_or(0);
        if len < offset {
            tracing::info!("{} was truncated - rereading", path.display());
            offset = 0;
        }
        file.seek(SeekFrom::Start(offset))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        let complete = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
        self.offsets.insert(path.to_path_buf(), offset + complete as u64);

        let text = String::from_utf8_lossy(&bytes[..complete]);
        let mut recorded = 0;
        for line in text.lines().filter(|line| line.contains("Latency")) {
            match self.parse_line(line) {
                Some(sample) => {
                    self.record(port, sample);
                    recorded += 1;
                }
                None => tracing::warn!("No latency info found in {:?} - ignoring", line),
            }
        }
        Ok(recorded)
    }

    pub fn stats(&self) -> Vec<LatencyStats> {
        let timestamp = unix_now();
        self.stats
            .iter()
            .map(|(key, acc)| acc.stats(key, timestamp))
            .collect()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Consumer of hub reports.
pub trait ReportSink {
    fn put_participants(&mut self, snapshot: &ParticipantSnapshot) -> Result<()>;
    fn put_latency(&mut self, stats: &LatencyStats) -> Result<()>;
}

/// Writes each record as `<key>.json` in a directory.
#[derive(Debug, Clone)]
pub struct JsonDirSink {
    dir: PathBuf,
}

impl JsonDirSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() || "-_ .".contains(c) { c } else { '_' })
            .collect();
        self.dir.join(format!("{file}.json"))
    }

    fn write<T: Serialize>(&self, key: &str, record: &T) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(record)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl ReportSink for JsonDirSink {
    fn put_participants(&mut self, snapshot: &ParticipantSnapshot) -> Result<()> {
        self.write(PARTICIPANTS_KEY, snapshot)
    }

    fn put_latency(&mut self, stats: &LatencyStats) -> Result<()> {
        self.write(&stats.client_id, stats)
    }
}
