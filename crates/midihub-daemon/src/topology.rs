//! Participant discovery from the sequencer's client/port listing.
//!
//! The listing looks like `aconnect -l` output:
//!
//! ```text
//! client 128: 'midiHub-5004' [type=user,pid=4242]
//!     0 'Network         '
//!         Connecting To: 129:0
//!     1 'alice'
//!     2 'bob'
//! ```

use regex::Regex;
use serde::Serialize;

use crate::config::HUB_NAME_PREFIX;
use crate::error::{Error, Result};
use crate::host::SequencerGraph;

/// Clients below this id belong to the kernel and system services.
pub const FIRST_USER_CLIENT: u32 = 128;

const CLIENT_PATTERN: &str = r"^client (\d+): '([^']*)'";
const PARTICIPANT_PATTERN: &str = r"^\s*(\d+)\s+'([^']*)'";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParticipantRef {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubClient {
    pub id: u32,
    pub name: String,
    pub participants: Vec<ParticipantRef>,
}

impl HubClient {
    fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
            participants: Vec::new(),
        }
    }

    fn add(&mut self, participant: ParticipantRef) {
        if !self.participants.iter().any(|p| p.id == participant.id) {
            self.participants.push(participant);
        }
    }

    /// UDP port of the hub daemon owning this client, taken from the
    /// trailing number of a `midiHub-...<port>` name.
    pub fn hub_port(&self) -> Option<u16> {
        if !self.name.starts_with(HUB_NAME_PREFIX) {
            return None;
        }
        let head = self.name.trim_end_matches(|c: char| c.is_ascii_digit());
        self.name[head.len()..].parse().ok()
    }

    /// Whether there is anyone to mesh together.
    pub fn is_meshable(&self) -> bool {
        self.participants.len() > 1
    }
}

fn is_excluded(line: &str) -> bool {
    line.contains("Connect") || line.contains("Announce") || line.contains(HUB_NAME_PREFIX)
}

/// Finds hub clients with participants worth meshing.
#[derive(Debug, Clone)]
pub struct TopologyDiscoverer {
    client: Regex,
    participant: Regex,
}

impl TopologyDiscoverer {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::TopologyQuery(e.to_string()))
        };
        Ok(Self {
            client: compile(CLIENT_PATTERN)?,
            participant: compile(PARTICIPANT_PATTERN)?,
        })
    }

    /// Parse a listing into every user client and its eligible participants.
    pub fn parse(&self, listing: &str) -> Vec<HubClient> {
        let mut clients: Vec<HubClient> = Vec::new();
        // `None` while inside a block that is being skipped.
        let mut current: Option<HubClient> = None;

        for line in listing.lines() {
            tracing::debug!("Line: {}", line);

            if line.starts_with("client ") {
                clients.extend(current.take());
                let Some(caps) = self.client.captures(line) else {
                    tracing::warn!("Did not see client id in {} - skipping", line);
                    continue;
                };
                let Ok(id) = caps[1].parse::<u32>() else {
                    tracing::warn!("Client id out of range in {} - skipping", line);
                    continue;
                };
                if id >= FIRST_USER_CLIENT {
                    current = Some(HubClient::new(id, &caps[2]));
                }
                continue;
            }

            let Some(client) = current.as_mut() else {
                continue;
            };
            if line.trim().is_empty() || is_excluded(line) {
                continue;
            }

            let parsed = self.participant.captures(line).and_then(|caps| {
                Some((caps[1].parse::<u32>().ok()?, caps[2].trim().to_string()))
            });
            match parsed {
                Some((0, _)) => {}
                Some((id, name)) => client.add(ParticipantRef { id, name }),
                None => tracing::warn!("Did not see participant info in {} - skipping", line),
            }
        }
        clients.extend(current);

        clients
    }

    /// Every user client, including those with zero or one participant.
    pub fn snapshot(&self, graph: &mut dyn SequencerGraph) -> Result<Vec<HubClient>> {
        let listing = graph.participant_graph()?;
        Ok(self.parse(&listing))
    }

    /// Clients with more than one participant.
    pub fn discover(&self, graph: &mut dyn SequencerGraph) -> Result<Vec<HubClient>> {
        Ok(meshable(self.snapshot(graph)?))
    }
}

pub fn meshable(clients: Vec<HubClient>) -> Vec<HubClient> {
    clients.into_iter().filter(HubClient::is_meshable).collect()
}
