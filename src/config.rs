//! Static cluster membership.
//!
//! The membership file lists one participant per line as `<id> <host> <port>`.
//! It is read once at startup; any problem with it is fatal for the node.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::raft::NodeId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read membership file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("line {line}: node id {id} is listed twice")]
    DuplicateId { line: usize, id: NodeId },

    #[error("membership file lists no nodes")]
    Empty,

    #[error("node {0} is not part of the cluster")]
    UnknownNode(NodeId),

    #[error("invalid election timing: {0}")]
    InvalidTiming(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerConfig {
    pub id: NodeId,
    pub host: String,
    pub port: u16,
}

impl PeerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Immutable id -> address mapping shared by every component of a node.
#[derive(Debug, Clone, Default)]
pub struct ClusterDirectory {
    members: BTreeMap<NodeId, PeerConfig>,
}

impl ClusterDirectory {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut members = BTreeMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = trimmed.split_whitespace().collect();
            let [id, host, port] = fields.as_slice() else {
                return Err(ConfigError::Malformed {
                    line,
                    reason: format!("expected `<id> <host> <port>`, got {} field(s)", fields.len()),
                });
            };

            let id: NodeId = id.parse().map_err(|_| ConfigError::Malformed {
                line,
                reason: format!("node id `{id}` is not a non-negative integer"),
            })?;
            let port: u16 = port.parse().map_err(|_| ConfigError::Malformed {
                line,
                reason: format!("port `{port}` is not a valid TCP port"),
            })?;

            let peer = PeerConfig {
                id,
                host: host.to_string(),
                port,
            };
            if members.insert(id, peer).is_some() {
                return Err(ConfigError::DuplicateId { line, id });
            }
        }

        if members.is_empty() {
            return Err(ConfigError::Empty);
        }

        Ok(Self { members })
    }

    /// Builds a directory from already-known members, e.g. ports bound at runtime.
    pub fn from_members(members: impl IntoIterator<Item = PeerConfig>) -> Self {
        Self {
            members: members.into_iter().map(|m| (m.id, m)).collect(),
        }
    }

    pub fn get(&self, id: NodeId) -> Option<&PeerConfig> {
        self.members.get(&id)
    }

    pub fn address(&self, id: NodeId) -> Option<String> {
        self.members.get(&id).map(PeerConfig::address)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.keys().copied()
    }

    pub fn peers_of(&self, id: NodeId) -> impl Iterator<Item = &PeerConfig> + '_ {
        self.members.values().filter(move |m| m.id != id)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
