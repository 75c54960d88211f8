use std::time::Duration;

use crate::config::{ClusterDirectory, ConfigError};

use super::NodeId;

#[derive(Debug, Clone)]
pub struct RaftConfig {
    pub node_id: NodeId,
    pub peers: Vec<NodeId>,
    pub election_timeout_min: u64, // in milliseconds
    pub election_timeout_max: u64, // in milliseconds
    pub heartbeat_interval: u64,   // in milliseconds
    pub poll_interval: u64,        // in milliseconds
    pub rpc_timeout: u64,          // in milliseconds
}

impl RaftConfig {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            peers: Vec::new(),
            election_timeout_min: 150,
            election_timeout_max: 300,
            heartbeat_interval: 50,
            poll_interval: 10,
            rpc_timeout: 100,
        }
    }

    /// Election settings for `node_id` with every other directory member as a peer.
    pub fn from_directory(directory: &ClusterDirectory, node_id: NodeId) -> Result<Self, ConfigError> {
        if !directory.contains(node_id) {
            return Err(ConfigError::UnknownNode(node_id));
        }

        let mut config = Self::new(node_id);
        for peer in directory.peers_of(node_id) {
            config.add_peer(peer.id);
        }
        Ok(config)
    }

    pub fn add_peer(&mut self, peer_id: NodeId) {
        if peer_id != self.node_id && !self.peers.contains(&peer_id) {
            self.peers.push(peer_id);
        }
    }

    /// Number of configured participants, self included.
    pub fn cluster_size(&self) -> usize {
        self.peers.len() + 1
    }

    pub fn election_timeout_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.election_timeout_min),
            Duration::from_millis(self.election_timeout_max),
        )
    }

    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval)
    }

    pub fn poll_period(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn rpc_deadline(&self) -> Duration {
        Duration::from_millis(self.rpc_timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.election_timeout_min == 0 {
            return Err(ConfigError::InvalidTiming(
                "election timeout minimum must be positive".to_string(),
            ));
        }
        if self.election_timeout_min > self.election_timeout_max {
            return Err(ConfigError::InvalidTiming(format!(
                "election timeout minimum {}ms exceeds maximum {}ms",
                self.election_timeout_min, self.election_timeout_max
            )));
        }
        if self.heartbeat_interval == 0 || self.heartbeat_interval >= self.election_timeout_min {
            return Err(ConfigError::InvalidTiming(format!(
                "heartbeat interval {}ms must be positive and below the election timeout minimum {}ms",
                self.heartbeat_interval, self.election_timeout_min
            )));
        }
        if self.poll_interval == 0 || self.poll_interval >= self.election_timeout_min {
            return Err(ConfigError::InvalidTiming(format!(
                "poll interval {}ms must be positive and below the election timeout minimum {}ms",
                self.poll_interval, self.election_timeout_min
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_election_protocol() {
        let cfg = RaftConfig::new(0);
        assert_eq!(cfg.election_timeout_min, 150);
        assert_eq!(cfg.election_timeout_max, 300);
        assert_eq!(cfg.heartbeat_interval, 50);
        assert_eq!(cfg.cluster_size(), 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn add_peer_ignores_self_and_duplicates() {
        let mut cfg = RaftConfig::new(1);
        cfg.add_peer(1);
        cfg.add_peer(2);
        cfg.add_peer(2);
        assert_eq!(cfg.peers, vec![2]);
        assert_eq!(cfg.cluster_size(), 2);
    }

    #[test]
    fn from_directory_lists_every_other_member() {
        let dir = ClusterDirectory::parse("0 h 1\n1 h 2\n2 h 3\n").unwrap();
        let cfg = RaftConfig::from_directory(&dir, 1).unwrap();
        assert_eq!(cfg.peers, vec![0, 2]);

        assert!(matches!(
            RaftConfig::from_directory(&dir, 9).unwrap_err(),
            ConfigError::UnknownNode(9)
        ));
    }

    #[test]
    fn validate_rejects_inverted_or_tight_timings() {
        let mut cfg = RaftConfig::new(0);
        cfg.election_timeout_min = 400;
        assert!(cfg.validate().is_err());

        let mut cfg = RaftConfig::new(0);
        cfg.heartbeat_interval = 150;
        assert!(cfg.validate().is_err());

        let mut cfg = RaftConfig::new(0);
        cfg.election_timeout_min = 0;
        assert!(cfg.validate().is_err());
    }
}
