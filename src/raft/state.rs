use std::fmt;

use super::{NodeId, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Follower,
    Candidate,
    Leader,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Follower => write!(f, "follower"),
            NodeRole::Candidate => write!(f, "candidate"),
            NodeRole::Leader => write!(f, "leader"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NodeState {
    pub current_term: Term,
    pub role: NodeRole,
    pub leader_id: Option<NodeId>,
}

impl Default for NodeState {
    fn default() -> Self {
        Self {
            current_term: 0,
            role: NodeRole::Follower,
            leader_id: None,
        }
    }
}

/// Point-in-time view of a node, for operators and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub term: Term,
    pub role: NodeRole,
    pub voted_for: Option<NodeId>,
    pub leader_id: Option<NodeId>,
}
