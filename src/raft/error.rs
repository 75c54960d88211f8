use thiserror::Error;

use super::NodeId;

#[derive(Error, Debug)]
pub enum RaftError {
    #[error("Node is suspended")]
    Suspended,

    #[error("Node is already suspended")]
    AlreadySuspended,

    #[error("Peer {peer} unreachable: {reason}")]
    Unreachable { peer: NodeId, reason: String },

    #[error("Unknown peer: {0}")]
    UnknownPeer(NodeId),
}
