// Election core
pub mod raft;
pub mod config;

// RPC surface and operator tooling
pub mod network;
pub mod repl;

// Public exports
pub use config::{ClusterDirectory, ConfigError};
pub use network::{GrpcTransport, RaftClient, RaftServer};
pub use raft::{NodeId, NodeRole, Raft, RaftConfig, Term};
