mod config;
mod dispatch;
mod error;
mod ledger;
mod node;
mod state;
mod suspend;
mod timer;
mod transport;

pub use self::config::RaftConfig;
pub use self::error::RaftError;
pub use self::ledger::{majority, Tally, VoteLedger};
pub use self::node::{RaftNode, TimerOutcome};
pub use self::state::{NodeRole, NodeSnapshot, NodeState};
pub use self::suspend::SuspendGate;
pub use self::timer::{random_election_timeout, ElectionTimer};
pub use self::transport::PeerTransport;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use log::info;

pub type NodeId = u64;
pub type Term = u64;

// Election RPC payloads, independent of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteRequest {
    pub term: Term,
    pub candidate_id: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteResponse {
    pub term: Term,
    pub vote_granted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendEntriesRequest {
    pub term: Term,
    pub leader_id: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppendEntriesResponse {
    pub term: Term,
    pub success: bool,
}

/// A running election participant.
///
/// Cheap to clone; every clone shares the same state. All reads and writes of
/// the election state go through the single `node` lock, which is never held
/// across a peer call.
#[derive(Clone)]
pub struct Raft {
    node: Arc<Mutex<RaftNode>>,
    config: Arc<RaftConfig>,
    gate: SuspendGate,
    transport: Arc<dyn PeerTransport>,
    elected: Arc<Notify>,
}

/// Background tasks of a started node.
pub struct RaftHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl RaftHandle {
    /// Stops the timer and heartbeat loops, as if the process had died.
    pub fn abort(&self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Raft {
    pub fn new(config: RaftConfig, transport: Arc<dyn PeerTransport>) -> Self {
        let node = RaftNode::new(&config, Instant::now());
        Self {
            node: Arc::new(Mutex::new(node)),
            config: Arc::new(config),
            gate: SuspendGate::new(),
            transport,
            elected: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> NodeId {
        self.config.node_id
    }

    pub fn is_suspended(&self) -> bool {
        self.gate.is_suspended()
    }

    /// Spawns the election timer loop and the heartbeat loop.
    pub fn start(&self) -> RaftHandle {
        info!(
            "Node {}: I am follower. Term: 0 ({} peer(s))",
            self.id(),
            self.config.peers.len()
        );

        let timer = tokio::spawn(self.clone().run_election_timer());
        let heartbeats = tokio::spawn(self.clone().run_heartbeats());

        RaftHandle {
            tasks: vec![timer, heartbeats],
        }
    }

    async fn run_election_timer(self) {
        let mut ticker = interval(self.config.poll_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if self.gate.is_suspended() {
                self.gate.wait_resumed().await;
                continue;
            }

            let outcome = {
                let mut node = self.node.lock().await;
                node.tick(Instant::now())
            };

            match outcome {
                Some(TimerOutcome::CandidacyStarted { term }) => self.request_votes(term),
                Some(TimerOutcome::Elected { .. }) => self.elected.notify_one(),
                Some(TimerOutcome::Reverted { .. }) | Some(TimerOutcome::Rearmed) | None => {}
            }
        }
    }

    async fn run_heartbeats(self) {
        let mut ticker = interval(self.config.heartbeat_period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                // A fresh leader announces itself without waiting a full period.
                _ = self.elected.notified() => {}
            }
            if self.gate.is_suspended() {
                self.gate.wait_resumed().await;
                continue;
            }

            let term = {
                let node = self.node.lock().await;
                node.is_leader().then(|| node.current_term())
            };

            if let Some(term) = term {
                self.send_heartbeats(term);
            }
        }
    }

    fn ensure_active(&self) -> Result<(), RaftError> {
        if self.gate.is_suspended() {
            return Err(RaftError::Suspended);
        }
        Ok(())
    }

    pub async fn request_vote(&self, request: VoteRequest) -> Result<VoteResponse, RaftError> {
        self.ensure_active()?;
        let mut node = self.node.lock().await;
        Ok(node.handle_request_vote(request, Instant::now()))
    }

    pub async fn append_entries(
        &self,
        request: AppendEntriesRequest,
    ) -> Result<AppendEntriesResponse, RaftError> {
        self.ensure_active()?;
        let mut node = self.node.lock().await;
        Ok(node.handle_append_entries(request, Instant::now()))
    }

    pub async fn leader(&self) -> Result<Option<NodeId>, RaftError> {
        self.ensure_active()?;
        info!("Node {}: command from client: getleader", self.id());
        let node = self.node.lock().await;
        Ok(node.leader())
    }

    /// Plays dead for `period`; answers only after the pause is over.
    pub async fn suspend(&self, period: Duration) -> Result<(), RaftError> {
        self.ensure_active()?;
        info!(
            "Node {}: command from client: suspend {}",
            self.id(),
            period.as_secs()
        );
        self.gate.suspend_for(period).await
    }

    /// Current state, readable even while suspended.
    pub async fn status(&self) -> NodeSnapshot {
        self.node.lock().await.snapshot()
    }
}
