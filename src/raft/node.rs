use tokio::time::Instant;
use log::{debug, info};

use super::ledger::VoteLedger;
use super::timer::ElectionTimer;
use super::{
    AppendEntriesRequest, AppendEntriesResponse, NodeId, NodeRole, NodeSnapshot, NodeState,
    RaftConfig, Term, VoteRequest, VoteResponse,
};

/// What a timer expiry made the node do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    /// Follower gave up on the leader and asks peers for votes in `term`.
    CandidacyStarted { term: Term },
    /// Candidate closed its round with a majority.
    Elected { term: Term },
    /// Candidate closed its round without a majority and waits again.
    Reverted { term: Term },
    /// Leader pushed its own deadline forward.
    Rearmed,
}

/// Election state machine of a single node.
///
/// Pure and synchronous: callers pass the current instant and serialize all
/// access behind one lock.
pub struct RaftNode {
    // Node identity
    id: NodeId,
    cluster_size: usize,

    // Election state
    state: NodeState,
    ledger: VoteLedger,
    timer: ElectionTimer,
}

impl RaftNode {
    pub fn new(config: &RaftConfig, now: Instant) -> Self {
        let (min, max) = config.election_timeout_range();

        Self {
            id: config.node_id,
            cluster_size: config.cluster_size(),
            state: NodeState::default(),
            ledger: VoteLedger::new(),
            timer: ElectionTimer::new(min, max, now),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn current_term(&self) -> Term {
        self.state.current_term
    }

    pub fn role(&self) -> NodeRole {
        self.state.role
    }

    pub fn is_leader(&self) -> bool {
        matches!(self.state.role, NodeRole::Leader)
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.ledger.voted_for()
    }

    pub fn election_deadline(&self) -> Instant {
        self.timer.deadline()
    }

    /// Best-known leader: ourselves while leading, otherwise the last node we
    /// heard from or voted for.
    pub fn leader(&self) -> Option<NodeId> {
        if self.is_leader() {
            Some(self.id)
        } else {
            self.state.leader_id
        }
    }

    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            term: self.state.current_term,
            role: self.state.role,
            voted_for: self.ledger.voted_for(),
            leader_id: self.leader(),
        }
    }

    /// Acts on the election timer. Returns `None` while the deadline is in the future.
    pub fn tick(&mut self, now: Instant) -> Option<TimerOutcome> {
        if !self.timer.is_expired(now) {
            return None;
        }

        let outcome = match self.state.role {
            NodeRole::Follower => {
                info!("Node {}: the leader is dead", self.id);
                self.start_election(now)
            }
            NodeRole::Candidate => self.close_round(now),
            NodeRole::Leader => {
                // An undisputed leader never times itself out.
                self.timer.reset(now);
                TimerOutcome::Rearmed
            }
        };

        Some(outcome)
    }

    fn start_election(&mut self, now: Instant) -> TimerOutcome {
        self.state.current_term += 1;
        self.state.role = NodeRole::Candidate;
        self.state.leader_id = None;
        self.ledger.begin_candidacy(self.state.current_term, self.id);
        self.timer.reset(now);

        info!(
            "Node {}: I am candidate. Term: {}",
            self.id, self.state.current_term
        );

        // A single-node cluster needs nobody else's vote.
        if self.cluster_size == 1 {
            return self.close_round(now);
        }

        TimerOutcome::CandidacyStarted {
            term: self.state.current_term,
        }
    }

    /// Counts the ballots gathered during this round. Late ballots are lost
    /// because the role leaves Candidate here.
    fn close_round(&mut self, now: Instant) -> TimerOutcome {
        let term = self.state.current_term;
        let tally = self.ledger.tally();
        self.ledger.clear_ballots();
        debug!(
            "Node {}: votes received for term {}: {} granted, {} rejected",
            self.id, term, tally.granted, tally.rejected
        );

        self.timer.reset(now);
        if tally.has_majority(self.cluster_size) {
            self.become_leader();
            TimerOutcome::Elected { term }
        } else {
            self.state.role = NodeRole::Follower;
            info!("Node {}: I am follower. Term: {}", self.id, term);
            TimerOutcome::Reverted { term }
        }
    }

    fn become_leader(&mut self) {
        info!(
            "Node {}: I am leader. Term: {}",
            self.id, self.state.current_term
        );
        self.state.role = NodeRole::Leader;
        self.state.leader_id = Some(self.id);
    }

    /// Adopts a strictly newer term: follower, no vote, leader unknown.
    fn step_down(&mut self, term: Term, now: Instant) {
        debug_assert!(term > self.state.current_term);
        self.state.current_term = term;
        self.state.role = NodeRole::Follower;
        self.state.leader_id = None;
        self.ledger.advance_to(term);
        self.timer.reset(now);
        info!("Node {}: I am follower. Term: {}", self.id, term);
    }

    pub fn handle_request_vote(&mut self, request: VoteRequest, now: Instant) -> VoteResponse {
        if request.term > self.state.current_term {
            self.step_down(request.term, now);
        }

        let vote_granted = request.term == self.state.current_term
            && self.ledger.record_vote(request.term, request.candidate_id);

        if vote_granted {
            info!("Node {}: voted for node {}", self.id, request.candidate_id);
            self.state.role = NodeRole::Follower;
            // Optimistic: the candidate is shown as leader before it has won.
            self.state.leader_id = Some(request.candidate_id);
            self.timer.reset(now);
        }

        VoteResponse {
            term: self.state.current_term,
            vote_granted,
        }
    }

    pub fn handle_append_entries(
        &mut self,
        request: AppendEntriesRequest,
        now: Instant,
    ) -> AppendEntriesResponse {
        if request.term > self.state.current_term {
            self.step_down(request.term, now);
        }

        let success = request.term >= self.state.current_term;
        if success {
            if self.state.role != NodeRole::Follower {
                info!(
                    "Node {}: I am follower. Term: {}",
                    self.id, self.state.current_term
                );
            }
            self.state.role = NodeRole::Follower;
            self.state.leader_id = Some(request.leader_id);
            self.timer.reset(now);
        }

        AppendEntriesResponse {
            term: self.state.current_term,
            success,
        }
    }

    /// Applies a peer's answer to the vote request we sent in `sent_term`.
    pub fn handle_vote_reply(
        &mut self,
        peer: NodeId,
        sent_term: Term,
        reply: VoteResponse,
        now: Instant,
    ) {
        if reply.term > self.state.current_term {
            self.step_down(reply.term, now);
            return;
        }

        if self.state.role == NodeRole::Candidate && self.state.current_term == sent_term {
            self.ledger.record_ballot(peer, reply.vote_granted);
        } else {
            debug!(
                "Node {}: discarding late vote from node {} for term {}",
                self.id, peer, sent_term
            );
        }
    }

    pub fn handle_append_entries_reply(
        &mut self,
        peer: NodeId,
        sent_term: Term,
        reply: AppendEntriesResponse,
        now: Instant,
    ) {
        if reply.term > self.state.current_term {
            debug!(
                "Node {}: node {} answered heartbeat of term {} with term {}",
                self.id, peer, sent_term, reply.term
            );
            self.step_down(reply.term, now);
        }
    }
}
