use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use elector::raft::{
    majority, AppendEntriesRequest, AppendEntriesResponse, NodeId, NodeRole, RaftConfig, RaftNode,
    Term, TimerOutcome, VoteRequest, VoteResponse,
};
use proptest::prelude::*;
use tokio::time::Instant;

/// Something the scheduler lets happen next.
#[derive(Debug, Clone)]
enum Event {
    Advance { ms: u64 },
    Tick { node: usize },
    Heartbeat { node: usize },
    Deliver { pick: usize },
    Drop { pick: usize },
}

fn event_strategy() -> impl Strategy<Value = Event> {
    prop_oneof![
        2 => (1u64..120).prop_map(|ms| Event::Advance { ms }),
        3 => (0usize..5).prop_map(|node| Event::Tick { node }),
        1 => (0usize..5).prop_map(|node| Event::Heartbeat { node }),
        4 => any::<usize>().prop_map(|pick| Event::Deliver { pick }),
        1 => any::<usize>().prop_map(|pick| Event::Drop { pick }),
    ]
}

/// A message on the simulated wire. Replies carry the term the request was sent in.
#[derive(Debug, Clone, Copy)]
enum Message {
    Vote { from: NodeId, to: NodeId, request: VoteRequest },
    VoteReply { from: NodeId, to: NodeId, sent_term: Term, reply: VoteResponse },
    Heartbeat { from: NodeId, to: NodeId, request: AppendEntriesRequest },
    HeartbeatReply { from: NodeId, to: NodeId, sent_term: Term, reply: AppendEntriesResponse },
}

struct Simulation {
    now: Instant,
    nodes: Vec<RaftNode>,
    in_flight: Vec<Message>,

    // History used by the checks.
    last_terms: Vec<Term>,
    votes: HashMap<(NodeId, Term), NodeId>,
    leaders: BTreeMap<Term, NodeId>,
}

impl Simulation {
    fn new(size: u64) -> Self {
        let now = Instant::now();
        let nodes = (0..size)
            .map(|id| {
                let mut config = RaftConfig::new(id);
                for peer in 0..size {
                    config.add_peer(peer);
                }
                RaftNode::new(&config, now)
            })
            .collect();

        Self {
            now,
            nodes,
            in_flight: Vec::new(),
            last_terms: vec![0; size as usize],
            votes: HashMap::new(),
            leaders: BTreeMap::new(),
        }
    }

    fn size(&self) -> usize {
        self.nodes.len()
    }

    fn peers_of(&self, id: NodeId) -> impl Iterator<Item = NodeId> {
        (0..self.size() as NodeId).filter(move |peer| *peer != id)
    }

    fn apply(&mut self, event: Event) {
        match event {
            Event::Advance { ms } => self.now += Duration::from_millis(ms),
            Event::Tick { node } => {
                let id = (node % self.size()) as NodeId;
                if let Some(TimerOutcome::CandidacyStarted { term }) =
                    self.nodes[id as usize].tick(self.now)
                {
                    let request = VoteRequest { term, candidate_id: id };
                    let messages: Vec<Message> = self
                        .peers_of(id)
                        .map(|to| Message::Vote { from: id, to, request })
                        .collect();
                    self.in_flight.extend(messages);
                }
            }
            Event::Heartbeat { node } => {
                let id = (node % self.size()) as NodeId;
                let leader = &self.nodes[id as usize];
                if leader.is_leader() {
                    let request = AppendEntriesRequest {
                        term: leader.current_term(),
                        leader_id: id,
                    };
                    let messages: Vec<Message> = self
                        .peers_of(id)
                        .map(|to| Message::Heartbeat { from: id, to, request })
                        .collect();
                    self.in_flight.extend(messages);
                }
            }
            Event::Deliver { pick } => {
                if !self.in_flight.is_empty() {
                    let message = self.in_flight.swap_remove(pick % self.in_flight.len());
                    self.deliver(message);
                }
            }
            Event::Drop { pick } => {
                if !self.in_flight.is_empty() {
                    self.in_flight.swap_remove(pick % self.in_flight.len());
                }
            }
        }
    }

    fn deliver(&mut self, message: Message) {
        let now = self.now;
        match message {
            Message::Vote { from, to, request } => {
                let reply = self.nodes[to as usize].handle_request_vote(request, now);
                self.in_flight.push(Message::VoteReply {
                    from: to,
                    to: from,
                    sent_term: request.term,
                    reply,
                });
            }
            Message::VoteReply { from, to, sent_term, reply } => {
                self.nodes[to as usize].handle_vote_reply(from, sent_term, reply, now);
            }
            Message::Heartbeat { from, to, request } => {
                let reply = self.nodes[to as usize].handle_append_entries(request, now);
                self.in_flight.push(Message::HeartbeatReply {
                    from: to,
                    to: from,
                    sent_term: request.term,
                    reply,
                });
            }
            Message::HeartbeatReply { from, to, sent_term, reply } => {
                self.nodes[to as usize].handle_append_entries_reply(from, sent_term, reply, now);
            }
        }
    }

    fn check(&mut self) -> Result<(), TestCaseError> {
        for node in &self.nodes {
            let snap = node.snapshot();
            let id = snap.id;

            let last = &mut self.last_terms[id as usize];
            prop_assert!(snap.term >= *last, "node {} went from term {} to {}", id, *last, snap.term);
            *last = snap.term;

            if let Some(candidate) = snap.voted_for {
                let first = *self.votes.entry((id, snap.term)).or_insert(candidate);
                prop_assert_eq!(first, candidate, "node {} voted twice in term {}", id, snap.term);
            }

            if snap.role == NodeRole::Leader {
                prop_assert_eq!(node.leader(), Some(id));
                let winner = *self.leaders.entry(snap.term).or_insert(id);
                prop_assert_eq!(winner, id, "two leaders in term {}", snap.term);
            }
        }

        // Every leader was granted votes by a strict majority in its term.
        for (&term, &leader) in &self.leaders {
            let backers = self
                .votes
                .iter()
                .filter(|((_, t), v)| *t == term && **v == leader)
                .count();
            prop_assert!(
                backers >= majority(self.size()),
                "node {} leads term {} with only {} vote(s)",
                leader,
                term,
                backers
            );
        }
        Ok(())
    }

    /// Delivers everything in order and lets the clock run; used to show
    /// that a quiet network converges.
    fn settle(&mut self, rounds: usize) {
        for _ in 0..rounds {
            self.now += Duration::from_millis(25);
            for id in 0..self.size() {
                self.apply(Event::Tick { node: id });
                self.apply(Event::Heartbeat { node: id });
            }
            while !self.in_flight.is_empty() {
                self.apply(Event::Deliver { pick: 0 });
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn safety_holds_under_arbitrary_schedules(
        size in prop_oneof![Just(3u64), Just(5u64)],
        events in proptest::collection::vec(event_strategy(), 1..400),
    ) {
        let mut sim = Simulation::new(size);
        for event in events {
            sim.apply(event);
            sim.check()?;
        }
    }

    #[test]
    fn quiet_network_eventually_has_a_leader(
        size in prop_oneof![Just(3u64), Just(5u64)],
        events in proptest::collection::vec(event_strategy(), 0..200),
    ) {
        let mut sim = Simulation::new(size);
        for event in events {
            sim.apply(event);
        }
        sim.in_flight.clear();

        // 30 simulated seconds of reliable delivery.
        sim.settle(1200);
        sim.check()?;

        let leaders: Vec<NodeId> = sim
            .nodes
            .iter()
            .filter(|n| n.is_leader())
            .map(|n| n.id())
            .collect();
        prop_assert_eq!(leaders.len(), 1, "leaders after settling: {:?}", leaders);
        for node in &sim.nodes {
            prop_assert_eq!(node.leader(), Some(leaders[0]));
        }
    }
}
