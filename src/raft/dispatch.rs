use tokio::time::Instant;
use log::debug;

use super::node::RaftNode;
use super::{AppendEntriesRequest, Raft, Term, VoteRequest};

impl Raft {
    /// Asks every peer for its vote in `term`. Each call runs on its own task
    /// and feeds its answer back into the ledger whenever it arrives.
    pub(super) fn request_votes(&self, term: Term) {
        let request = VoteRequest {
            term,
            candidate_id: self.id(),
        };

        for &peer in &self.config.peers {
            let raft = self.clone();
            tokio::spawn(async move {
                match raft.transport.request_vote(peer, request).await {
                    Ok(reply) => {
                        raft.apply_if_active(|node, now| {
                            node.handle_vote_reply(peer, term, reply, now)
                        })
                        .await
                    }
                    Err(e) => debug!("RequestVote to node {peer} failed: {e}"),
                }
            });
        }
    }

    /// One heartbeat to every peer. Like vote requests, each call runs on its
    /// own task so a peer that never answers cannot hold back the others.
    pub(super) fn send_heartbeats(&self, term: Term) {
        let request = AppendEntriesRequest {
            term,
            leader_id: self.id(),
        };

        for &peer in &self.config.peers {
            let raft = self.clone();
            tokio::spawn(async move {
                match raft.transport.append_entries(peer, request).await {
                    Ok(reply) => {
                        raft.apply_if_active(|node, now| {
                            node.handle_append_entries_reply(peer, term, reply, now)
                        })
                        .await
                    }
                    Err(e) => debug!("AppendEntries to node {peer} failed: {e}"),
                }
            });
        }
    }

    /// Runs `apply` under the node lock unless the node is suspended.
    async fn apply_if_active<F>(&self, apply: F)
    where
        F: FnOnce(&mut RaftNode, Instant),
    {
        if self.gate.is_suspended() {
            debug!("Node {} is suspended, dropping peer reply", self.id());
            return;
        }
        let mut node = self.node.lock().await;
        apply(&mut node, Instant::now());
    }
}
