use std::collections::BTreeMap;

use super::{NodeId, Term};

/// Smallest number of grants that forms a strict majority of `cluster_size`.
pub fn majority(cluster_size: usize) -> usize {
    cluster_size / 2 + 1
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub granted: usize,
    pub rejected: usize,
}

impl Tally {
    pub fn has_majority(&self, cluster_size: usize) -> bool {
        self.granted >= majority(cluster_size) && self.granted > self.rejected
    }
}

/// Per-term voting record of one node.
///
/// `voted_for` and the collected ballots always belong to `term`; moving to a
/// newer term wipes both.
#[derive(Debug, Clone, Default)]
pub struct VoteLedger {
    term: Term,
    voted_for: Option<NodeId>,
    ballots: BTreeMap<NodeId, bool>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(&self) -> Term {
        self.term
    }

    pub fn voted_for(&self) -> Option<NodeId> {
        self.voted_for
    }

    /// Moves the ledger to `term`, forgetting the vote and ballots of older terms.
    pub fn advance_to(&mut self, term: Term) {
        if term > self.term {
            self.term = term;
            self.voted_for = None;
            self.ballots.clear();
        }
    }

    /// Records a vote for `candidate` in `term`. Returns false if a vote was
    /// already cast in that term or `term` is not the ledger's term.
    pub fn record_vote(&mut self, term: Term, candidate: NodeId) -> bool {
        if term != self.term || self.voted_for.is_some() {
            return false;
        }
        self.voted_for = Some(candidate);
        true
    }

    /// Opens a candidacy in `term`: self-vote, ballot box holds only our own grant.
    pub fn begin_candidacy(&mut self, term: Term, self_id: NodeId) {
        self.advance_to(term);
        self.voted_for = Some(self_id);
        self.ballots.clear();
        self.ballots.insert(self_id, true);
    }

    /// Adds one voter's answer. A voter is counted once per candidacy.
    pub fn record_ballot(&mut self, voter: NodeId, granted: bool) {
        self.ballots.entry(voter).or_insert(granted);
    }

    pub fn tally(&self) -> Tally {
        self.ballots.values().fold(Tally::default(), |mut t, &granted| {
            if granted {
                t.granted += 1;
            } else {
                t.rejected += 1;
            }
            t
        })
    }

    pub fn clear_ballots(&mut self) {
        self.ballots.clear();
    }
}
