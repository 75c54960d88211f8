use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Draws an election timeout uniformly from `[min, max]` at microsecond resolution.
pub fn random_election_timeout(min: Duration, max: Duration) -> Duration {
    let min_us = min.as_micros() as u64;
    let max_us = max.as_micros().max(min.as_micros()) as u64;
    let mut rng = rand::rng();
    Duration::from_micros(rng.random_range(min_us..=max_us))
}

/// Deadline after which a silent node assumes the leader is gone.
///
/// Only two things reset it: accepting a heartbeat and granting a vote. The
/// role state machine also re-arms it after acting on an expiry.
#[derive(Debug, Clone)]
pub struct ElectionTimer {
    min: Duration,
    max: Duration,
    deadline: Instant,
}

impl ElectionTimer {
    pub fn new(min: Duration, max: Duration, now: Instant) -> Self {
        Self {
            min,
            max,
            deadline: now + random_election_timeout(min, max),
        }
    }

    pub fn reset(&mut self, now: Instant) {
        self.deadline = now + random_election_timeout(self.min, self.max);
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}
