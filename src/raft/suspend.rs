use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time::sleep;
use log::{error, info};

use super::RaftError;

/// Fault-injection switch that makes a node play dead for a while.
///
/// Loops check it at the top of every iteration and park on
/// [`SuspendGate::wait_resumed`] instead of spinning.
#[derive(Debug, Clone)]
pub struct SuspendGate {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for SuspendGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SuspendGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn is_suspended(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn wait_resumed(&self) {
        let mut rx = self.tx.subscribe();
        // The sender outlives this call, so the channel cannot close under us.
        let _ = rx.wait_for(|suspended| !*suspended).await;
    }

    /// Engages the gate for `period` and returns once it has been released.
    ///
    /// The pause runs on its own task so that dropping the caller does not
    /// cut the suspension short.
    pub async fn suspend_for(&self, period: Duration) -> Result<(), RaftError> {
        if self.tx.send_replace(true) {
            return Err(RaftError::AlreadySuspended);
        }
        info!("Sleeping for {:.3} seconds", period.as_secs_f64());

        let tx = Arc::clone(&self.tx);
        let pause = tokio::spawn(async move {
            sleep(period).await;
            tx.send_replace(false);
            info!("Resumed after {:.3} seconds", period.as_secs_f64());
        });
        self.finish_pause(pause.await);

        Ok(())
    }

    /// The gate must not stay engaged if the timer task died.
    fn finish_pause(&self, outcome: Result<(), JoinError>) {
        if let Err(e) = outcome {
            error!("Suspend timer task failed: {e}");
            self.tx.send_replace(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn gate_is_open_by_default() {
        let gate = SuspendGate::new();
        assert!(!gate.is_suspended());
        // Returns immediately when not suspended.
        gate.wait_resumed().await;
    }

    #[tokio::test(start_paused = true)]
    async fn suspension_lasts_for_the_requested_period() {
        let gate = SuspendGate::new();
        let start = tokio::time::Instant::now();

        let pausing = gate.clone();
        let task = tokio::spawn(async move { pausing.suspend_for(Duration::from_secs(5)).await });

        tokio::task::yield_now().await;
        assert!(gate.is_suspended());

        gate.wait_resumed().await;
        assert!(!gate.is_suspended());
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert!(task.await.expect("join").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn second_suspend_while_suspended_is_refused() {
        let gate = SuspendGate::new();
        let pausing = gate.clone();
        let task = tokio::spawn(async move { pausing.suspend_for(Duration::from_secs(2)).await });
        tokio::task::yield_now().await;

        let err = gate.suspend_for(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, RaftError::AlreadySuspended));
        assert!(gate.is_suspended());

        task.await.expect("join").expect("first suspend");
        assert!(!gate.is_suspended());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_caller_does_not_end_the_pause_early() {
        let gate = SuspendGate::new();
        let pausing = gate.clone();
        let task = tokio::spawn(async move { pausing.suspend_for(Duration::from_secs(3)).await });
        tokio::task::yield_now().await;
        task.abort();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(gate.is_suspended());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(!gate.is_suspended());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_timer_task_releases_the_gate() {
        let gate = SuspendGate::new();
        gate.tx.send_replace(true);

        let timer = tokio::spawn(sleep(Duration::from_secs(60)));
        timer.abort();
        let outcome = timer.await;
        assert!(outcome.is_err());

        gate.finish_pause(outcome);
        assert!(!gate.is_suspended());
    }
}
