//! Periodic queue-depth sampling.

use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::labels::LabelPolicy;
use crate::observability::metrics;

/// Exclusive upper bound of sampled depths.
pub const MAX_QUEUE_DEPTH: u64 = 100;

/// Latest sampled queue depth, shared with `/work` and `/status`.
#[derive(Debug, Default)]
pub struct QueueDepth(AtomicU64);

impl QueueDepth {
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn set(&self, depth: u64) {
        self.0.store(depth, Ordering::Relaxed);
    }
}

/// Background task refreshing [`QueueDepth`] on a fixed interval.
pub struct QueueSampler {
    depth: Arc<QueueDepth>,
    policy: LabelPolicy,
    interval: Duration,
}

impl QueueSampler {
    pub fn new(depth: Arc<QueueDepth>, policy: LabelPolicy, interval: Duration) -> Self {
        Self {
            depth,
            policy,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "Queue sampler starting");

        let labels = self.policy.queue_labels();
        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let depth = rand::thread_rng().gen_range(0..MAX_QUEUE_DEPTH);
                    self.depth.set(depth);
                    metrics::set_queue_depth(&labels, depth);
                }
                _ = shutdown.recv() => {
                    tracing::info!("Queue sampler received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::ProcessIdentity;
    use crate::state::ServiceMode;

    #[tokio::test]
    async fn test_sampler_updates_depth_until_shutdown() {
        let depth = Arc::new(QueueDepth::default());
        depth.set(u64::MAX);
        let policy = LabelPolicy::new(
            "worker",
            ServiceMode::Shaped,
            ProcessIdentity::new("worker-0", "worker", "build-123"),
        );
        let (tx, rx) = broadcast::channel(1);
        let sampler = QueueSampler::new(depth.clone(), policy, Duration::from_millis(50));
        let handle = tokio::spawn(sampler.run(rx));

        time::sleep(Duration::from_millis(200)).await;
        assert!(depth.get() < MAX_QUEUE_DEPTH);

        tx.send(()).unwrap();
        handle.await.unwrap();
    }
}
