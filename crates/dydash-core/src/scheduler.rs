//! Timer seam for polling loops.
//!
//! Status polling, thumbnail polling and the post-download settle delay all go
//! through [`Scheduler`] so they can be driven by a virtual clock under test.

use std::time::{Duration, Instant};

use async_trait::async_trait;

/// Clock and sleep provider.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Current instant on this scheduler's clock.
    fn now(&self) -> Instant;

    /// Suspend the caller for `duration` of this scheduler's time.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
