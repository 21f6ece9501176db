use std::time::Duration;

use async_trait::async_trait;

/// Suspends the tick driver between simulation steps.
#[async_trait]
pub trait AsyncTimer: Send + Sync {
    async fn sleep(
        &self,
        duration: Duration,
    );
}
