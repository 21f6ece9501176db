use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use application::BattlegroundService;
use application::ports::out_::AsyncTimer;

pub struct TokioTimer;

impl TokioTimer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for TokioTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncTimer for TokioTimer {
    async fn sleep(
        &self,
        duration: Duration,
    ) {
        tokio::time::sleep(duration).await;
    }
}

/// Drives the battleground system at a fixed interval. Every tick advances the simulation by the nominal interval.
pub struct TickDriver {
    service: Arc<BattlegroundService>,
    timer: Arc<dyn AsyncTimer>,
    interval: Duration,
}

impl TickDriver {
    pub fn new(
        service: Arc<BattlegroundService>,
        timer: Arc<dyn AsyncTimer>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            timer,
            interval,
        }
    }

    pub async fn run_ticks(
        &self,
        count: usize,
    ) {
        for _ in 0..count {
            self.timer.sleep(self.interval).await;
            self.service.tick(self.interval).await;
        }
    }

    /// Ticks forever on the runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        info!(interval = ?self.interval, "Starting battleground ticker");
        tokio::spawn(async move {
            let mut ticks: u64 = 0;
            loop {
                self.run_ticks(1).await;
                ticks = ticks.wrapping_add(1);
                if ticks % 600 == 0 {
                    debug!(ticks, "Ticker alive");
                }
            }
        })
    }
}
