use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

/// Background interval job that only logs that it ran.
///
/// It is a placeholder for periodic re-ingestion and is not wired to the
/// scoring pipeline. The first run happens one interval after start.
pub struct PlaceholderScheduler {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
    runs: Arc<AtomicU64>,
}

impl PlaceholderScheduler {
    pub fn start(period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let runs = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&runs);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        counter.fetch_add(1, Ordering::Relaxed);
                        tracing::info!(
                            "[Scheduler] Job executed at {}",
                            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!("Placeholder scheduler stopped");
        });

        tracing::info!("Placeholder scheduler started ({}s interval)", period.as_secs_f64());

        Self {
            shutdown_tx,
            handle,
            runs,
        }
    }

    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// Signal the job loop and wait for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::warn!("Scheduler task ended abnormally: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_runs_on_interval() {
        let scheduler = PlaceholderScheduler::start(Duration::from_secs(10));
        assert_eq!(scheduler.runs(), 0);

        time::sleep(Duration::from_secs(35)).await;
        assert_eq!(scheduler.runs(), 3);

        scheduler.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_job() {
        let scheduler = PlaceholderScheduler::start(Duration::from_secs(10));
        time::sleep(Duration::from_secs(15)).await;
        let runs = Arc::clone(&scheduler.runs);
        scheduler.shutdown().await;

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }
}
