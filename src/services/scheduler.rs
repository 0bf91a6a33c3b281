use crate::services::cache::InMemoryStore;
use crate::services::stats::{RecomputeJob, RecomputeOutcome, StatsAggregator};
use log::{debug, info, warn};
use rocket::Shutdown;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Drains the recompute queue one job at a time.
pub struct StatsWorker {
    aggregator: Arc<StatsAggregator>,
    jobs: mpsc::UnboundedReceiver<RecomputeJob>,
}

impl StatsWorker {
    pub fn new(
        aggregator: Arc<StatsAggregator>,
        jobs: mpsc::UnboundedReceiver<RecomputeJob>,
    ) -> Self {
        Self { aggregator, jobs }
    }

    /// Runs until the queue closes or `shutdown` fires.
    pub async fn run(mut self, mut shutdown: Shutdown) {
        info!("Stats worker started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stats worker shutting down...");
                    break;
                }
                job = self.jobs.recv() => {
                    let Some(job) = job else {
                        info!("Stats queue closed, worker exiting");
                        break;
                    };
                    self.handle(job).await;
                }
            }
        }
    }

    async fn handle(&self, job: RecomputeJob) {
        let waited = chrono::Utc::now() - job.requested_at;
        info!(
            "Running {} stats recompute (queued {}ms ago)",
            job.reason,
            waited.num_milliseconds()
        );

        match self.aggregator.recompute().await {
            RecomputeOutcome::Updated(_) => {}
            RecomputeOutcome::InsufficientData => {
                info!("Stats recompute skipped, no searches logged yet")
            }
            RecomputeOutcome::Failed(e) => warn!("Stats recompute gave up: {e}"),
        }
    }
}

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// Periodically asks the aggregator for a refresh through the same guard
/// the HTTP path uses, and sweeps expired entries out of the shared store.
pub struct StatsScheduler {
    aggregator: Arc<StatsAggregator>,
    store: Arc<InMemoryStore>,
    period: Duration,
}

impl StatsScheduler {
    pub fn new(
        aggregator: Arc<StatsAggregator>,
        store: Arc<InMemoryStore>,
        period: Duration,
    ) -> Self {
        Self {
            aggregator,
            store,
            period: period.max(MIN_PERIOD),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// One scheduler round. Returns whether a recompute was enqueued.
    pub fn tick(&self) -> bool {
        let purged = self.store.purge_expired();
        debug!("Scheduler tick, {purged} expired cache entries purged");

        self.aggregator.request_refresh_for("scheduled")
    }

    pub async fn run(self, mut shutdown: Shutdown) {
        info!("Stats scheduler started (every {:?})", self.period);

        let mut ticker = tokio::time::interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stats scheduler shutting down...");
                    break;
                }
                _ = ticker.tick() => {
                    self.tick();
                }
            }
        }
    }
}

/// Spawns the worker and the scheduler on the current runtime.
pub fn spawn_stats_tasks(
    aggregator: Arc<StatsAggregator>,
    store: Arc<InMemoryStore>,
    jobs: mpsc::UnboundedReceiver<RecomputeJob>,
    period: Duration,
    shutdown: Shutdown,
) -> (JoinHandle<()>, JoinHandle<()>) {
    let worker = StatsWorker::new(aggregator.clone(), jobs);
    let scheduler = StatsScheduler::new(aggregator, store, period);

    (
        tokio::spawn(worker.run(shutdown.clone())),
        tokio::spawn(scheduler.run(shutdown)),
    )
}
