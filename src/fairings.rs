use crate::services::cache::InMemoryStore;
use crate::services::spawn_stats_tasks;
use crate::services::stats::{RecomputeJob, StatsAggregator};
use log::{error, info};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Orbit, Request, Rocket};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request,
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, _: &mut Data<'_>) {
        info!(
            "{} {} {}",
            req.method(),
            req.uri(),
            req.headers().get_one("User-Agent").unwrap_or("Unknown")
        );
    }
}

/// Starts the stats worker and scheduler once the server is listening.
/// Both stop on Rocket shutdown.
pub struct StatsBackground {
    aggregator: Arc<StatsAggregator>,
    store: Arc<InMemoryStore>,
    jobs: Mutex<Option<UnboundedReceiver<RecomputeJob>>>,
    period: Duration,
}

impl StatsBackground {
    pub fn new(
        aggregator: Arc<StatsAggregator>,
        store: Arc<InMemoryStore>,
        jobs: UnboundedReceiver<RecomputeJob>,
        period: Duration,
    ) -> Self {
        Self {
            aggregator,
            store,
            jobs: Mutex::new(Some(jobs)),
            period,
        }
    }
}

#[rocket::async_trait]
impl Fairing for StatsBackground {
    fn info(&self) -> Info {
        Info {
            name: "Stats Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let jobs = match self.jobs.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };

        let Some(jobs) = jobs else {
            error!("Stats background tasks already started");
            return;
        };

        spawn_stats_tasks(
            self.aggregator.clone(),
            self.store.clone(),
            jobs,
            self.period,
            rocket.shutdown(),
        );
        info!("Stats worker and scheduler running");
    }
}
