// src/pipeline/scheduler.rs

//! Periodic cycle scheduler.
//!
//! Each cycle runs on its own task with its own interval. A cycle never
//! overlaps itself: a tick that comes due during a long pass is delayed
//! until the pass ends, not queued up. Cycles share nothing but the store.
//!
//! Shutdown stops new passes at once. A pass already running gets a grace
//! period to finish and is aborted after that; anything it already wrote
//! stays written.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::models::ScheduleConfig;
use crate::pipeline::{ChangeDetector, DigestReporter};

/// A unit of periodic work.
///
/// `tick` owns its error handling; a failed pass is logged and the next
/// tick runs as usual.
#[async_trait]
pub trait Cycle: Send + Sync {
    fn name(&self) -> &'static str;

    async fn tick(&self);
}

#[async_trait]
impl Cycle for ChangeDetector {
    fn name(&self) -> &'static str {
        "detection"
    }

    async fn tick(&self) {
        match self.run_pass().await {
            Ok(report) if report.events() > 0 => log::info!(
                "Detection pass: {} observed, {} added, {} changed, {} delivered",
                report.observed,
                report.added,
                report.changed,
                report.delivered()
            ),
            Ok(report) => log::debug!("Detection pass: {} observed, no changes", report.observed),
            Err(e) => log::warn!("Detection pass aborted: {}", e),
        }
    }
}

#[async_trait]
impl Cycle for DigestReporter {
    fn name(&self) -> &'static str {
        "analytics"
    }

    async fn tick(&self) {
        match self.run_pass().await {
            Ok(_) => {}
            Err(e) => log::warn!("Analytics pass failed: {}", e),
        }
    }
}

struct CycleSpec {
    cycle: Arc<dyn Cycle>,
    period: Duration,
    run_on_start: bool,
}

/// Builder for the set of cycles to run.
#[derive(Default)]
pub struct Scheduler {
    cycles: Vec<CycleSpec>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The two standard cycles with the configured timing.
    pub fn from_config(
        detector: Arc<ChangeDetector>,
        digest: Arc<DigestReporter>,
        schedule: &ScheduleConfig,
    ) -> Self {
        Self::new()
            .with_cycle(detector, schedule.detection_period(), schedule.detection_on_start)
            .with_cycle(digest, schedule.analytics_period(), schedule.analytics_on_start)
    }

    /// Add a cycle. With `run_on_start` unset the first pass waits one period.
    pub fn with_cycle(mut self, cycle: Arc<dyn Cycle>, period: Duration, run_on_start: bool) -> Self {
        self.cycles.push(CycleSpec {
            cycle,
            period,
            run_on_start,
        });
        self
    }

    /// Spawn one task per cycle. Must be called inside a tokio runtime.
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = self
            .cycles
            .into_iter()
            .map(|spec| {
                let name = spec.cycle.name();
                log::info!(
                    "Starting {} cycle every {}s (run on start: {})",
                    name,
                    spec.period.as_secs(),
                    spec.run_on_start
                );
                (name, tokio::spawn(run_cycle(spec, shutdown_rx.clone())))
            })
            .collect();

        SchedulerHandle {
            shutdown: shutdown_tx,
            tasks,
        }
    }
}

async fn run_cycle(spec: CycleSpec, mut shutdown: watch::Receiver<bool>) {
    let first = if spec.run_on_start {
        Instant::now()
    } else {
        Instant::now() + spec.period
    };
    let mut ticker = time::interval_at(first, spec.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => spec.cycle.tick().await,
        }
    }
    log::info!("{} cycle stopped", spec.cycle.name());
}

/// Running cycles.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl SchedulerHandle {
    /// Stop scheduling and wait up to `grace` for running passes.
    ///
    /// Returns `false` when some pass had to be aborted.
    pub async fn shutdown(self, grace: Duration) -> bool {
        // Receivers live in the tasks, which may already have exited.
        let _ = self.shutdown.send(true);

        let deadline = Instant::now() + grace;
        let mut clean = true;
        for (name, mut task) in self.tasks {
            match time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    clean = false;
                    log::error!("{} cycle panicked: {}", name, e);
                }
                Err(_) => {
                    clean = false;
                    log::warn!("{} cycle still running after {}s, aborting", name, grace.as_secs());
                    task.abort();
                }
            }
        }
        clean
    }
}
