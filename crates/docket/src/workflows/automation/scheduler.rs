use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use super::sweeps::{SweepReport, SweepRunner};
use crate::clock::Clock;
use crate::workflows::cases::CaseStore;
use crate::workflows::notifications::{NotificationStore, Transport};

struct RunningLoop {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Owns the background sweep loop. Ticks never overlap: each one runs to
/// completion on the blocking pool before the interval is polled again, and
/// late ticks are skipped rather than bunched.
pub struct AutomationScheduler<S, N, T> {
    runner: Arc<SweepRunner<S, N, T>>,
    clock: Arc<dyn Clock>,
    period: Duration,
    running: Mutex<Option<RunningLoop>>,
    last_report: Arc<Mutex<Option<SweepReport>>>,
}

impl<S, N, T> AutomationScheduler<S, N, T>
where
    S: CaseStore + 'static,
    N: NotificationStore + 'static,
    T: Transport + 'static,
{
    pub fn new(runner: Arc<SweepRunner<S, N, T>>, clock: Arc<dyn Clock>, period: Duration) -> Self {
        Self {
            runner,
            clock,
            period,
            running: Mutex::new(None),
            last_report: Arc::new(Mutex::new(None)),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    fn running(&self) -> MutexGuard<'_, Option<RunningLoop>> {
        self.running
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Spawn the loop on the current Tokio runtime. Returns `false` when it is
    /// already running.
    pub fn start(&self) -> bool {
        let mut running = self.running();
        if running.as_ref().is_some_and(|active| !active.task.is_finished()) {
            return false;
        }

        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(&self.runner);
        let clock = Arc::clone(&self.clock);
        let last_report = Arc::clone(&self.last_report);
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => {
                        let runner = Arc::clone(&runner);
                        let now = clock.now();
                        match tokio::task::spawn_blocking(move || runner.run(now)).await {
                            Ok(report) => record(&last_report, report),
                            Err(join_error) => {
                                error!(error = %join_error, "automation tick aborted");
                            }
                        }
                    }
                }
            }
            info!("automation scheduler stopped");
        });

        info!(period_secs = period.as_secs_f64(), "automation scheduler started");
        *running = Some(RunningLoop { shutdown, task });
        true
    }

    /// Signal the loop and wait for any in-flight tick to finish. Stopping a
    /// stopped scheduler does nothing.
    pub async fn stop(&self) {
        let Some(active) = self.running().take() else {
            return;
        };

        let _ = active.shutdown.send(true);
        if let Err(join_error) = active.task.await {
            error!(error = %join_error, "automation scheduler task failed");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running()
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// Run one tick now on the calling thread, outside the timer.
    pub fn run_tick(&self) -> SweepReport {
        let report = self.runner.run(self.clock.now());
        record(&self.last_report, report.clone());
        report
    }

    pub fn last_report(&self) -> Option<SweepReport> {
        self.last_report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

fn record(slot: &Mutex<Option<SweepReport>>, report: SweepReport) {
    let mut guard = slot
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(report);
}
