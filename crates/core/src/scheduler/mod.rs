//! Cooperative job scheduler.
//!
//! Named jobs fire on a fixed interval or at a daily wall-clock time
//! (optionally weekdays only). One loop drives every job: due jobs run
//! sequentially and are awaited in place, so no two scheduled jobs
//! overlap; a job that needs parallelism fans out bounded work of its
//! own. A failing job is logged and keeps its schedule. Jobs marked
//! run-at-start fire once when the scheduler starts, independent of
//! their trigger.

use chrono::{Datelike, Duration as ChronoDuration, NaiveDateTime, NaiveTime, Weekday};
use futures::future::BoxFuture;
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::errors::Result;

/// When a job fires.
#[derive(Clone, Copy, Debug)]
pub enum Trigger {
    /// Fixed interval, first firing one interval after start.
    Every(Duration),
    /// Daily at a wall-clock time.
    DailyAt {
        time: NaiveTime,
        weekdays_only: bool,
    },
}

/// Job body: an owned future factory so each firing gets a fresh future.
pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, Result<()>> + Send + Sync>;

struct Job {
    name: String,
    trigger: Trigger,
    run_at_start: bool,
    body: JobFn,
    next_due: Option<NaiveDateTime>,
}

impl Job {
    fn schedule_from(&mut self, now: NaiveDateTime) {
        self.next_due = Some(match self.trigger {
            Trigger::Every(period) => now + chrono_duration(period),
            Trigger::DailyAt {
                time,
                weekdays_only,
            } => next_daily_occurrence(now, time, weekdays_only),
        });
    }

    fn is_due(&self, now: NaiveDateTime) -> bool {
        self.next_due.map(|due| now >= due).unwrap_or(false)
    }
}

fn chrono_duration(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::seconds(60))
}

/// First instant strictly after `after` where a daily trigger fires.
fn next_daily_occurrence(
    after: NaiveDateTime,
    time: NaiveTime,
    weekdays_only: bool,
) -> NaiveDateTime {
    let mut candidate = after.date().and_time(time);
    if candidate <= after {
        candidate += ChronoDuration::days(1);
    }
    if weekdays_only {
        while matches!(candidate.weekday(), Weekday::Sat | Weekday::Sun) {
            candidate += ChronoDuration::days(1);
        }
    }
    candidate
}

/// Single-loop scheduler with explicit lifecycle.
///
/// Register jobs, then `start()`; the loop runs until `stop()`, which
/// awaits the loop task so no job is left running unobserved.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    jobs: Vec<Job>,
    tick: Duration,
    shutdown: Option<watch::Sender<bool>>,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            jobs: Vec::new(),
            tick: Duration::from_secs(1),
            shutdown: None,
            handle: None,
        }
    }

    /// Override the loop tick; coarse enough for minute-level cadences,
    /// fast ticks only matter in tests.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Register a named job. Takes effect at the next `start()`.
    pub fn register<F>(&mut self, name: &str, trigger: Trigger, run_at_start: bool, body: F)
    where
        F: Fn() -> BoxFuture<'static, Result<()>> + Send + Sync + 'static,
    {
        self.jobs.push(Job {
            name: name.to_string(),
            trigger,
            run_at_start,
            body: Arc::new(body),
            next_due: None,
        });
    }

    /// Whether the scheduler loop is currently running.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Start the loop. No-op when already running.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        self.shutdown = Some(tx);

        let clock = self.clock.clone();
        let tick = self.tick;
        let mut jobs: Vec<Job> = self
            .jobs
            .iter()
            .map(|job| Job {
                name: job.name.clone(),
                trigger: job.trigger,
                run_at_start: job.run_at_start,
                body: job.body.clone(),
                next_due: None,
            })
            .collect();

        let handle = tokio::spawn(async move {
            info!("Scheduler started with {} job(s)", jobs.len());

            let start_now = clock.now();
            for job in jobs.iter_mut() {
                job.schedule_from(start_now);
            }

            // Warm-up firings are not gated by the interval timers.
            for job in jobs.iter().filter(|job| job.run_at_start) {
                run_job(job).await;
            }

            let mut interval = tokio::time::interval(tick);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        let now = clock.now();
                        for job in jobs.iter_mut() {
                            if job.is_due(now) {
                                job.schedule_from(now);
                                run_job(job).await;
                            }
                        }
                    }
                }
            }

            info!("Scheduler stopped");
        });

        self.handle = Some(handle);
    }

    /// Signal shutdown and await the loop, including any job in flight.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(true);
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn run_job(job: &Job) {
    if let Err(e) = (job.body)().await {
        // Failures never unregister the job; its next firing stands.
        error!("Scheduled job '{}' failed: {}", job.name, e);
    }
}
