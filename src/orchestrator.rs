use std::future::{self, Future};
use std::sync::Arc;

use anyhow::Result;
use futures_util::future::join_all;
use tokio::time::{interval_at, sleep_until, Instant};
use tracing::{error, info, warn};

use crate::bot::{create_bots, AuthenticatedBot};
use crate::client::Endpoints;
use crate::config::Config;
use crate::feed::LiveFeed;
use crate::report::Report;
use crate::shutdown::stop_channel;
use crate::signup::signup_all;
use crate::stats::{Counters, Latencies, StatsAggregator};
use crate::worker::{Worker, WorkerContext, WorkerReport};

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub workers: Vec<WorkerReport>,
    pub signup_failures: usize,
}

pub struct Orchestrator {
    config: Config,
    feed: LiveFeed,
}

impl Orchestrator {
    pub fn new(config: Config, feed: LiveFeed) -> Self {
        Self { config, feed }
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        self.run_until(future::pending()).await
    }

    /// Runs signup then the stress phase. `interrupt` resolving before the
    /// deadline stops the stress phase early; the run still drains and reports.
    pub async fn run_until<F>(&self, interrupt: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let config = &self.config;
        let endpoints = Arc::new(Endpoints::new(&config.base_url));
        let bots = create_bots(config.num_bots, endpoints, config.request_timeout())?;

        let mut stats = StatsAggregator::new();

        // =====================================================================
        // Signup phase
        // =====================================================================

        let signup = signup_all(bots, Arc::from(config.password.as_str()), stats.counters()).await;
        let eligible = signup.authenticated;
        let active_bots = eligible.len();

        // =====================================================================
        // Stress phase
        // =====================================================================

        let (workers, latencies) = if eligible.is_empty() {
            warn!("No bot signed up successfully, skipping stress phase");
            stats.mark_started();
            stats.mark_finished();
            (Vec::new(), None)
        } else {
            info!(
                "Starting stress test for {}s with {}/{} bots",
                config.duration, active_bots, config.num_bots
            );
            let (workers, latencies) = self.stress(eligible, &mut stats, interrupt).await?;
            (workers, Some(latencies))
        };

        let report = Report::new(
            stats.snapshot(),
            stats.elapsed(),
            config.num_bots,
            active_bots,
            latencies.as_ref(),
        );

        Ok(RunOutcome {
            report,
            workers,
            signup_failures: signup.failed,
        })
    }

    async fn stress<F>(
        &self,
        bots: Vec<AuthenticatedBot>,
        stats: &mut StatsAggregator,
        interrupt: F,
    ) -> Result<(Vec<WorkerReport>, Latencies)>
    where
        F: Future<Output = ()>,
    {
        let ctx = WorkerContext {
            counters: stats.counters(),
            feed: self.feed.clone(),
            timings: Arc::new(self.config.timings()),
            order: Arc::new(self.config.order_template()),
        };
        let trigger = stop_channel();

        let workers = bots
            .into_iter()
            .map(|bot| -> Result<Worker> {
                Ok(Worker::new(bot, ctx.clone(), trigger.subscribe(), Latencies::new()?))
            })
            .collect::<Result<Vec<_>>>()?;

        // The clock starts here, after signup, not at process start.
        stats.mark_started();
        let tasks: Vec<_> = workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run()))
            .collect();
        info!("Spawned {} workers", tasks.len());

        self.wait_for_deadline(&ctx.counters, interrupt).await;

        let listeners = trigger.trigger();
        info!("Stop signal sent to {} workers, draining in-flight cycles", listeners);

        let mut reports = Vec::with_capacity(tasks.len());
        let mut merged = Latencies::new()?;
        for result in join_all(tasks).await {
            match result {
                Ok(report) => {
                    if let Err(e) = merged.merge(&report.latencies) {
                        warn!("Bot {} latencies dropped: {}", report.bot_id, e);
                    }
                    reports.push(report);
                }
                Err(e) => error!("Worker task failed: {}", e),
            }
        }
        stats.mark_finished();
        info!("All workers stopped");

        Ok((reports, merged))
    }

    async fn wait_for_deadline<F>(&self, counters: &Counters, interrupt: F)
    where
        F: Future<Output = ()>,
    {
        let deadline = Instant::now() + self.config.test_duration();
        let until_deadline = sleep_until(deadline);
        tokio::pin!(until_deadline);
        tokio::pin!(interrupt);

        let mut progress_timer = self
            .config
            .progress_interval()
            .map(|every| interval_at(Instant::now() + every, every));

        loop {
            tokio::select! {
                _ = &mut until_deadline => {
                    info!("Test duration reached");
                    break;
                }

                _ = &mut interrupt => {
                    warn!("Interrupted, stopping stress phase early");
                    break;
                }

                Some(_) = async {
                    match &mut progress_timer {
                        Some(timer) => Some(timer.tick().await),
                        None => None,
                    }
                } => {
                    let s = counters.snapshot();
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    info!(
                        "Progress: requests={}, opens={}, closes={}, failed={}, remaining={}s",
                        s.total_requests,
                        s.successful_opens,
                        s.successful_closes,
                        s.failed_requests,
                        remaining.as_secs()
                    );
                }
            }
        }
    }
}
