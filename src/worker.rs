use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::debug;

use crate::bot::AuthenticatedBot;
use crate::config::{CycleTimings, OrderTemplate};
use crate::feed::LiveFeed;
use crate::shutdown::StopSignal;
use crate::stats::{Counters, Latencies};
use crate::wire::OpenOrderRequest;

/// Read-only state handed to every worker at spawn time.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    pub counters: Arc<Counters>,
    pub feed: LiveFeed,
    pub timings: Arc<CycleTimings>,
    pub order: Arc<OrderTemplate>,
}

/// What one bot did during the stress phase.
#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub bot_id: usize,
    pub cycles: u64,
    pub opens_attempted: u64,
    pub opens_succeeded: u64,
    pub closes_attempted: u64,
    pub closes_succeeded: u64,
    pub latencies: Latencies,
}

/// Drives one bot through open → hold → close → cooldown until stopped.
pub struct Worker {
    bot: AuthenticatedBot,
    ctx: WorkerContext,
    stop: StopSignal,
    rng: StdRng,
    report: WorkerReport,
}

impl Worker {
    pub fn new(
        bot: AuthenticatedBot,
        ctx: WorkerContext,
        stop: StopSignal,
        latencies: Latencies,
    ) -> Self {
        let report = WorkerReport {
            bot_id: bot.id(),
            cycles: 0,
            opens_attempted: 0,
            opens_succeeded: 0,
            closes_attempted: 0,
            closes_succeeded: 0,
            latencies,
        };
        Self {
            bot,
            ctx,
            stop,
            rng: StdRng::from_rng(&mut rand::rng()),
            report,
        }
    }

    /// The stop signal is only polled at the top of a cycle. A cycle that has
    /// started always runs to the end of its cooldown.
    pub async fn run(mut self) -> WorkerReport {
        let delay = jitter(&mut self.rng, &self.ctx.timings.start_jitter_ms);
        sleep(delay).await;

        while !self.stop.is_raised() {
            if let Some(order_id) = self.open_position().await {
                let hold = jitter(&mut self.rng, &self.ctx.timings.hold_jitter_ms);
                sleep(hold).await;
                self.close_position(&order_id).await;
            }

            let cooldown = jitter(&mut self.rng, &self.ctx.timings.cooldown_ms);
            sleep(cooldown).await;
            self.report.cycles += 1;
        }

        debug!(
            "Bot {} stopped after {} cycles",
            self.report.bot_id, self.report.cycles
        );
        self.report
    }

    /// Returns the order handle to close, if the open succeeded with one.
    async fn open_position(&mut self) -> Option<String> {
        let template = &self.ctx.order;
        let order = OpenOrderRequest {
            qty: quantity(&mut self.rng, &template.qty),
            asset: &template.asset,
            margin: template.margin,
            stop_loss: template.stop_loss,
            take_profit: template.take_profit,
            leverage: template.leverage,
        };

        self.ctx.counters.record_request();
        self.report.opens_attempted += 1;
        let started = Instant::now();

        match self
            .bot
            .client()
            .open_position(self.bot.credential(), &order)
            .await
        {
            Ok(response) => {
                self.report.latencies.record_open(started.elapsed());
                self.report.opens_succeeded += 1;
                self.ctx.counters.record_open();
                self.ctx.feed.opened();
                if !response.well_formed {
                    self.ctx.counters.record_decode_failure();
                }
                let order_id = response.body.order_id;
                (!order_id.is_empty()).then_some(order_id)
            }
            Err(e) => {
                debug!("Bot {} open failed: {}", self.report.bot_id, e);
                self.ctx.counters.record_failure();
                self.ctx.feed.failed();
                None
            }
        }
    }

    async fn close_position(&mut self, order_id: &str) {
        self.ctx.counters.record_request();
        self.report.closes_attempted += 1;
        let started = Instant::now();

        match self
            .bot
            .client()
            .close_position(self.bot.credential(), order_id)
            .await
        {
            Ok(()) => {
                self.report.latencies.record_close(started.elapsed());
                self.report.closes_succeeded += 1;
                self.ctx.counters.record_close();
                self.ctx.feed.closed();
            }
            Err(e) => {
                debug!("Bot {} close of {} failed: {}", self.report.bot_id, order_id, e);
                self.ctx.counters.record_failure();
                self.ctx.feed.failed();
            }
        }
    }
}

/// Uniform delay in `[start, end)` milliseconds; an empty range yields `start`.
fn jitter(rng: &mut StdRng, range_ms: &Range<u64>) -> Duration {
    if range_ms.is_empty() {
        return Duration::from_millis(range_ms.start);
    }
    Duration::from_millis(rng.random_range(range_ms.clone()))
}

fn quantity(rng: &mut StdRng, range: &Range<f64>) -> f64 {
    if range.is_empty() {
        return range.start;
    }
    rng.random_range(range.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_in_half_open_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1000 {
            let d = jitter(&mut rng, &(50..200));
            assert!(d >= Duration::from_millis(50) && d < Duration::from_millis(200));
        }
    }

    #[test]
    fn empty_ranges_collapse_to_start() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jitter(&mut rng, &(0..0)), Duration::ZERO);
        assert_eq!(jitter(&mut rng, &(120..120)), Duration::from_millis(120));
        assert_eq!(quantity(&mut rng, &(0.5..0.5)), 0.5);
    }

    #[test]
    fn quantity_stays_in_range() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1000 {
            let q = quantity(&mut rng, &(0.001..0.01));
            assert!((0.001..0.01).contains(&q));
        }
    }
}
