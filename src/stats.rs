use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use hdrhistogram::Histogram;
use serde::Serialize;

// =============================================================================
// Counters
// =============================================================================

/// Run-wide outcome counters, shared by every worker.
///
/// Only single atomic increments are exposed. Each event is recorded by its
/// own `fetch_add`, never folded into a combined update.
#[derive(Debug, Default)]
pub struct Counters {
    successful_logins: AtomicU64,
    total_requests: AtomicU64,
    successful_opens: AtomicU64,
    successful_closes: AtomicU64,
    failed_requests: AtomicU64,
    decode_failures: AtomicU64,
}

impl Counters {
    pub fn record_login(&self) {
        self.successful_logins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_open(&self) {
        self.successful_opens.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_close(&self) {
        self.successful_closes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_failure(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Exact only once every writer has been joined; earlier reads are
    /// approximate and fit for progress logging only.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            successful_logins: self.successful_logins.load(Ordering::Relaxed),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_opens: self.successful_opens.load(Ordering::Relaxed),
            successful_closes: self.successful_closes.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub successful_logins: u64,
    pub total_requests: u64,
    pub successful_opens: u64,
    pub successful_closes: u64,
    pub failed_requests: u64,
    pub decode_failures: u64,
}

impl StatsSnapshot {
    pub fn successful_requests(&self) -> u64 {
        self.successful_opens + self.successful_closes
    }
}

// =============================================================================
// Aggregator
// =============================================================================

/// Owns the shared counters plus the run timestamps.
///
/// Workers only ever receive the `Arc<Counters>` handle. The timestamps sit
/// behind `&mut self`, so the orchestrator is their only writer: `start_time`
/// before any worker is spawned, `end_time` after all of them are joined.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    counters: Arc<Counters>,
    start_time: Option<Instant>,
    end_time: Option<Instant>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.counters)
    }

    pub fn mark_started(&mut self) {
        self.start_time = Some(Instant::now());
        self.end_time = None;
    }

    pub fn mark_finished(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// `end_time - start_time`, or zero when either is missing.
    pub fn elapsed(&self) -> Duration {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => end.saturating_duration_since(start),
            _ => Duration::ZERO,
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        self.counters.snapshot()
    }
}

// =============================================================================
// Latency
// =============================================================================

const LATENCY_LOW_US: u64 = 1;
const LATENCY_HIGH_US: u64 = 60_000_000;
const LATENCY_SIGFIG: u8 = 3;

/// Per-worker latency recorder. Owned by exactly one task while it runs and
/// merged by the orchestrator after the join barrier, so it needs no lock.
#[derive(Debug, Clone)]
pub struct Latencies {
    pub open: Histogram<u64>,
    pub close: Histogram<u64>,
}

impl Latencies {
    pub fn new() -> Result<Self> {
        Ok(Self {
            open: new_histogram()?,
            close: new_histogram()?,
        })
    }

    pub fn record_open(&mut self, elapsed: Duration) {
        self.open.saturating_record(elapsed.as_micros() as u64);
    }

    pub fn record_close(&mut self, elapsed: Duration) {
        self.close.saturating_record(elapsed.as_micros() as u64);
    }

    pub fn merge(&mut self, other: &Latencies) -> Result<()> {
        self.open
            .add(&other.open)
            .map_err(|e| anyhow!("merge open latency histogram: {:?}", e))?;
        self.close
            .add(&other.close)
            .map_err(|e| anyhow!("merge close latency histogram: {:?}", e))?;
        Ok(())
    }
}

fn new_histogram() -> Result<Histogram<u64>> {
    Histogram::<u64>::new_with_bounds(LATENCY_LOW_US, LATENCY_HIGH_US, LATENCY_SIGFIG)
        .map_err(|e| anyhow!("create latency histogram: {:?}", e))
}

/// Millisecond summary of one latency histogram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub count: u64,
    pub min_ms: f64,
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

impl LatencySummary {
    pub fn from_histogram(hist: &Histogram<u64>) -> Option<Self> {
        if hist.len() == 0 {
            return None;
        }
        let ms = |us: u64| us as f64 / 1000.0;
        Some(Self {
            count: hist.len(),
            min_ms: ms(hist.min()),
            mean_ms: hist.mean() / 1000.0,
            p50_ms: ms(hist.value_at_quantile(0.50)),
            p95_ms: ms(hist.value_at_quantile(0.95)),
            p99_ms: ms(hist.value_at_quantile(0.99)),
            max_ms: ms(hist.max()),
        })
    }
}
