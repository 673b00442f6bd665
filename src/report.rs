use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::stats::{Latencies, LatencySummary, StatsSnapshot};

const RULE_WIDTH: usize = 60;

/// Final figures of a run, derived purely from the joined counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub elapsed_secs: f64,
    pub total_bots: usize,
    pub active_bots: usize,
    pub stats: StatsSnapshot,
    /// Percent of requests that succeeded; 0 when nothing was sent.
    pub success_rate: f64,
    pub requests_per_sec: f64,
    pub opens_per_sec: f64,
    pub closes_per_sec: f64,
    pub successful_requests_per_sec: f64,
    pub open_latency: Option<LatencySummary>,
    pub close_latency: Option<LatencySummary>,
}

impl Report {
    pub fn new(
        stats: StatsSnapshot,
        elapsed: Duration,
        total_bots: usize,
        active_bots: usize,
        latencies: Option<&Latencies>,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let success_rate = if stats.total_requests == 0 {
            0.0
        } else {
            stats.successful_requests() as f64 / stats.total_requests as f64 * 100.0
        };

        Self {
            elapsed_secs: secs,
            total_bots,
            active_bots,
            stats,
            success_rate,
            requests_per_sec: per_sec(stats.total_requests, secs),
            opens_per_sec: per_sec(stats.successful_opens, secs),
            closes_per_sec: per_sec(stats.successful_closes, secs),
            successful_requests_per_sec: per_sec(stats.successful_requests(), secs),
            open_latency: latencies.and_then(|l| LatencySummary::from_histogram(&l.open)),
            close_latency: latencies.and_then(|l| LatencySummary::from_histogram(&l.close)),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        sonic_rs::to_string_pretty(self).context("serialize report")
    }
}

fn per_sec(count: u64, secs: f64) -> f64 {
    if secs > 0.0 {
        count as f64 / secs
    } else {
        0.0
    }
}

fn write_latency(f: &mut fmt::Formatter<'_>, title: &str, summary: &LatencySummary) -> fmt::Result {
    writeln!(f)?;
    writeln!(f, "{} LATENCY (ms, n={}):", title, summary.count)?;
    writeln!(f, "  Min:    {:.2}", summary.min_ms)?;
    writeln!(f, "  Mean:   {:.2}", summary.mean_ms)?;
    writeln!(f, "  p50:    {:.2}", summary.p50_ms)?;
    writeln!(f, "  p95:    {:.2}", summary.p95_ms)?;
    writeln!(f, "  p99:    {:.2}", summary.p99_ms)?;
    writeln!(f, "  Max:    {:.2}", summary.max_ms)
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(RULE_WIDTH);
        let s = &self.stats;

        writeln!(f, "{}", rule)?;
        writeln!(f, "STRESS TEST RESULTS")?;
        writeln!(f, "{}", rule)?;
        writeln!(f, "Test Duration:         {:.2}s", self.elapsed_secs)?;
        writeln!(f, "Active Bots:           {}/{}", self.active_bots, self.total_bots)?;
        writeln!(f)?;
        writeln!(f, "PERFORMANCE METRICS:")?;
        writeln!(f, "  Total Requests:      {}", s.total_requests)?;
        writeln!(f, "  Successful Opens:    {}", s.successful_opens)?;
        writeln!(f, "  Successful Closes:   {}", s.successful_closes)?;
        writeln!(f, "  Failed Requests:     {}", s.failed_requests)?;
        writeln!(f, "  Success Rate:        {:.1}%", self.success_rate)?;
        if s.decode_failures > 0 {
            writeln!(f, "  Undecodable Bodies:  {}", s.decode_failures)?;
        }
        writeln!(f)?;
        writeln!(f, "THROUGHPUT:")?;
        writeln!(f, "  Requests/sec:        {:.2}", self.requests_per_sec)?;
        writeln!(f, "  Opens/sec:           {:.2}", self.opens_per_sec)?;
        writeln!(f, "  Closes/sec:          {:.2}", self.closes_per_sec)?;
        writeln!(f, "  Successful req/sec:  {:.2}", self.successful_requests_per_sec)?;

        if let Some(open) = &self.open_latency {
            write_latency(f, "OPEN", open)?;
        }
        if let Some(close) = &self.close_latency {
            write_latency(f, "CLOSE", close)?;
        }

        write!(f, "{}", rule)
    }
}
