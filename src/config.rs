use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use url::Url;

use crate::error::ConfigError;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Parser, Debug, Clone)]
#[command(name = "trade-stress")]
#[command(about = "Open/close position stress test for a trading backend", long_about = None)]
pub struct Config {
    /// Backend base URL
    #[arg(long, env = "BASE_URL", default_value = "http://localhost:8000")]
    pub base_url: Url,

    /// Number of simulated bots
    #[arg(long, env = "NUM_BOTS", default_value = "100")]
    pub num_bots: usize,

    /// Stress phase duration in seconds (signup is not counted)
    #[arg(long, env = "TEST_DURATION", default_value = "480")]
    pub duration: u64,

    /// Per-request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT", default_value = "10")]
    pub request_timeout: u64,

    /// Password used for every bot signup
    #[arg(long, env = "BOT_PASSWORD", default_value = "password123")]
    pub password: String,

    /// Asset symbol traded by every bot
    #[arg(long, env = "ASSET", default_value = "BTC")]
    pub asset: String,

    /// Lower bound (inclusive) of the random open quantity
    #[arg(long, env = "MIN_QTY", default_value = "0.001")]
    pub min_qty: f64,

    /// Upper bound (exclusive) of the random open quantity
    #[arg(long, env = "MAX_QTY", default_value = "0.01")]
    pub max_qty: f64,

    /// Optional leverage sent with every open
    #[arg(long, env = "LEVERAGE")]
    pub leverage: Option<f64>,

    /// Optional margin sent with every open
    #[arg(long, env = "MARGIN")]
    pub margin: Option<f64>,

    /// Optional stop loss sent with every open
    #[arg(long, env = "STOP_LOSS")]
    pub stop_loss: Option<f64>,

    /// Optional take profit sent with every open
    #[arg(long, env = "TAKE_PROFIT")]
    pub take_profit: Option<f64>,

    /// Upper bound of the random delay before a bot's first cycle
    #[arg(long, env = "START_JITTER_MS", default_value = "1000")]
    pub start_jitter_ms: u64,

    /// Upper bound of the random delay between open and close
    #[arg(long, env = "HOLD_JITTER_MS", default_value = "500")]
    pub hold_jitter_ms: u64,

    /// Lower bound of the delay between cycles
    #[arg(long, env = "COOLDOWN_MIN_MS", default_value = "50")]
    pub cooldown_min_ms: u64,

    /// Upper bound of the delay between cycles
    #[arg(long, env = "COOLDOWN_MAX_MS", default_value = "200")]
    pub cooldown_max_ms: u64,

    /// Seconds between progress log lines (0 disables)
    #[arg(long, env = "PROGRESS_INTERVAL", default_value = "10")]
    pub progress_interval: u64,

    /// Disable the O/C/X live feed
    #[arg(long, env = "NO_FEED")]
    pub no_feed: bool,

    /// Write the final report as JSON to this path
    #[arg(long, env = "SUMMARY_JSON")]
    pub summary_json: Option<PathBuf>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_bots == 0 {
            return Err(ConfigError::NoBots);
        }
        if self.duration == 0 {
            return Err(ConfigError::ZeroDuration);
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if !(self.min_qty > 0.0 && self.min_qty < self.max_qty) {
            return Err(ConfigError::QuantityRange {
                min: self.min_qty,
                max: self.max_qty,
            });
        }
        if self.cooldown_min_ms > self.cooldown_max_ms {
            return Err(ConfigError::CooldownRange {
                min: self.cooldown_min_ms,
                max: self.cooldown_max_ms,
            });
        }
        Ok(())
    }

    pub fn test_duration(&self) -> Duration {
        Duration::from_secs(self.duration)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn progress_interval(&self) -> Option<Duration> {
        (self.progress_interval > 0).then(|| Duration::from_secs(self.progress_interval))
    }

    pub fn timings(&self) -> CycleTimings {
        CycleTimings {
            start_jitter_ms: 0..self.start_jitter_ms,
            hold_jitter_ms: 0..self.hold_jitter_ms,
            cooldown_ms: self.cooldown_min_ms..self.cooldown_max_ms,
        }
    }

    pub fn order_template(&self) -> OrderTemplate {
        OrderTemplate {
            asset: self.asset.clone(),
            qty: self.min_qty..self.max_qty,
            margin: self.margin,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            leverage: self.leverage,
        }
    }
}

/// Jitter ranges for one worker cycle, half-open, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleTimings {
    pub start_jitter_ms: Range<u64>,
    pub hold_jitter_ms: Range<u64>,
    pub cooldown_ms: Range<u64>,
}

impl Default for CycleTimings {
    fn default() -> Self {
        Self {
            start_jitter_ms: 0..1000,
            hold_jitter_ms: 0..500,
            cooldown_ms: 50..200,
        }
    }
}

/// Everything about an open request except the random quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTemplate {
    pub asset: String,
    pub qty: Range<f64>,
    pub margin: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub leverage: Option<f64>,
}

impl Default for OrderTemplate {
    fn default() -> Self {
        Self {
            asset: "BTC".to_string(),
            qty: 0.001..0.01,
            margin: None,
            stop_loss: None,
            take_profit: None,
            leverage: None,
        }
    }
}
