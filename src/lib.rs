//! Concurrent stress harness for a trading backend.
//!
//! A fixed batch of bots signs up in parallel, then every authenticated bot
//! repeatedly opens and closes small positions until a shared deadline. The
//! orchestrator broadcasts a one-shot stop signal, waits for every bot to
//! finish its current cycle and reports throughput from lock-free counters.

pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod feed;
pub mod orchestrator;
pub mod report;
pub mod shutdown;
pub mod signup;
pub mod stats;
pub mod wire;
pub mod worker;

pub use config::Config;
pub use feed::LiveFeed;
pub use orchestrator::{Orchestrator, RunOutcome};
pub use report::Report;
