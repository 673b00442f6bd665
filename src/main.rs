use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use trade_stress::{Config, LiveFeed, Orchestrator};

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the live feed and the summary.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    info!("════════════════════════════════════════════════════════════");
    info!("           TRADING BACKEND STRESS TEST");
    info!("════════════════════════════════════════════════════════════");
    info!("Backend: {}", config.base_url);
    info!("Bots: {}", config.num_bots);
    info!("Duration: {}s", config.duration);
    info!("Asset: {}, qty [{}, {})", config.asset, config.min_qty, config.max_qty);
    info!(
        "Jitter: start <{}ms, hold <{}ms, cooldown {}..{}ms",
        config.start_jitter_ms, config.hold_jitter_ms, config.cooldown_min_ms, config.cooldown_max_ms
    );
    info!("════════════════════════════════════════════════════════════");

    let feed = if config.no_feed {
        LiveFeed::Disabled
    } else {
        println!("Live feed (O=open success, C=close success, X=failed request):");
        LiveFeed::Stdout
    };

    let summary_path = config.summary_json.clone();
    let orchestrator = Orchestrator::new(config, feed);
    let outcome = orchestrator
        .run_until(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;

    println!();
    println!("{}", outcome.report);

    if let Some(path) = summary_path {
        std::fs::write(&path, outcome.report.to_json()?)
            .with_context(|| format!("write summary to {}", path.display()))?;
        info!("Summary written to {}", path.display());
    }

    Ok(())
}
