use anyhow::{Context, Result};
use arb_windows::config::{Config, EnvConfig};
use arb_windows::detect_and_simulate;
use arb_windows::execution::persistence::{run_id, RunDatabase};
use arb_windows::execution::types::TradeResult;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Arbitrage window backtest starting...");

    let env_config = EnvConfig::load()?;
    tracing::info!("Loading configuration: {}", env_config.config_path);
    let mut config = Config::load(&env_config.config_path)?;
    config.apply_env(&env_config);

    let engine_config = config.engine_config();
    if let Err(e) = engine_config.validate() {
        anyhow::bail!("Invalid engine configuration: {}", e);
    }
    let engine_config = Arc::new(engine_config);

    let start = config.run.analysis_start.timestamp();
    let end = config.run.analysis_end.timestamp();
    tracing::info!(
        "Analysis interval: {} .. {} ({}s grid)",
        config.run.analysis_start,
        config.run.analysis_end,
        engine_config.pairing.interval_secs
    );
    tracing::info!("Dry run mode: {}", config.system.dry_run);

    tracing::info!("Opening database: {}", config.system.database_path);
    let mut db = RunDatabase::new(&config.system.database_path)?;

    let markets = if config.run.markets.is_empty() {
        db.list_markets()?
    } else {
        config.run.markets.clone()
    };
    if markets.is_empty() {
        tracing::warn!("No markets to analyze");
        return Ok(());
    }
    tracing::info!("Analyzing {} markets", markets.len());

    // Pad by the pairing delta so the first and last anchors can still pair
    let delta = engine_config.pairing.max_pairing_delta_secs;
    let trade_size = engine_config.execution.trade_size;

    let mut jobs = Vec::with_capacity(markets.len());
    for market_id in &markets {
        let snapshots = db
            .load_snapshots(market_id, start - delta, end + delta)
            .with_context(|| format!("Failed to load snapshots for {}", market_id))?;
        tracing::info!("Market {}: {} snapshots loaded", market_id, snapshots.len());

        let cfg = Arc::clone(&engine_config);
        let market_id = market_id.clone();
        jobs.push(tokio::task::spawn_blocking(move || {
            let output = detect_and_simulate(&snapshots, start, end, trade_size, &cfg);
            (market_id, output)
        }));
    }

    let mut failures = 0;
    for joined in futures::future::join_all(jobs).await {
        let (market_id, output) = match joined {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("Run task panicked: {}", e);
                failures += 1;
                continue;
            }
        };

        let output = match output {
            Ok(output) => output,
            Err(e) => {
                tracing::error!("Market {}: {}", market_id, e);
                failures += 1;
                continue;
            }
        };

        let id = run_id(&market_id, start, end);
        println!("{}", serde_json::to_string(&serde_json::json!({
            "run_id": id,
            "stats": output.stats,
        }))?);

        if config.system.dry_run {
            tracing::info!("Dry run: not persisting run {}", id);
        } else {
            db.save_run(&id, &market_id, &output)
                .with_context(|| format!("Failed to save run {}", id))?;
            tracing::info!(
                "Saved run {}: {} windows, {} completed / {} failed trades",
                id,
                db.count_windows(&id)?,
                db.count_trades(&id, TradeResult::Completed.as_str())?,
                db.count_trades(&id, TradeResult::Failed.as_str())?
            );
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} runs failed", failures, markets.len());
    }

    tracing::info!("✅ All runs complete");
    Ok(())
}
