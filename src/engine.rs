use serde::{Deserialize, Serialize};
use crate::config::EngineConfig;
use crate::data::grid::generate_anchors;
use crate::data::pairing::{pair_ticks, split_sides};
use crate::data::types::Snapshot;
use crate::execution::simulator::FillSimulator;
use crate::execution::types::Trade;
use crate::monitoring::stats::{compute_run_stats, RunStats};
use crate::strategies::classifier::classify_ticks;
use crate::strategies::types::Window;
use crate::strategies::windows::stitch_and_validate;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Invalid analysis interval: end {end} must be after start {start}")]
    InvalidAnalysisInterval { start: i64, end: i64 },

    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub windows: Vec<Window>,
    pub trades: Vec<Trade>,
    pub stats: RunStats,
}

/// Detect persistent arbitrage windows in one market and simulate a trade per window.
///
/// `snapshots` may arrive unsorted; each side is sorted before pairing.
/// Snapshots from a market other than the first snapshot's are ignored.
pub fn detect_and_simulate(
    snapshots: &[Snapshot],
    analysis_start: i64,
    analysis_end: i64,
    trade_size: f64,
    config: &EngineConfig,
) -> Result<RunOutput, EngineError> {
    if analysis_end <= analysis_start {
        return Err(EngineError::InvalidAnalysisInterval {
            start: analysis_start,
            end: analysis_end,
        });
    }
    config.validate().map_err(EngineError::InvalidConfig)?;
    if !trade_size.is_finite() || trade_size < 0.0 {
        return Err(EngineError::InvalidConfig(format!(
            "trade_size must be a non-negative number, got {}",
            trade_size
        )));
    }

    let pairing = &config.pairing;
    let market_id = snapshots.first().map(|s| s.market_id.as_str()).unwrap_or_default();
    let foreign = snapshots.iter().filter(|s| s.market_id != market_id).count();
    let (yes, no) = if foreign > 0 {
        warn!("Ignoring {} snapshots not belonging to market {}", foreign, market_id);
        let own: Vec<Snapshot> = snapshots
            .iter()
            .filter(|s| s.market_id == market_id)
            .cloned()
            .collect();
        split_sides(&own, pairing.require_tradable)
    } else {
        split_sides(snapshots, pairing.require_tradable)
    };

    let anchors = generate_anchors(analysis_start, analysis_end, pairing.interval_secs);
    let paired = pair_ticks(&anchors, &yes, &no, pairing.max_pairing_delta_secs);
    let priced = classify_ticks(paired, pairing.spread_proxy);

    let (windows, raw_window_count) = stitch_and_validate(&priced, pairing);
    let trades = FillSimulator::new(config).simulate_all(&windows, trade_size);

    let stats = compute_run_stats(
        &priced,
        raw_window_count,
        &windows,
        &trades,
        analysis_start,
        analysis_end,
        pairing.interval_secs,
    );

    info!(
        "Market {}: {} windows ({} raw), {}/{} trades filled, coverage {:.1}%, profit ${:.2}",
        market_id,
        stats.window_count,
        stats.raw_window_count,
        stats.completed_trades,
        trades.len(),
        stats.data_coverage_pct,
        stats.total_profit
    );

    Ok(RunOutput { windows, trades, stats })
}
