use serde::{Deserialize, Serialize};
use crate::data::grid::expected_anchor_count;
use crate::execution::types::Trade;
use crate::strategies::types::{PricedTick, Window};

/// Aggregate metrics of one run. Recomputed from scratch every run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunStats {
    pub analysis_start: i64,
    pub analysis_end: i64,
    pub expected_ticks: usize,
    pub total_paired_ticks: usize,
    pub missing_ticks: usize,
    pub stale_ticks: usize,
    pub arbitrage_ticks: usize,
    pub data_coverage_pct: f64,
    pub raw_window_count: usize,
    pub window_count: usize,
    pub duration_p50: f64,
    pub duration_p90: f64,
    pub best_min_combined_price: Option<f64>,
    pub windows_per_analysis_hour: f64,
    pub completed_trades: usize,
    pub failed_trades: usize,
    pub fill_success_rate: f64,
    pub total_profit: f64,
    pub total_fees: f64,
    pub avg_execution_adjusted_edge: f64,
}

/// Nearest-rank percentile over an ascending slice: element `floor(n * q)`.
///
/// Zero for an empty slice.
pub fn nearest_rank(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// `numerator / denominator * 100`, or zero when the ratio is undefined.
fn pct(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator * 100.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Realized profit as a percentage of capital deployed on completed trades.
///
/// Capital per trade is reconstructed as `profit / raw_edge`; trades with no
/// edge are left out.
pub fn execution_adjusted_edge(trades: &[Trade]) -> f64 {
    let (profit, capital) = trades
        .iter()
        .filter(|t| t.is_completed() && t.raw_edge != 0.0 && t.raw_edge.is_finite())
        .fold((0.0, 0.0), |(profit, capital), t| {
            (profit + t.profit, capital + t.profit / t.raw_edge)
        });

    pct(profit, capital)
}

pub fn compute_run_stats(
    ticks: &[PricedTick],
    raw_window_count: usize,
    windows: &[Window],
    trades: &[Trade],
    analysis_start: i64,
    analysis_end: i64,
    interval: i64,
) -> RunStats {
    let expected_ticks = expected_anchor_count(analysis_start, analysis_end, interval);
    let total_paired_ticks = ticks.iter().filter(|t| t.is_valid()).count();
    let missing_ticks = ticks.iter().filter(|t| t.tick.is_missing).count();
    let stale_ticks = ticks.iter().filter(|t| t.tick.is_stale_pair).count();
    let arbitrage_ticks = ticks
        .iter()
        .filter(|t| t.is_valid() && t.is_arbitrage_opportunity)
        .count();

    let mut durations: Vec<f64> = windows.iter().map(|w| w.duration).collect();
    durations.sort_by(|a, b| a.total_cmp(b));

    let best_min_combined_price = windows
        .iter()
        .map(|w| w.min_combined_price)
        .min_by(|a, b| a.total_cmp(b));

    let hours = (analysis_end - analysis_start) as f64 / 3600.0;
    let windows_per_analysis_hour = if hours > 0.0 {
        finite_or_zero(windows.len() as f64 / hours)
    } else {
        0.0
    };

    let completed: Vec<&Trade> = trades.iter().filter(|t| t.is_completed()).collect();
    let completed_trades = completed.len();
    let total_profit: f64 = completed.iter().map(|t| t.profit).sum();
    let total_fees: f64 = completed.iter().map(|t| t.fees).sum();

    RunStats {
        analysis_start,
        analysis_end,
        expected_ticks,
        total_paired_ticks,
        missing_ticks,
        stale_ticks,
        arbitrage_ticks,
        data_coverage_pct: pct(total_paired_ticks as f64, expected_ticks as f64),
        raw_window_count,
        window_count: windows.len(),
        duration_p50: nearest_rank(&durations, 0.5),
        duration_p90: nearest_rank(&durations, 0.9),
        best_min_combined_price,
        windows_per_analysis_hour,
        completed_trades,
        failed_trades: trades.len() - completed_trades,
        fill_success_rate: pct(completed_trades as f64, windows.len() as f64),
        total_profit,
        total_fees,
        avg_execution_adjusted_edge: execution_adjusted_edge(trades),
    }
}
