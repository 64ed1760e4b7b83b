use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use crate::config::EngineConfig;
use crate::execution::types::{Trade, TradeResult};
use crate::strategies::types::Window;
use tracing::debug;

fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Deterministic fill model: one independent trade per validated window.
pub struct FillSimulator<'a> {
    config: &'a EngineConfig,
}

impl<'a> FillSimulator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// The window must stay open for at least latency + minimum fill time.
    ///
    /// Only duration matters here, never how low the price went.
    pub fn is_fill_feasible(&self, window: &Window) -> bool {
        window.duration >= self.config.min_fill_window_secs()
    }

    /// Simulate a trade of `trade_size` into `window`.
    ///
    /// Profit is taken at the entry price, not the window minimum. Edge, fees
    /// and profit are computed in decimal so quoted prices give exact cents.
    pub fn simulate(&self, window_ref: usize, window: &Window, trade_size: f64) -> Trade {
        let edge = Decimal::ONE - to_decimal(window.entry_combined_price);
        let raw_edge = to_f64(edge);

        if !self.is_fill_feasible(window) {
            debug!(
                "Fill infeasible for window {} ({}s < {}s)",
                window.start_time,
                window.duration,
                self.config.min_fill_window_secs()
            );
            return Trade {
                window_ref,
                result: TradeResult::Failed,
                raw_edge,
                profit: 0.0,
                fees: 0.0,
            };
        }

        let size = to_decimal(trade_size);
        let fees = size * to_decimal(self.config.execution.fee_bps) / Decimal::from(10_000);
        let profit = size * edge - fees;

        Trade {
            window_ref,
            result: TradeResult::Completed,
            raw_edge,
            profit: to_f64(profit),
            fees: to_f64(fees),
        }
    }

    pub fn simulate_all(&self, windows: &[Window], trade_size: f64) -> Vec<Trade> {
        windows
            .iter()
            .enumerate()
            .map(|(i, window)| self.simulate(i, window, trade_size))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(duration: f64, entry: f64) -> Window {
        Window {
            start_time: 0,
            end_time: duration as i64,
            duration,
            entry_combined_price: entry,
            min_combined_price: entry.min(0.5),
            exit_combined_price: entry,
            tick_count: 3,
            ticks: Vec::new(),
        }
    }

    #[test]
    fn test_fill_boundary_is_inclusive() {
        let config = EngineConfig::default();
        let sim = FillSimulator::new(&config);

        assert_eq!(sim.simulate(0, &window(1.2, 0.97), 100.0).result, TradeResult::Completed);
        assert_eq!(sim.simulate(0, &window(1.1999, 0.97), 100.0).result, TradeResult::Failed);
    }

    #[test]
    fn test_failed_trade_has_zero_profit_and_fees() {
        let mut config = EngineConfig::default();
        config.execution.fee_bps = 50.0;
        let trade = FillSimulator::new(&config).simulate(3, &window(0.0, 0.9), 100.0);

        assert_eq!(trade.window_ref, 3);
        assert_eq!(trade.result, TradeResult::Failed);
        assert_eq!(trade.profit, 0.0);
        assert_eq!(trade.fees, 0.0);
    }

    #[test]
    fn test_profit_uses_entry_price() {
        let config = EngineConfig::default();
        let trade = FillSimulator::new(&config).simulate(0, &window(20.0, 0.97), 100.0);

        // min_combined_price is 0.5 but must not matter
        assert_eq!(trade.profit, 3.0);
        assert_eq!(trade.fees, 0.0);
        assert_eq!(trade.raw_edge, 0.03);
    }

    #[test]
    fn test_fees_reduce_profit() {
        let mut config = EngineConfig::default();
        config.execution.fee_bps = 10.0;
        let trade = FillSimulator::new(&config).simulate(0, &window(20.0, 0.97), 100.0);

        assert_eq!(trade.fees, 0.1);
        assert_eq!(trade.profit, 2.9);
    }

    #[test]
    fn test_simulate_all_is_independent_per_window() {
        let config = EngineConfig::default();
        let windows = vec![window(20.0, 0.98), window(0.5, 0.9), window(5.0, 0.95)];
        let trades = FillSimulator::new(&config).simulate_all(&windows, 50.0);

        assert_eq!(trades.len(), 3);
        assert_eq!(trades.iter().map(|t| t.window_ref).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(trades[1].result, TradeResult::Failed);
        assert_eq!(trades[0].profit, 1.0);
        assert_eq!(trades[2].profit, 2.5);
    }
}
