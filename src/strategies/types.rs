use serde::{Deserialize, Serialize};
use crate::data::pairing::PairedTick;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedTick {
    pub tick: PairedTick,
    /// Sum of both synthetic asks; `None` when the tick is invalid.
    pub combined_price: Option<f64>,
    pub is_arbitrage_opportunity: bool,
}

impl PricedTick {
    pub fn anchor(&self) -> i64 {
        self.tick.anchor
    }

    pub fn is_valid(&self) -> bool {
        self.tick.is_valid
    }

    /// Whether this tick may open or extend a window.
    pub fn qualifies(&self) -> bool {
        self.tick.is_valid && self.is_arbitrage_opportunity && self.combined_price.is_some()
    }
}

/// A maximal contiguous run of qualifying ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start_time: i64,
    pub end_time: i64,
    /// Seconds between the first and last tick.
    pub duration: f64,
    pub entry_combined_price: f64,
    /// Lowest combined price over every tick in the window.
    pub min_combined_price: f64,
    pub exit_combined_price: f64,
    pub tick_count: usize,
    pub ticks: Vec<PricedTick>,
}
