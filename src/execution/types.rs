use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Completed,
    Failed,
}

impl TradeResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::Completed => "completed",
            TradeResult::Failed => "failed",
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Simulated execution against one validated window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Index of the window in the run's validated window list.
    pub window_ref: usize,
    pub result: TradeResult,
    /// `1.0 - entry_combined_price` of the window.
    pub raw_edge: f64,
    pub profit: f64,
    pub fees: f64,
}

impl Trade {
    pub fn is_completed(&self) -> bool {
        self.result == TradeResult::Completed
    }
}
