use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome label of a binary market. `Yes` is side A, `No` is side B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "YES",
            Side::No => "NO",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YES" | "UP" | "A" => Ok(Side::Yes),
            "NO" | "DOWN" | "B" => Ok(Side::No),
            other => Err(format!("Unknown side label: {}", other)),
        }
    }
}

/// One price observation for one side of a market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub market_id: String,
    /// Unix seconds.
    pub timestamp: i64,
    pub side: Side,
    pub mid_price: f64,
    pub last_price: f64,
    pub is_tradable: bool,
}

impl Snapshot {
    pub fn new(market_id: &str, timestamp: i64, side: Side, mid_price: f64) -> Self {
        Self {
            market_id: market_id.to_string(),
            timestamp,
            side,
            mid_price,
            last_price: mid_price,
            is_tradable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_labels() {
        assert_eq!("yes".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!(" Down ".parse::<Side>().unwrap(), Side::No);
        assert_eq!("B".parse::<Side>().unwrap(), Side::No);
        assert!("maybe".parse::<Side>().is_err());
        assert_eq!(Side::Yes.to_string(), "YES");
    }
}
