use crate::data::pairing::PairedTick;
use crate::strategies::types::PricedTick;

/// Payout of a complete YES + NO set.
pub const GUARANTEED_PAYOUT: f64 = 1.0;

/// Combined cost of buying both sides at `mid + spread_proxy`.
///
/// Returns `None` for invalid pairs and for any non-finite result.
pub fn combined_price(tick: &PairedTick, spread_proxy: f64) -> Option<f64> {
    if !tick.is_valid {
        return None;
    }

    let (yes, no) = (tick.yes?, tick.no?);
    let ask_yes = yes.mid_price + spread_proxy;
    let ask_no = no.mid_price + spread_proxy;
    let combined = ask_yes + ask_no;

    combined.is_finite().then_some(combined)
}

pub fn classify_tick(tick: PairedTick, spread_proxy: f64) -> PricedTick {
    let combined = combined_price(&tick, spread_proxy);
    let is_arbitrage_opportunity = matches!(combined, Some(c) if c < GUARANTEED_PAYOUT);

    let mut tick = tick;
    if tick.is_valid && combined.is_none() {
        // Non-finite prices are treated as bad data
        tick.is_valid = false;
    }

    PricedTick {
        tick,
        combined_price: combined,
        is_arbitrage_opportunity,
    }
}

pub fn classify_ticks(ticks: Vec<PairedTick>, spread_proxy: f64) -> Vec<PricedTick> {
    ticks
        .into_iter()
        .map(|tick| classify_tick(tick, spread_proxy))
        .collect()
}
