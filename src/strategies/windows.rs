use crate::config::PairingConfig;
use crate::strategies::types::{PricedTick, Window};
use tracing::debug;

enum StitchState {
    NoWindow,
    InWindow(OpenWindow),
}

/// Ticks of the window currently being stitched, plus its running prices.
struct OpenWindow {
    entry: f64,
    min: f64,
    exit: f64,
    ticks: Vec<PricedTick>,
}

impl OpenWindow {
    fn open(tick: PricedTick, price: f64) -> Self {
        Self {
            entry: price,
            min: price,
            exit: price,
            ticks: vec![tick],
        }
    }

    fn push(&mut self, tick: PricedTick, price: f64) {
        self.min = self.min.min(price);
        self.exit = price;
        self.ticks.push(tick);
    }

    fn close(self) -> Window {
        let start_time = self.ticks.first().map(|t| t.anchor()).unwrap_or_default();
        let end_time = self.ticks.last().map(|t| t.anchor()).unwrap_or(start_time);

        Window {
            start_time,
            end_time,
            duration: (end_time - start_time) as f64,
            entry_combined_price: self.entry,
            min_combined_price: self.min,
            exit_combined_price: self.exit,
            tick_count: self.ticks.len(),
            ticks: self.ticks,
        }
    }
}

/// Single-pass state machine that turns anchor-ordered ticks into raw windows.
///
/// Only one window is held open at a time. A tick that does not qualify
/// closes the open window at the last qualifying tick and is not part of it.
pub struct WindowStitcher<I> {
    ticks: I,
    state: StitchState,
}

impl<I> WindowStitcher<I>
where
    I: Iterator<Item = PricedTick>,
{
    pub fn new(ticks: I) -> Self {
        Self {
            ticks,
            state: StitchState::NoWindow,
        }
    }
}

impl<I> Iterator for WindowStitcher<I>
where
    I: Iterator<Item = PricedTick>,
{
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        loop {
            let Some(tick) = self.ticks.next() else {
                return match std::mem::replace(&mut self.state, StitchState::NoWindow) {
                    StitchState::InWindow(open) => Some(open.close()),
                    StitchState::NoWindow => None,
                };
            };

            match (tick.qualifies(), tick.combined_price) {
                (true, Some(price)) => match &mut self.state {
                    StitchState::NoWindow => {
                        self.state = StitchState::InWindow(OpenWindow::open(tick, price));
                    }
                    StitchState::InWindow(open) => open.push(tick, price),
                },
                _ => {
                    if let StitchState::InWindow(open) =
                        std::mem::replace(&mut self.state, StitchState::NoWindow)
                    {
                        return Some(open.close());
                    }
                }
            }
        }
    }
}

/// Minimum-viability check applied to each raw window independently.
pub fn is_viable(window: &Window, config: &PairingConfig) -> bool {
    window.duration >= config.min_window_duration_secs as f64
        && window.tick_count >= config.min_tick_count
        && window.ticks.iter().all(|t| t.is_valid() && t.is_arbitrage_opportunity)
}

/// Stitch `ticks` into windows and keep the viable ones.
///
/// Returns the validated windows and the number of raw windows seen.
pub fn stitch_and_validate(ticks: &[PricedTick], config: &PairingConfig) -> (Vec<Window>, usize) {
    let mut raw_count = 0;

    let windows = WindowStitcher::new(ticks.iter().cloned())
        .inspect(|_| raw_count += 1)
        .filter(|window| {
            let keep = is_viable(window, config);
            if !keep {
                debug!(
                    "Discarding window {}..{} (duration={}s, ticks={})",
                    window.start_time, window.end_time, window.duration, window.tick_count
                );
            }
            keep
        })
        .collect();

    (windows, raw_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::pairing::{PairedTick, SideMatch};

    /// Build one tick per anchor (5s apart). `None` is a missing side.
    fn ticks(prices: &[Option<f64>]) -> Vec<PricedTick> {
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                let anchor = 1_000 + 5 * i as i64;
                let side = SideMatch { timestamp: anchor, mid_price: 0.5, last_price: 0.5 };
                PricedTick {
                    tick: PairedTick {
                        anchor,
                        yes: Some(side),
                        no: price.map(|_| side),
                        is_missing: price.is_none(),
                        is_stale_pair: false,
                        is_valid: price.is_some(),
                    },
                    combined_price: *price,
                    is_arbitrage_opportunity: matches!(price, Some(p) if *p < 1.0),
                }
            })
            .collect()
    }

    fn stitch(prices: &[Option<f64>]) -> Vec<Window> {
        WindowStitcher::new(ticks(prices).into_iter()).collect()
    }

    #[test]
    fn test_single_run_closed_by_ineligible_tick() {
        let windows = stitch(&[Some(1.01), Some(0.98), Some(0.95), Some(0.97), Some(1.01)]);

        assert_eq!(windows.len(), 1);
        let w = &windows[0];
        assert_eq!(w.start_time, 1_005);
        assert_eq!(w.end_time, 1_015);
        assert_eq!(w.duration, 10.0);
        assert_eq!(w.tick_count, 3);
        assert_eq!(w.entry_combined_price, 0.98);
        assert_eq!(w.exit_combined_price, 0.97);
        assert_eq!(w.min_combined_price, 0.95);
    }

    #[test]
    fn test_window_open_at_end_of_data_is_emitted() {
        let windows = stitch(&[Some(1.01), Some(0.99), Some(0.99)]);

        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].end_time, 1_010);
    }

    #[test]
    fn test_gaps_are_never_merged() {
        let windows = stitch(&[Some(0.9), Some(0.9), None, Some(0.9), Some(1.0), Some(0.9)]);

        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].tick_count, 2);
        assert_eq!(windows[1].tick_count, 1);
        assert_eq!(windows[2].tick_count, 1);
    }

    #[test]
    fn test_windows_only_contain_qualifying_ticks() {
        let windows = stitch(&[
            Some(0.9), None, Some(0.95), Some(1.2), Some(0.8), Some(0.85), None, Some(0.99),
        ]);

        assert!(!windows.is_empty());
        for w in &windows {
            assert!(w.ticks.iter().all(|t| t.is_valid() && t.is_arbitrage_opportunity));
            assert!(w.ticks.iter().all(|t| w.min_combined_price <= t.combined_price.unwrap()));
            assert!(w.ticks.windows(2).all(|p| p[1].anchor() - p[0].anchor() == 5));
        }
    }

    #[test]
    fn test_no_qualifying_ticks_no_windows() {
        assert!(stitch(&[Some(1.0), None, Some(1.5)]).is_empty());
        assert!(stitch(&[]).is_empty());
    }

    #[test]
    fn test_single_tick_spike_is_filtered() {
        let config = PairingConfig::default();
        let (windows, raw) = stitch_and_validate(&ticks(&[Some(1.01), Some(0.5), Some(1.01)]), &config);

        assert_eq!(raw, 1);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_two_tick_window_filtered_even_at_deep_discount() {
        let config = PairingConfig::default();
        let (windows, raw) = stitch_and_validate(&ticks(&[Some(0.5), Some(0.5), Some(1.01)]), &config);

        assert_eq!(raw, 1);
        assert!(windows.is_empty());
    }

    #[test]
    fn test_three_tick_window_survives() {
        let config = PairingConfig::default();
        let (windows, raw) = stitch_and_validate(
            &ticks(&[Some(0.97), Some(0.97), Some(0.97), None, Some(0.9)]),
            &config,
        );

        assert_eq!(raw, 2);
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].duration, 10.0);
    }

    #[test]
    fn test_duration_threshold_independent_of_tick_count() {
        let config = PairingConfig {
            min_tick_count: 1,
            min_window_duration_secs: 10,
            ..PairingConfig::default()
        };
        let (windows, _) = stitch_and_validate(&ticks(&[Some(0.9), Some(0.9), None]), &config);
        assert!(windows.is_empty());
    }
}
