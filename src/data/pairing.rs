use serde::{Deserialize, Serialize};
use crate::data::types::{Side, Snapshot};

/// The snapshot a side was matched to at one anchor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideMatch {
    pub timestamp: i64,
    pub mid_price: f64,
    pub last_price: f64,
}

impl From<&Snapshot> for SideMatch {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp,
            mid_price: snapshot.mid_price,
            last_price: snapshot.last_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairedTick {
    pub anchor: i64,
    pub yes: Option<SideMatch>,
    pub no: Option<SideMatch>,
    /// At least one side had no snapshot within the pairing delta.
    pub is_missing: bool,
    /// Both sides matched but their timestamps are more than the delta apart.
    pub is_stale_pair: bool,
    pub is_valid: bool,
}

impl PairedTick {
    fn new(anchor: i64, yes: Option<SideMatch>, no: Option<SideMatch>, max_delta: i64) -> Self {
        let is_missing = yes.is_none() || no.is_none();
        let is_stale_pair = match (&yes, &no) {
            (Some(y), Some(n)) => (y.timestamp - n.timestamp).abs() > max_delta,
            _ => false,
        };

        Self {
            anchor,
            yes,
            no,
            is_missing,
            is_stale_pair,
            is_valid: !is_missing && !is_stale_pair,
        }
    }
}

/// Split snapshots into per-side series sorted ascending by timestamp.
///
/// The sort is stable, so duplicate timestamps keep their input order and the
/// first one wins during matching.
pub fn split_sides(snapshots: &[Snapshot], require_tradable: bool) -> (Vec<Snapshot>, Vec<Snapshot>) {
    let (mut yes, mut no): (Vec<Snapshot>, Vec<Snapshot>) = snapshots
        .iter()
        .filter(|s| !require_tradable || s.is_tradable)
        .cloned()
        .partition(|s| s.side == Side::Yes);

    yes.sort_by_key(|s| s.timestamp);
    no.sort_by_key(|s| s.timestamp);

    (yes, no)
}

/// Closest snapshot to `anchor` within `max_delta` seconds; the earlier one wins ties.
///
/// `series` must be sorted ascending by timestamp.
pub fn closest_within(series: &[Snapshot], anchor: i64, max_delta: i64) -> Option<&Snapshot> {
    let idx = series.partition_point(|s| s.timestamp < anchor);

    // First snapshot of the latest timestamp strictly before the anchor
    let before = idx.checked_sub(1).map(|i| {
        let ts = series[i].timestamp;
        &series[series.partition_point(|s| s.timestamp < ts)]
    });
    let after = series.get(idx);

    let best = match (before, after) {
        (Some(b), Some(a)) => {
            if anchor - b.timestamp <= a.timestamp - anchor {
                b
            } else {
                a
            }
        }
        (Some(b), None) => b,
        (None, Some(a)) => a,
        (None, None) => return None,
    };

    if (best.timestamp - anchor).abs() <= max_delta {
        Some(best)
    } else {
        None
    }
}

/// Match both sorted side series against every anchor independently.
pub fn pair_ticks(anchors: &[i64], yes: &[Snapshot], no: &[Snapshot], max_delta: i64) -> Vec<PairedTick> {
    anchors
        .iter()
        .map(|&anchor| {
            let yes_match = closest_within(yes, anchor, max_delta).map(SideMatch::from);
            let no_match = closest_within(no, anchor, max_delta).map(SideMatch::from);
            PairedTick::new(anchor, yes_match, no_match, max_delta)
        })
        .collect()
}
