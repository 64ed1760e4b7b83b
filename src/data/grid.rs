/// Fixed sampling timeline `start, start + interval, ...` with every anchor `< end`.
///
/// Exactly `floor((end - start) / interval)` anchors are produced, so a
/// trailing partial step never gets an anchor and coverage stays within 100%.
///
/// Callers guarantee `end > start` and `interval > 0`; an empty vector is
/// returned otherwise.
pub fn generate_anchors(start: i64, end: i64, interval: i64) -> Vec<i64> {
    if interval <= 0 || end <= start {
        return Vec::new();
    }

    let count = expected_anchor_count(start, end, interval);
    (0..count as i64).map(|i| start + i * interval).collect()
}

/// `floor((end - start) / interval)`, zero for degenerate inputs.
pub fn expected_anchor_count(start: i64, end: i64, interval: i64) -> usize {
    if interval <= 0 || end <= start {
        return 0;
    }
    ((end - start) / interval) as usize
}
