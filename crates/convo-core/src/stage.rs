//! Coarse progress labeling for the presentation layer.

/// Map the accumulated turn count to a human label against the expected
/// total for this kind of session. Fixed thresholds, display-only; never
/// gates a transition.
pub fn stage_label(turn_count: usize, expected_total: u32) -> &'static str {
    let expected = expected_total.max(1) as usize;
    let pct = turn_count * 100 / expected;
    if pct < 35 {
        "early"
    } else if pct < 70 {
        "mid"
    } else if pct < 100 {
        "late"
    } else {
        "wrap-up"
    }
}
