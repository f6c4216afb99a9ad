//! Playback helpers.

/// Format a duration in seconds as `m:ss`, rounding to the nearest second.
///
/// Returns an empty string for non-finite input.
pub fn format_duration(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::new();
    }
    let total = seconds.round().max(0.0) as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
