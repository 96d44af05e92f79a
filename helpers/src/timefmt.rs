use std::time::Duration;

/// format_hms formats a whole number of seconds as H:MM:SS. Hours are not zero-padded and keep
/// counting beyond 24 (no day part).
pub fn format_hms(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let mins = total_secs % 3600 / 60;
    let secs = total_secs % 60;

    format!("{}:{:02}:{:02}", hours, mins, secs)
}

/// trunc_to_secs cuts a duration down to whole seconds.
pub fn trunc_to_secs(duration: Duration) -> Duration {
    Duration::from_secs(duration.as_secs())
}
