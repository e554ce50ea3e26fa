/// Formats a duration in seconds the way the status lines show uptimes and
/// runtimes: `H:MM:SS`, prefixed with the day count when it exceeds a day.
pub fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let days = total_seconds / 86_400;
    let rest = total_seconds % 86_400;
    let hours = rest / 3_600;
    let minutes = (rest % 3_600) / 60;
    let seconds = rest % 60;

    match days {
        0 => format!("{}:{:02}:{:02}", hours, minutes, seconds),
        1 => format!("1 day, {}:{:02}:{:02}", hours, minutes, seconds),
        n => format!("{} days, {}:{:02}:{:02}", n, hours, minutes, seconds),
    }
}

pub fn bytes_to_gb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 / 1024.0).round()
}

pub fn bytes_to_tb(bytes: u64) -> f64 {
    let tb = bytes as f64 / 1024.0 / 1024.0 / 1024.0 / 1024.0;
    (tb * 100.0).round() / 100.0
}
