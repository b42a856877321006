pub fn format_duration_ms(ms: u64) -> String {
    let secs = ms / 1000;

    if secs < 1 {
        format!("{}ms", ms)
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        let minutes = secs / 60;
        let seconds = secs % 60;
        format!("{}m {}s", minutes, seconds)
    } else {
        let hours = secs / 3600;
        let minutes = (secs % 3600) / 60;
        format!("{}h {}m", hours, minutes)
    }
}
