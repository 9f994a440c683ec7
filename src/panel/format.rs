/// Format milliseconds as `HH:MM:SS.mmm`.
///
/// Hours are not wrapped, so very long media shows e.g. `100:00:00.000`.
pub fn format_time(milliseconds: u64) -> String {
    let total_seconds = milliseconds / 1000;
    let millis = milliseconds % 1000;
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
