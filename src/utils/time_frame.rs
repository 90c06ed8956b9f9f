//! Parsing of analytics time frames such as `5m`, `1hour` or `90`.

use chrono::Duration;

/// Error returned for an unparseable time frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time frame: {0}")]
pub struct InvalidTimeFrame(pub String);

/// Longest accepted window.
pub const MAX_TIME_FRAME_DAYS: i64 = 3650;

/// Parses a time frame into a window length.
///
/// Accepted forms (case-insensitive, surrounding whitespace ignored):
///
/// - Named windows: `1m|1min|1minute`, `5m|5min|5minutes`,
///   `15m|15min|15minutes`, `30m|30min|30minutes`, `1h|1hour`,
///   `24h|1d|1day`
/// - Durations built from `<n>h`, `<n>m` and `<n>s` parts, e.g. `10m`, `2h`,
///   `1h30m`, `45s`
/// - A bare integer, read as minutes
///
/// # Errors
///
/// Returns [`InvalidTimeFrame`] for anything else, including zero-length
/// windows and windows longer than [`MAX_TIME_FRAME_DAYS`].
///
/// # Examples
///
/// ```ignore
/// assert_eq!(parse_time_frame("1hour").unwrap(), Duration::hours(1));
/// assert_eq!(parse_time_frame("90").unwrap(), Duration::minutes(90));
/// ```
pub fn parse_time_frame(input: &str) -> Result<Duration, InvalidTimeFrame> {
    let normalized = input.trim().to_ascii_lowercase();
    let invalid = || InvalidTimeFrame(input.to_string());

    let duration = match normalized.as_str() {
        "1m" | "1min" | "1minute" => Duration::minutes(1),
        "5m" | "5min" | "5minutes" => Duration::minutes(5),
        "15m" | "15min" | "15minutes" => Duration::minutes(15),
        "30m" | "30min" | "30minutes" => Duration::minutes(30),
        "1h" | "1hour" => Duration::hours(1),
        "24h" | "1d" | "1day" => Duration::hours(24),
        other => match other.parse::<i64>() {
            Ok(minutes) => Duration::try_minutes(minutes).ok_or_else(invalid)?,
            Err(_) => parse_compound(other).ok_or_else(invalid)?,
        },
    };

    if duration <= Duration::zero() || duration > Duration::days(MAX_TIME_FRAME_DAYS) {
        return Err(invalid());
    }

    Ok(duration)
}

/// Parses `1h30m`-style durations; `None` on any malformed part.
fn parse_compound(input: &str) -> Option<Duration> {
    if input.is_empty() {
        return None;
    }

    let mut total = Duration::zero();
    let mut digits = String::new();

    for ch in input.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            continue;
        }

        let value: i64 = digits.parse().ok()?;
        digits.clear();

        let part = match ch {
            'h' => Duration::try_hours(value)?,
            'm' => Duration::try_minutes(value)?,
            's' => Duration::try_seconds(value)?,
            _ => return None,
        };
        total = total.checked_add(&part)?;
    }

    // Trailing digits without a unit.
    if !digits.is_empty() {
        return None;
    }

    Some(total)
}
