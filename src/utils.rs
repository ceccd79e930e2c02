use chrono::NaiveDate;

/// Placeholder shown when a time string cannot be read
pub const MISSING_TIME: &str = "-";

/// Placeholder shown when a date string cannot be read
pub const INVALID_DATE: &str = "Invalid Date";

/// Splits an `HH:MM[:SS]` string into its numeric parts.
///
/// Hour and minute must both parse; the seconds part is optional and comes
/// back as `None` when absent or not numeric. Ranges are not checked.
#[must_use]
pub fn parse_time_parts(raw: &str) -> Option<(i64, i64, Option<i64>)> {
    let mut parts = raw.split(':');
    let hours = parse_component(parts.next()?)?;
    let minutes = parse_component(parts.next()?)?;
    let seconds = parts.next().and_then(parse_component);
    Some((hours, minutes, seconds))
}

fn parse_component(part: &str) -> Option<i64> {
    part.trim().parse().ok()
}

/// Formats an `HH:MM` or `HH:MM:SS` string for display.
///
/// In 12-hour mode the hour is folded to `1..=12` and the AM/PM marker is
/// picked from the unconverted hour. Out-of-range values are formatted as
/// they are (`"25:70"` becomes `"01:70 PM"`), anything that does not parse
/// becomes `"-"`.
///
/// # Examples
///
/// ```
/// use mosque_times::utils::format_time;
///
/// assert_eq!(format_time("13:30", false, true), "13:30");
/// assert_eq!(format_time("13:30", false, false), "01:30 PM");
/// assert_eq!(format_time("13:30:45", true, true), "13:30:45");
/// assert_eq!(format_time("", false, false), "-");
/// ```
#[must_use]
pub fn format_time(raw: &str, include_seconds: bool, use_24_hour: bool) -> String {
    let Some((hours, minutes, seconds)) = parse_time_parts(raw) else {
        return MISSING_TIME.to_string();
    };

    let hour = if use_24_hour {
        hours
    } else {
        match hours % 12 {
            0 => 12,
            h => h,
        }
    };

    let mut formatted = format!("{hour:02}:{minutes:02}");

    if include_seconds {
        if let Some(seconds) = seconds {
            formatted.push_str(&format!(":{seconds:02}"));
        }
    }

    if !use_24_hour {
        formatted.push_str(if hours >= 12 { " PM" } else { " AM" });
    }

    formatted
}

/// Parses a `DD-MM-YYYY` feed date into a calendar date.
///
/// Returns `None` for anything that is not a real calendar day.
#[must_use]
pub fn parse_feed_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.split('-');
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Formats a `DD-MM-YYYY` date as e.g. `"Monday, 15 January 2024"`.
#[must_use]
pub fn format_date(raw: &str) -> String {
    parse_feed_date(raw).map_or_else(
        || INVALID_DATE.to_string(),
        |date| date.format("%A, %-d %B %Y").to_string(),
    )
}

/// Formats a `DD-MM-YYYY` date as e.g. `"Mon, 15 Jan"`.
#[must_use]
pub fn format_date_short(raw: &str) -> String {
    parse_feed_date(raw).map_or_else(
        || INVALID_DATE.to_string(),
        |date| date.format("%a, %-d %b").to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time_24_hour() {
        assert_eq!(format_time("13:30", false, true), "13:30");
        assert_eq!(format_time("09:15", false, true), "09:15");
        assert_eq!(format_time("00:00", false, true), "00:00");
        assert_eq!(format_time("5:7", false, true), "05:07");
    }

    #[test]
    fn test_format_time_12_hour() {
        assert_eq!(format_time("13:30", false, false), "01:30 PM");
        assert_eq!(format_time("09:15", false, false), "09:15 AM");
        assert_eq!(format_time("00:00", false, false), "12:00 AM");
        assert_eq!(format_time("12:00", false, false), "12:00 PM");
        assert_eq!(format_time("23:59", false, false), "11:59 PM");
    }

    #[test]
    fn test_format_time_seconds() {
        assert_eq!(format_time("13:30:45", true, true), "13:30:45");
        assert_eq!(format_time("13:30:45", true, false), "01:30:45 PM");
        // seconds are dropped unless asked for
        assert_eq!(format_time("13:30:45", false, true), "13:30");
        // and silently skipped when missing
        assert_eq!(format_time("13:30", true, true), "13:30");
        assert_eq!(format_time("13:30:xx", true, true), "13:30");
    }

    #[test]
    fn test_format_time_invalid_input() {
        assert_eq!(format_time("", false, false), "-");
        assert_eq!(format_time("invalid", false, false), "-");
        assert_eq!(format_time("13", false, false), "-");
        assert_eq!(format_time("ab:30", false, true), "-");
        assert_eq!(format_time("13:cd", false, true), "-");
    }

    #[test]
    fn test_format_time_does_not_validate_ranges() {
        assert_eq!(format_time("25:70", false, false), "01:70 PM");
        assert_eq!(format_time("25:70", false, true), "25:70");
    }

    #[test]
    fn test_format_time_12_hour_marker_for_every_hour() {
        for hour in 0..24 {
            let formatted = format_time(&format!("{hour}:05"), false, false);
            let expected_hour = if hour % 12 == 0 { 12 } else { hour % 12 };
            let expected_marker = if hour < 12 { "AM" } else { "PM" };
            assert_eq!(formatted, format!("{expected_hour:02}:05 {expected_marker}"));
        }
    }

    #[test]
    fn test_parse_time_parts() {
        assert_eq!(parse_time_parts("04:30"), Some((4, 30, None)));
        assert_eq!(parse_time_parts("04:30:15"), Some((4, 30, Some(15))));
        assert_eq!(parse_time_parts(" 4 : 30 "), Some((4, 30, None)));
        assert_eq!(parse_time_parts("4"), None);
    }

    #[test]
    fn test_format_date() {
        let result = format_date("15-01-2024");
        assert!(result.contains("January"));
        assert!(result.contains("2024"));
        assert_eq!(result, "Monday, 15 January 2024");

        assert!(format_date("01-01-2024").contains("January"));
        assert!(format_date("31-12-2024").contains("December"));
    }

    #[test]
    fn test_format_date_invalid() {
        assert_eq!(format_date("invalid-date"), "Invalid Date");
        assert_eq!(format_date(""), "Invalid Date");
        assert_eq!(format_date("31-02-2024"), "Invalid Date");
        assert_eq!(format_date("15-01"), "Invalid Date");
    }

    #[test]
    fn test_format_date_short() {
        let result = format_date_short("15-01-2024");
        assert!(result.contains("Jan"));
        assert!(result.contains("15"));
        assert_eq!(result, "Mon, 15 Jan");
        assert_eq!(format_date_short("invalid-date"), "Invalid Date");
    }
}
