use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use crate::error::{Error, Result};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn from_rfc3339(s: &str) -> std::result::Result<DateTime<Utc>, chrono::ParseError> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}

/// Parses a `startDate`/`endDate` query bound. Accepts RFC 3339 or a bare `YYYY-MM-DD`;
/// a bare end date covers the whole day.
pub fn parse_range_bound(s: &str, end_of_day: bool) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = from_rfc3339(s) {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::InvalidArgument(format!("Invalid date: {}", s)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        Some(NaiveTime::MIN)
    }
    .ok_or_else(|| Error::Internal("invalid time of day".into()))?;
    Ok(date.and_time(time).and_utc())
}

/// `M/D/YYYY`, as shown in the export's Applied Date column.
pub fn format_short_date(dt: DateTime<Utc>) -> String {
    dt.format("%-m/%-d/%Y").to_string()
}

/// `Saturday, March 1, 2025`
pub fn format_long_date(dt: DateTime<Utc>) -> String {
    dt.format("%A, %B %-d, %Y").to_string()
}

/// `09:00 UTC`
pub fn format_clock_time(dt: DateTime<Utc>) -> String {
    dt.format("%H:%M UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        from_rfc3339(s).unwrap()
    }

    #[test]
    fn date_only_bounds_span_the_day() {
        let start = parse_range_bound("2025-01-10", false).unwrap();
        let end = parse_range_bound("2025-01-10", true).unwrap();
        assert_eq!(start, at("2025-01-10T00:00:00Z"));
        assert_eq!(end, at("2025-01-10T23:59:59.999Z"));
    }

    #[test]
    fn rfc3339_bounds_are_taken_verbatim() {
        let b = parse_range_bound("2025-01-10T08:30:00+01:00", true).unwrap();
        assert_eq!(b, at("2025-01-10T07:30:00Z"));
        assert!(parse_range_bound("10/01/2025", false).is_err());
    }

    #[test]
    fn formats() {
        let dt = at("2025-03-01T09:00:00Z");
        assert_eq!(format_short_date(dt), "3/1/2025");
        assert_eq!(format_long_date(dt), "Saturday, March 1, 2025");
        assert_eq!(format_clock_time(dt), "09:00 UTC");
    }
}
