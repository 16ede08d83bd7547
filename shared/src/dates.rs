use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const CALENDAR_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` calendar date. ISO timestamps are accepted by dropping
/// everything from the `T` onwards; any other shape yields `None`.
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day_part = trimmed.split_once('T').map_or(trimmed, |(day, _)| day);

    // chrono tolerates unpadded fields, the wire format does not.
    let bytes = day_part.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(idx, b)| idx == 4 || idx == 7 || b.is_ascii_digit());
    if !well_formed {
        tracing::debug!(input = raw, "rejected calendar date with unexpected format");
        return None;
    }

    match NaiveDate::parse_from_str(day_part, CALENDAR_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!(input = raw, error = %e, "rejected invalid calendar date");
            None
        }
    }
}

/// Parse an optional raw date, treating blanks as absent.
pub fn parse_optional_date(raw: Option<&str>) -> Option<NaiveDate> {
    raw.filter(|value| !value.trim().is_empty())
        .and_then(parse_calendar_date)
}

pub fn format_calendar_date(date: NaiveDate) -> String {
    date.format(CALENDAR_DATE_FORMAT).to_string()
}

/// Inclusive reporting window at day granularity.
///
/// Dates are local-midnight values, so `start..=end` covers
/// `start 00:00:00` through `end 23:59:59`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Option<Self> {
        Self::new(parse_calendar_date(start)?, parse_calendar_date(end)?)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}
