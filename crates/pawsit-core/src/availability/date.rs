//! Civil-date canonicalization at the calendar boundary.
//!
//! Calendar widgets hand out instants (midnight in the widget's time zone).
//! Converting those to UTC before taking the date shifts every selection by
//! one day east of Greenwich, so the date is taken in the instant's own
//! zone. Everything past this module works on `NaiveDate` only.

use chrono::{DateTime, NaiveDate, TimeZone};

use crate::error::AvailabilityError;

/// Wire and display format of a civil date.
pub const CIVIL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` string.
pub fn parse_civil_date(raw: &str) -> Result<NaiveDate, AvailabilityError> {
    let trimmed = raw.trim();
    let bytes = trimmed.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes.get(4) == Some(&b'-')
        && bytes.get(7) == Some(&b'-');
    if !well_formed {
        return Err(AvailabilityError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(trimmed, CIVIL_DATE_FORMAT)
        .map_err(|_| AvailabilityError::InvalidDate(raw.to_string()))
}

pub fn format_civil_date(date: NaiveDate) -> String {
    date.format(CIVIL_DATE_FORMAT).to_string()
}

/// The calendar day `instant` falls on in its own time zone.
pub fn canonical_date<Tz: TimeZone>(instant: &DateTime<Tz>) -> NaiveDate {
    instant.date_naive()
}

/// Parse a full calendar selection; fails on the first malformed entry.
pub fn parse_selection<I, S>(raw: I) -> Result<Vec<NaiveDate>, AvailabilityError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .map(|s| parse_civil_date(s.as_ref()))
        .collect()
}
