use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::calendar::WeekStart;

const WEEK_HEADER_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// The scheduling tool labels weeks by their Sunday, e.g. "15 Feb 2026".
const SCHEDULER_HEADER_FORMAT: &str = "%d %b %Y";

/// Parses `YYYY-MM-DD`, `YYYY/MM/DD` or `MM/DD/YYYY` into the week containing
/// that date. Labels like "Person" yield `None`.
pub fn parse_week_header(text: &str) -> Option<WeekStart> {
    let text = text.trim();
    WEEK_HEADER_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(WeekStart::of)
}

/// Parses a scheduling tool header. The Sunday it names is shifted one day
/// forward to the Monday that starts the same working week.
pub fn parse_float_week_header(text: &str) -> Option<WeekStart> {
    let sunday = NaiveDate::parse_from_str(text.trim(), SCHEDULER_HEADER_FORMAT).ok()?;
    Some(WeekStart::of(sunday + Duration::days(1)))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderColumn {
    pub index: usize,
    pub text: String,
    pub week: Option<WeekStart>,
}

/// Maps a header row to week columns, trying the internal formats before the
/// scheduling tool format.
pub fn parse_header_row<S: AsRef<str>>(headers: &[S]) -> Vec<HeaderColumn> {
    headers
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let text = text.as_ref();
            HeaderColumn {
                index,
                text: text.to_string(),
                week: parse_week_header(text).or_else(|| parse_float_week_header(text)),
            }
        })
        .collect()
}
