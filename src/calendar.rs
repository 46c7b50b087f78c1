use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Monday of a Monday–Sunday week, in UTC. Never carries a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "NaiveDate", into = "NaiveDate")]
pub struct WeekStart(NaiveDate);

impl WeekStart {
    pub fn of(date: NaiveDate) -> Self {
        let offset = date.weekday().num_days_from_monday();
        Self(date - Duration::days(i64::from(offset)))
    }

    pub fn of_instant(instant: DateTime<Utc>) -> Self {
        Self::of(instant.date_naive())
    }

    pub fn date(self) -> NaiveDate {
        self.0
    }

    pub fn starts_at(self) -> DateTime<Utc> {
        self.0.and_time(NaiveTime::MIN).and_utc()
    }

    pub fn last_day(self) -> NaiveDate {
        self.0 + Duration::days(6)
    }

    pub fn next(self) -> Self {
        Self(self.0 + Duration::days(7))
    }

    pub fn previous(self) -> Self {
        Self(self.0 - Duration::days(7))
    }

    pub fn key(self) -> String {
        format_week_key(self.0)
    }

    pub fn short(self) -> String {
        format_week_short(self.0)
    }
}

impl From<NaiveDate> for WeekStart {
    fn from(date: NaiveDate) -> Self {
        Self::of(date)
    }
}

impl From<WeekStart> for NaiveDate {
    fn from(week: WeekStart) -> Self {
        week.0
    }
}

impl fmt::Display for WeekStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

/// The instant separating completed weeks from the rest.
///
/// Derived from "now" it is always Sunday 23:59:59.999 UTC of the week before
/// the one containing now. An injected instant is taken as given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AsOf(DateTime<Utc>);

impl AsOf {
    pub fn from_now(now: DateTime<Utc>) -> Self {
        Self(WeekStart::of_instant(now).starts_at() - Duration::milliseconds(1))
    }

    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    pub fn instant(self) -> DateTime<Utc> {
        self.0
    }

    pub fn date(self) -> NaiveDate {
        self.0.date_naive()
    }

    /// True when the week started on or before this boundary.
    pub fn includes(self, week: WeekStart) -> bool {
        week.starts_at() <= self.0
    }
}

impl fmt::Display for AsOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeekClass {
    Completed,
    Current,
    Future,
}

impl WeekClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeekClass::Completed => "completed",
            WeekClass::Current => "current",
            WeekClass::Future => "future",
        }
    }
}

/// Reference clock for one batch: the "now" instant and the as-of boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reference {
    now: DateTime<Utc>,
    as_of: AsOf,
}

impl Reference {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now,
            as_of: AsOf::from_now(now),
        }
    }

    /// Uses an injected boundary; "now" is placed one day later, inside the
    /// current week.
    pub fn from_as_of(as_of: AsOf) -> Self {
        Self {
            now: as_of.instant() + Duration::days(1),
            as_of,
        }
    }

    pub fn new(now: DateTime<Utc>, as_of: AsOf) -> Self {
        Self { now, as_of }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn as_of(&self) -> AsOf {
        self.as_of
    }

    pub fn today(&self) -> NaiveDate {
        self.now.date_naive()
    }

    /// The week immediately after the as-of boundary.
    pub fn current_week(&self) -> WeekStart {
        WeekStart::of_instant(self.as_of.instant() + Duration::days(1))
    }

    pub fn classify(&self, week: WeekStart) -> WeekClass {
        if week == self.current_week() {
            WeekClass::Current
        } else if self.as_of.includes(week) {
            WeekClass::Completed
        } else {
            WeekClass::Future
        }
    }
}

/// A project's calendar extent. `end_date = None` means ongoing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpan {
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl ProjectSpan {
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    pub fn start_week(&self) -> WeekStart {
        WeekStart::of(self.start_date)
    }

    /// Last week of the span. Open-ended spans run through the later of the
    /// week containing today and the current week.
    pub fn end_week(&self, reference: &Reference) -> WeekStart {
        match self.end_date {
            Some(end) => WeekStart::of(end),
            None => WeekStart::of(reference.today()).max(reference.current_week()),
        }
    }

    pub fn weeks(&self, reference: &Reference) -> Vec<WeekStart> {
        week_range(self.start_week(), self.end_week(reference))
    }

    /// Same range as [`ProjectSpan::weeks`].
    pub fn contains_week(&self, week: WeekStart, reference: &Reference) -> bool {
        week >= self.start_week() && week <= self.end_week(reference)
    }

    pub fn is_active(&self, reference: &Reference) -> bool {
        self.end_date
            .map_or(true, |end| end >= reference.as_of().date())
    }
}

pub fn week_start_of(date: NaiveDate) -> WeekStart {
    WeekStart::of(date)
}

pub fn as_of_date(now: DateTime<Utc>) -> AsOf {
    AsOf::from_now(now)
}

fn week_range(first: WeekStart, last: WeekStart) -> Vec<WeekStart> {
    let mut weeks = Vec::new();
    let mut week = first;
    while week <= last {
        weeks.push(week);
        week = week.next();
    }
    weeks
}

pub fn all_weeks(start: NaiveDate, end: Option<NaiveDate>, today: NaiveDate) -> Vec<WeekStart> {
    week_range(WeekStart::of(start), WeekStart::of(end.unwrap_or(today)))
}

pub fn completed_weeks(
    start: NaiveDate,
    end: Option<NaiveDate>,
    reference: &Reference,
) -> Vec<WeekStart> {
    ProjectSpan::new(start, end)
        .weeks(reference)
        .into_iter()
        .filter(|week| is_completed_week(*week, reference))
        .collect()
}

/// Weeks strictly after the current week.
pub fn future_weeks(
    start: NaiveDate,
    end: Option<NaiveDate>,
    reference: &Reference,
) -> Vec<WeekStart> {
    ProjectSpan::new(start, end)
        .weeks(reference)
        .into_iter()
        .filter(|week| is_future_week(*week, reference))
        .collect()
}

pub fn is_completed_week(week: WeekStart, reference: &Reference) -> bool {
    reference.classify(week) == WeekClass::Completed
}

pub fn is_future_week(week: WeekStart, reference: &Reference) -> bool {
    reference.classify(week) == WeekClass::Future
}

/// Whether `week` contains `reference_now`. Independent of the as-of boundary.
pub fn is_current_week(week: WeekStart, reference_now: DateTime<Utc>) -> bool {
    week == WeekStart::of_instant(reference_now)
}

pub fn format_week_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_week_short(date: NaiveDate) -> String {
    format!("{}/{:02}", date.month(), date.day())
}
