//! Week indexing for availability and booking maps.
//!
//! A [`WeekIndex`] is persisted verbatim inside reviewer documents, so its
//! string form (`"General"` or `"<week>-<year>"`) is a wire format.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

pub const GENERAL_INDEX: &str = "General";
pub const MAX_WEEK: u32 = 52;
const BUSINESS_WEEK_SPAN_DAYS: u64 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum WeekIndex {
    General,
    Week { year: i32, week: u32 },
}

impl WeekIndex {
    /// Week `0` is the recurring "General" index; any other value names a concrete week.
    pub fn from_week(week: u32, year: i32) -> Self {
        if week == 0 {
            Self::General
        } else {
            Self::Week { year, week }
        }
    }

    /// Like [`WeekIndex::from_week`], but rejects weeks outside `1..=52` and negative years.
    pub fn checked(week: u32, year: i32) -> Result<Self, DomainError> {
        if week == 0 {
            return Ok(Self::General);
        }
        validate_week(week, year)?;
        Ok(Self::Week { year, week })
    }

    pub fn is_general(&self) -> bool {
        matches!(self, Self::General)
    }

    /// `(week, year)` as rendered in dialogs and action payloads; General is week 0.
    pub fn week_and_year(&self, fallback_year: i32) -> (u32, i32) {
        match *self {
            Self::General => (0, fallback_year),
            Self::Week { year, week } => (week, year),
        }
    }

    pub fn label(&self) -> Result<String, DomainError> {
        match *self {
            Self::General => Ok(GENERAL_INDEX.to_owned()),
            Self::Week { year, week } => week_label(week, year),
        }
    }
}

impl fmt::Display for WeekIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::General => f.write_str(GENERAL_INDEX),
            Self::Week { year, week } => write!(f, "{week}-{year}"),
        }
    }
}

impl FromStr for WeekIndex {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == GENERAL_INDEX {
            return Ok(Self::General);
        }

        let invalid = || DomainError::InvalidWeekIndex(value.to_owned());
        let (week, year) = value.split_once('-').ok_or_else(invalid)?;
        let week = week.parse::<u32>().map_err(|_| invalid())?;
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        if week == 0 {
            return Err(invalid());
        }
        validate_week(week, year).map_err(|_| invalid())?;

        Ok(Self::Week { year, week })
    }
}

impl TryFrom<String> for WeekIndex {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WeekIndex> for String {
    fn from(value: WeekIndex) -> Self {
        value.to_string()
    }
}

fn validate_week(week: u32, year: i32) -> Result<(), DomainError> {
    if week == 0 || week > MAX_WEEK || year < 0 {
        return Err(DomainError::InvalidWeek { week, year });
    }
    Ok(())
}

/// Normalizes a date to the Monday starting its week. Sunday moves forward to
/// the following Monday rather than back to the previous one.
pub fn first_day_of_week(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sun => date.checked_add_days(Days::new(1)).unwrap_or(date),
        weekday => date
            .checked_sub_days(Days::new(u64::from(weekday.num_days_from_monday())))
            .unwrap_or(date),
    }
}

/// Monday of week `week` in `year`, counted in whole weeks from January 1st.
pub fn week_start(week: u32, year: i32) -> Result<NaiveDate, DomainError> {
    validate_week(week, year)?;
    let january_first =
        NaiveDate::from_ymd_opt(year, 1, 1).ok_or(DomainError::InvalidWeek { week, year })?;
    let offset = Days::new(7 * u64::from(week - 1));
    let date = january_first
        .checked_add_days(offset)
        .ok_or(DomainError::InvalidWeek { week, year })?;
    Ok(first_day_of_week(date))
}

/// Renders a Monday-to-Friday label such as `Week 5 : January 29 - February 2`.
///
/// The number shown is the ISO week of the normalized Monday, which can differ
/// from `week` around year boundaries.
pub fn week_label(week: u32, year: i32) -> Result<String, DomainError> {
    Ok(describe_week(week_start(week, year)?))
}

pub fn describe_week(monday: NaiveDate) -> String {
    let friday = monday.checked_add_days(Days::new(BUSINESS_WEEK_SPAN_DAYS)).unwrap_or(monday);
    format!(
        "Week {} : {} - {}",
        monday.iso_week().week(),
        monday.format("%B %-d"),
        friday.format("%B %-d")
    )
}

/// ISO `(week, year)` for `today`.
pub fn current_week(today: NaiveDate) -> (u32, i32) {
    let iso = today.iso_week();
    (iso.week(), iso.year())
}

/// First indexable `(week, year)` from `today`, Monday-normalized like the week picker.
///
/// Inside ISO week 53 this is week 1 of the following year.
pub fn bookable_week(today: NaiveDate) -> (u32, i32) {
    upcoming_weeks(today, 1, false)
        .first()
        .map_or_else(|| current_week(today), |option| (option.week, option.year))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WeekOption {
    pub label: String,
    pub week: u32,
    pub year: i32,
}

impl WeekOption {
    pub fn index(&self) -> WeekIndex {
        WeekIndex::from_week(self.week, self.year)
    }
}

/// Week picker entries starting at the current (Monday-normalized) week.
///
/// ISO week 53 cannot be indexed, so it is skipped and the following week takes its place.
pub fn upcoming_weeks(today: NaiveDate, count: usize, include_general: bool) -> Vec<WeekOption> {
    let mut monday = first_day_of_week(today);
    let mut options = Vec::with_capacity(count + usize::from(include_general));

    if include_general {
        options.push(WeekOption {
            label: "All Weeks".to_owned(),
            week: 0,
            year: monday.iso_week().year(),
        });
    }

    let mut produced = 0;
    while produced < count {
        let iso = monday.iso_week();
        if iso.week() <= MAX_WEEK {
            options.push(WeekOption {
                label: describe_week(monday),
                week: iso.week(),
                year: iso.year(),
            });
            produced += 1;
        }
        match monday.checked_add_days(Days::new(7)) {
            Some(next) => monday = next,
            None => break,
        }
    }

    options
}
