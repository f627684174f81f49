//! Calendar periods used as aggregation buckets.
//!
//! A [Period] is an inclusive date range whose length is set by a [Cadence].
//! Weeks start on Monday. Quarters and half-years are fixed to the calendar
//! (Jan-Mar, Apr-Jun, ... and Jan-Jun, Jul-Dec).

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{Date, Duration, Month};

use crate::Error;

/// How often a budget resets, and the length of the periods it is tracked over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cadence {
    /// Monday to Sunday.
    Weekly,
    /// A calendar month.
    Monthly,
    /// A calendar quarter.
    Quarterly,
    /// January to June, or July to December.
    Biannually,
    /// A calendar year.
    Annually,
}

impl Cadence {
    /// Every cadence, shortest first.
    pub const ALL: [Cadence; 5] = [
        Cadence::Weekly,
        Cadence::Monthly,
        Cadence::Quarterly,
        Cadence::Biannually,
        Cadence::Annually,
    ];

    /// The string used for this cadence in the database and in requests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Biannually => "biannually",
            Self::Annually => "annually",
        }
    }
}

impl FromStr for Cadence {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Cadence::ALL
            .into_iter()
            .find(|cadence| cadence.as_str() == s)
            .ok_or_else(|| Error::InvalidCadence(s.to_owned()))
    }
}

impl Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    /// The first day of the period.
    pub start: Date,
    /// The last day of the period.
    pub end: Date,
}

impl Period {
    /// Whether `date` falls on or between the start and end of the period.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }

    /// The short name of the month the period starts in, e.g. "Jan".
    ///
    /// The year is not included, so callers must not mix periods that are a
    /// year or more apart.
    pub fn label_month(&self) -> String {
        month_abbrev(self.start.month()).to_owned()
    }

    /// The start of the period as month and ordinal day, e.g. "Feb 1st".
    pub fn label_start(&self) -> String {
        Self::label_for_start(self.start)
    }

    /// Format a period start date as month and ordinal day, e.g. "Feb 1st".
    pub fn label_for_start(start: Date) -> String {
        let day = start.day();

        format!("{} {day}{}", month_abbrev(start.month()), ordinal_suffix(day))
    }
}

/// Get the period of length `cadence` that contains `date`.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if the week containing `date` runs past the
/// first or last representable date.
pub fn period_containing(date: Date, cadence: Cadence) -> Result<Period, Error> {
    match cadence {
        Cadence::Weekly => week_bounds(date),
        Cadence::Monthly => Ok(month_containing(date)),
        Cadence::Quarterly => Ok(quarter_bounds(date.year(), date.month())),
        Cadence::Biannually => Ok(half_year_bounds(date.year(), date.month())),
        Cadence::Annually => Ok(year_bounds(date.year())),
    }
}

/// Get the calendar month that contains `date`.
pub fn month_containing(date: Date) -> Period {
    month_bounds(date.year(), date.month())
}

/// Snap `date` down to the first day of the period that contains it.
///
/// # Errors
/// Returns [Error::DateOutOfRange] under the same conditions as [period_containing].
pub fn snap_to_period_start(date: Date, cadence: Cadence) -> Result<Date, Error> {
    period_containing(date, cadence).map(|period| period.start)
}

/// Get the period containing `anchor` followed by the `count - 1` periods
/// before it, most recent first.
///
/// # Errors
/// Returns [Error::InvalidPeriodCount] if `count` is zero or the periods would
/// run past the earliest representable date, or [Error::DateOutOfRange] if the
/// week containing `anchor` runs past the last one.
pub fn bucket_periods(anchor: Date, cadence: Cadence, count: usize) -> Result<Vec<Period>, Error> {
    if count == 0 {
        return Err(Error::InvalidPeriodCount);
    }

    let mut periods = Vec::with_capacity(count);
    let mut current = period_containing(anchor, cadence)?;
    periods.push(current);

    while periods.len() < count {
        let day_before = current.start.previous_day().ok_or(Error::InvalidPeriodCount)?;
        current = period_containing(day_before, cadence).map_err(|_| Error::InvalidPeriodCount)?;
        periods.push(current);
    }

    Ok(periods)
}

/// Get every period from the one containing `as_of` back to the one
/// containing `first`, most recent first.
///
/// Returns an empty list if `first` is after `as_of`.
///
/// # Errors
/// Returns [Error::DateOutOfRange] if a week at either end runs past the
/// representable dates.
pub fn periods_since(first: Date, as_of: Date, cadence: Cadence) -> Result<Vec<Period>, Error> {
    if first > as_of {
        return Ok(Vec::new());
    }

    let first_start = snap_to_period_start(first, cadence)?;
    let mut periods = Vec::new();
    let mut current = period_containing(as_of, cadence)?;

    loop {
        periods.push(current);

        if current.start <= first_start {
            break;
        }

        match current.start.previous_day() {
            Some(day_before) => current = period_containing(day_before, cadence)?,
            None => break,
        }
    }

    Ok(periods)
}

fn week_bounds(date: Date) -> Result<Period, Error> {
    let days_since_monday = date.weekday().number_days_from_monday() as i64;
    let start = date
        .checked_sub(Duration::days(days_since_monday))
        .ok_or(Error::DateOutOfRange(date))?;
    let end = start
        .checked_add(Duration::days(6))
        .ok_or(Error::DateOutOfRange(date))?;

    Ok(Period { start, end })
}

fn month_bounds(year: i32, month: Month) -> Period {
    Period {
        start: Date::from_calendar_date(year, month, 1).expect("invalid month start date"),
        end: Date::from_calendar_date(year, month, last_day_of_month(year, month))
            .expect("invalid month end date"),
    }
}

fn quarter_bounds(year: i32, month: Month) -> Period {
    let quarter_start = ((month as u8 - 1) / 3) * 3 + 1;
    let start_month = Month::try_from(quarter_start).expect("invalid quarter start month");
    let end_month = Month::try_from(quarter_start + 2).expect("invalid quarter end month");

    Period {
        start: Date::from_calendar_date(year, start_month, 1).expect("invalid quarter start date"),
        end: Date::from_calendar_date(year, end_month, last_day_of_month(year, end_month))
            .expect("invalid quarter end date"),
    }
}

fn half_year_bounds(year: i32, month: Month) -> Period {
    let (start_month, end_month) = if month as u8 >= 7 {
        (Month::July, Month::December)
    } else {
        (Month::January, Month::June)
    };

    Period {
        start: Date::from_calendar_date(year, start_month, 1)
            .expect("invalid half-year start date"),
        end: Date::from_calendar_date(year, end_month, last_day_of_month(year, end_month))
            .expect("invalid half-year end date"),
    }
}

fn year_bounds(year: i32) -> Period {
    Period {
        start: Date::from_calendar_date(year, Month::January, 1).expect("invalid year start date"),
        end: Date::from_calendar_date(year, Month::December, 31).expect("invalid year end date"),
    }
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}

/// The three letter abbreviation for `month`, e.g. "Jan".
pub(crate) fn month_abbrev(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

fn ordinal_suffix(day: u8) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
