//! Holiday calendars and nearest-holiday search.
//!
//! Calendars are computed locally with `chrono` for the regions the supported
//! operators run in: fixed-date rules, nth-weekday-of-month rules, and the
//! Gregorian Easter computus for the movable feasts.

use anyhow::{anyhow, Result};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::BTreeMap;

use crate::process::table::Table;

/// Farthest offset (in days) the nearest-holiday scan will look in one
/// direction. Every supported calendar has at least one holiday per rolling
/// year, so the scan always terminates well before this.
const MAX_SCAN_DAYS: u64 = 365;

/// Holiday jurisdiction of an operator's service area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HolidayRegion {
    /// Canada, Quebec (Bixi / Montreal).
    CaQc,
    /// Canada, Ontario (Bike Share Toronto).
    CaOn,
    /// United States, New York (Citi Bike).
    UsNy,
    /// United States, District of Columbia (Capital Bikeshare).
    UsDc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

/// An ordered, deduplicated `date -> holiday name` map covering a fixed span
/// of years.
#[derive(Debug, Clone)]
pub struct HolidayCalendar {
    days: BTreeMap<NaiveDate, &'static str>,
}

impl HolidayCalendar {
    /// Build a calendar for `region` covering `years` inclusive.
    pub fn for_years(region: HolidayRegion, years: std::ops::RangeInclusive<i32>) -> Self {
        let mut days = BTreeMap::new();
        for year in years {
            for (date, name) in holidays_in_year(region, year) {
                days.insert(date, name);
            }
        }
        Self { days }
    }

    /// Build a calendar wide enough to serve the ±365-day proximity scan for
    /// every date in `dates`: observed years plus one year of margin on each
    /// side.
    pub fn for_dates(region: HolidayRegion, dates: &[NaiveDate]) -> Result<Self> {
        let min = dates.iter().min().ok_or_else(|| anyhow!("empty date set"))?;
        let max = dates.iter().max().ok_or_else(|| anyhow!("empty date set"))?;
        Ok(Self::for_years(region, min.year() - 1..=max.year() + 1))
    }

    /// Holiday name on `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<&'static str> {
        self.days.get(&date).copied()
    }

    /// Nearest holiday on or after (`Next`) or on or before (`Previous`)
    /// `date`, as `(day offset, holiday name)`. Offset 0 means `date` itself
    /// is a holiday.
    pub fn nearest(&self, date: NaiveDate, direction: Direction) -> Result<(u64, &'static str)> {
        for delta in 0..=MAX_SCAN_DAYS {
            let day = match direction {
                Direction::Next => date.checked_add_days(Days::new(delta)),
                Direction::Previous => date.checked_sub_days(Days::new(delta)),
            }
            .ok_or_else(|| anyhow!("date arithmetic overflow near {date}"))?;
            if let Some(name) = self.get(day) {
                return Ok((delta, name));
            }
        }
        Err(anyhow!(
            "no holiday within {MAX_SCAN_DAYS} days of {date}; calendar span too narrow"
        ))
    }

    /// Holiday-proximity features for a set of unique dates, one row per
    /// date: `dt, next_delay, next_holiday, prev_delay, prev_holiday`.
    ///
    /// The scan is O(366) per date, so callers pass each distinct date once
    /// and join the result back onto their full row set.
    pub fn proximity_table(&self, dates: &[NaiveDate]) -> Result<Table> {
        let columns = vec![
            "dt".to_string(),
            "next_delay".to_string(),
            "next_holiday".to_string(),
            "prev_delay".to_string(),
            "prev_holiday".to_string(),
        ];
        let mut sorted: Vec<NaiveDate> = dates.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        let mut rows = Vec::with_capacity(sorted.len());
        for date in sorted {
            let (next_delay, next_holiday) = self.nearest(date, Direction::Next)?;
            let (prev_delay, prev_holiday) = self.nearest(date, Direction::Previous)?;
            rows.push(vec![
                date.format("%Y-%m-%d").to_string(),
                next_delay.to_string(),
                next_holiday.to_string(),
                prev_delay.to_string(),
                prev_holiday.to_string(),
            ]);
        }
        Table::new(columns, rows)
    }
}

fn holidays_in_year(region: HolidayRegion, year: i32) -> Vec<(NaiveDate, &'static str)> {
    match region {
        HolidayRegion::CaQc | HolidayRegion::CaOn => canada_holidays(region, year),
        HolidayRegion::UsNy | HolidayRegion::UsDc => us_holidays(region, year),
    }
}

fn canada_holidays(region: HolidayRegion, year: i32) -> Vec<(NaiveDate, &'static str)> {
    let mut days = vec![
        (ymd(year, 1, 1), "New Year's Day"),
        (easter_sunday(year) - Days::new(2), "Good Friday"),
        (ymd(year, 7, 1), "Canada Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labour Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Thanksgiving"),
        (ymd(year, 12, 25), "Christmas Day"),
    ];
    // Monday preceding May 25.
    let late_may_monday = monday_on_or_before(ymd(year, 5, 24));
    match region {
        HolidayRegion::CaQc => {
            days.push((late_may_monday, "National Patriots' Day"));
            days.push((ymd(year, 6, 24), "St. Jean Baptiste Day"));
        }
        HolidayRegion::CaOn => {
            days.push((late_may_monday, "Victoria Day"));
            days.push((nth_weekday(year, 2, Weekday::Mon, 3), "Family Day"));
            days.push((nth_weekday(year, 8, Weekday::Mon, 1), "Civic Holiday"));
            days.push((ymd(year, 12, 26), "Boxing Day"));
        }
        _ => unreachable!("canada_holidays called for a non-Canadian region"),
    }
    days
}

fn us_holidays(region: HolidayRegion, year: i32) -> Vec<(NaiveDate, &'static str)> {
    let mut days = vec![
        (ymd(year, 1, 1), "New Year's Day"),
        (nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth_weekday(year, 2, Weekday::Mon, 3), "Washington's Birthday"),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (ymd(year, 7, 4), "Independence Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day"),
        (ymd(year, 11, 11), "Veterans Day"),
        (nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving"),
        (ymd(year, 12, 25), "Christmas Day"),
    ];
    if region == HolidayRegion::UsDc && year >= 2005 {
        days.push((ymd(year, 4, 16), "Emancipation Day"));
    }
    days
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("fixed holiday rule yields a valid date")
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
        .expect("nth-weekday holiday rule yields a valid date")
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, 5)
        .unwrap_or_else(|| nth_weekday(year, month, weekday, 4))
}

fn monday_on_or_before(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.weekday().num_days_from_monday()))
}

/// Gregorian Easter Sunday (anonymous computus).
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    ymd(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn easter_known_dates() {
        assert_eq!(easter_sunday(2021), date(2021, 4, 4));
        assert_eq!(easter_sunday(2019), date(2019, 4, 21));
        assert_eq!(easter_sunday(2024), date(2024, 3, 31));
    }

    #[test]
    fn quebec_calendar_contents() {
        let cal = HolidayCalendar::for_years(HolidayRegion::CaQc, 2021..=2021);
        assert_eq!(cal.get(date(2021, 1, 1)), Some("New Year's Day"));
        assert_eq!(cal.get(date(2021, 4, 2)), Some("Good Friday"));
        assert_eq!(cal.get(date(2021, 5, 24)), Some("National Patriots' Day"));
        assert_eq!(cal.get(date(2021, 6, 24)), Some("St. Jean Baptiste Day"));
        assert_eq!(cal.get(date(2021, 7, 1)), Some("Canada Day"));
        assert_eq!(cal.get(date(2021, 12, 25)), Some("Christmas Day"));
        assert_eq!(cal.get(date(2021, 7, 2)), None);
    }

    #[test]
    fn us_calendar_moving_rules() {
        let cal = HolidayCalendar::for_years(HolidayRegion::UsNy, 2021..=2021);
        assert_eq!(cal.get(date(2021, 1, 18)), Some("Martin Luther King Jr. Day"));
        assert_eq!(cal.get(date(2021, 5, 31)), Some("Memorial Day"));
        assert_eq!(cal.get(date(2021, 11, 25)), Some("Thanksgiving"));
        // Emancipation Day is DC only.
        assert_eq!(cal.get(date(2021, 4, 16)), None);
        let dc = HolidayCalendar::for_years(HolidayRegion::UsDc, 2021..=2021);
        assert_eq!(dc.get(date(2021, 4, 16)), Some("Emancipation Day"));
    }

    #[test]
    fn nearest_next_across_year_boundary() {
        let cal = HolidayCalendar::for_years(HolidayRegion::CaQc, 2021..=2022);
        let (delay, name) = cal.nearest(date(2021, 12, 30), Direction::Next).unwrap();
        assert_eq!((delay, name), (2, "New Year's Day"));
    }

    #[test]
    fn nearest_previous() {
        let cal = HolidayCalendar::for_years(HolidayRegion::CaQc, 2021..=2022);
        let (delay, name) = cal.nearest(date(2022, 1, 2), Direction::Previous).unwrap();
        assert_eq!((delay, name), (1, "New Year's Day"));
    }

    #[test]
    fn nearest_on_holiday_is_zero() {
        let cal = HolidayCalendar::for_years(HolidayRegion::CaQc, 2021..=2021);
        let (delay, name) = cal.nearest(date(2021, 7, 1), Direction::Next).unwrap();
        assert_eq!((delay, name), (0, "Canada Day"));
    }

    #[test]
    fn empty_calendar_scan_is_an_error() {
        let cal = HolidayCalendar {
            days: BTreeMap::new(),
        };
        assert!(cal.nearest(date(2021, 6, 1), Direction::Next).is_err());
    }

    #[test]
    fn proximity_table_dedups_and_sorts() {
        let cal = HolidayCalendar::for_years(HolidayRegion::CaQc, 2020..=2022);
        let dates = vec![date(2021, 7, 2), date(2021, 6, 30), date(2021, 7, 2)];
        let table = cal.proximity_table(&dates).unwrap();
        assert_eq!(
            table.columns(),
            ["dt", "next_delay", "next_holiday", "prev_delay", "prev_holiday"]
        );
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.rows()[0],
            ["2021-06-30", "1", "Canada Day", "6", "St. Jean Baptiste Day"]
        );
        assert_eq!(
            table.rows()[1],
            ["2021-07-02", "66", "Labour Day", "1", "Canada Day"]
        );
    }
}
