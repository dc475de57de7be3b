//! Timestamp column expansion into calendar parts.

use anyhow::{anyhow, Context, Result};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::process::table::Table;

/// Formats the known operator exports use, tried in order. Date-only values
/// (station snapshots, some monthly dumps) parse as midnight.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

pub fn parse_datetime(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(anyhow!("unparseable timestamp {raw:?}"))
}

/// Replace each named timestamp column with 9 derived columns.
///
/// The derived names take a prefix made by stripping the literal `date` from
/// the column name (`start_date` -> `start_`): `{p}dt`, `{p}year`,
/// `{p}month`, `{p}day`, `{p}hour`, `{p}minute`, `{p}second`,
/// `{p}time_ratio` (fraction of the day elapsed, in [0,1)) and
/// `{p}day_of_week` (ISO, Monday=1). A malformed value anywhere in the
/// column fails the whole chunk; rows are never silently dropped.
pub fn break_datetime(mut table: Table, columns: &[&str]) -> Result<Table> {
    for &column in columns {
        let idx = table.require_column(column)?;
        let parsed: Vec<NaiveDateTime> = table
            .rows()
            .iter()
            .map(|row| {
                parse_datetime(&row[idx])
                    .with_context(|| format!("parsing column {column:?}"))
            })
            .collect::<Result<_>>()?;

        let prefix = column.replace("date", "");
        let derived: [(&str, fn(&NaiveDateTime) -> String); 9] = [
            ("dt", |dt| dt.date().format("%Y-%m-%d").to_string()),
            ("year", |dt| dt.year().to_string()),
            ("month", |dt| dt.month().to_string()),
            ("day", |dt| dt.day().to_string()),
            ("hour", |dt| dt.hour().to_string()),
            ("minute", |dt| dt.minute().to_string()),
            ("second", |dt| dt.second().to_string()),
            ("time_ratio", |dt| time_ratio(dt).to_string()),
            ("day_of_week", |dt| {
                dt.weekday().number_from_monday().to_string()
            }),
        ];
        for (suffix, derive) in derived {
            let values = parsed.iter().map(derive).collect();
            table.push_column(format!("{prefix}{suffix}"), values)?;
        }
        table = table.drop_column(column)?;
    }
    Ok(table)
}

/// Fraction of the day elapsed at this time, a continuous time-of-day proxy.
fn time_ratio(dt: &NaiveDateTime) -> f64 {
    (f64::from(dt.hour()) + f64::from(dt.minute()) / 60.0 + f64::from(dt.second()) / 3600.0) / 24.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn accepts_known_operator_formats() {
        for raw in [
            "2021-07-04 15:30:45",
            "2021-07-04T15:30:45",
            "2021-07-04 15:30:45.123",
            "2021-07-04 15:30",
            "07/04/2021 15:30:45",
            "07/04/2021 15:30",
        ] {
            let dt = parse_datetime(raw).unwrap();
            assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2021, 7, 4).unwrap());
        }
        let midnight = parse_datetime("2021-07-04").unwrap();
        assert_eq!(midnight.hour(), 0);
        assert!(parse_datetime("not a date").is_err());
    }

    #[test]
    fn expands_into_nine_columns_and_drops_original() {
        let t = table(
            &["start_date", "duration"],
            &[&["2021-07-04 15:30:45", "300"]],
        );
        let t = break_datetime(t, &["start_date"]).unwrap();
        assert_eq!(
            t.columns(),
            [
                "duration",
                "start_dt",
                "start_year",
                "start_month",
                "start_day",
                "start_hour",
                "start_minute",
                "start_second",
                "start_time_ratio",
                "start_day_of_week",
            ]
        );
        let row = &t.rows()[0];
        assert_eq!(row[1], "2021-07-04");
        assert_eq!(&row[2..8], ["2021", "7", "4", "15", "30", "45"]);

        let ratio: f64 = row[8].parse().unwrap();
        assert!((ratio - 0.6463541666).abs() < 1e-6);
        // 2021-07-04 was a Sunday.
        assert_eq!(row[9], "7");
    }

    #[test]
    fn malformed_timestamp_fails_the_chunk() {
        let t = table(
            &["start_date"],
            &[&["2021-07-04 15:30:45"], &["garbage"]],
        );
        let err = break_datetime(t, &["start_date"]).unwrap_err();
        assert!(err.to_string().contains("start_date"));
    }

    #[test]
    fn missing_column_is_an_error() {
        let t = table(&["other"], &[]);
        assert!(break_datetime(t, &["start_date"]).is_err());
    }
}
