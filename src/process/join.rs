//! Column reconciliation and station joins.
//!
//! Rename maps are applied to both the station and trip tables before any
//! join so the join key names line up. Unmapped columns pass through
//! unchanged.

use anyhow::Result;
use std::collections::HashMap;

use crate::process::table::Table;

/// Normalize raw header names: trim, lowercase, collapse internal whitespace
/// to underscores. Run before the rename map so keys like `Start date` match.
pub fn format_column_names(table: Table) -> Table {
    table.map_columns(|c| {
        c.trim()
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join("_")
    })
}

/// Apply an operator rename map. Idempotent: canonical names are never map
/// keys, so a second application is a no-op.
pub fn rename_columns(table: Table, rename: &[(&str, &str)]) -> Table {
    table.map_columns(|c| {
        rename
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, to)| (*to).to_string())
            .unwrap_or(c)
    })
}

/// Left outer join: append `right`'s non-key columns to `left`, matching
/// `left_on` against `right_on`. Unmatched rows get empty fields. Joined
/// column names take `prefix` when given; the right key column is dropped.
pub fn merge_left(
    left: Table,
    right: &Table,
    left_on: &str,
    right_on: &str,
    prefix: Option<&str>,
) -> Result<Table> {
    let left_key = left.require_column(left_on)?;
    let right_key = right.require_column(right_on)?;

    let mut lookup: HashMap<&str, &Vec<String>> = HashMap::with_capacity(right.n_rows());
    for row in right.rows() {
        lookup.entry(row[right_key].as_str()).or_insert(row);
    }

    let mut out = left;
    for (ci, col) in right.columns().iter().enumerate() {
        if ci == right_key {
            continue;
        }
        let name = match prefix {
            Some(p) => format!("{p}{col}"),
            None => col.clone(),
        };
        let values = out
            .rows()
            .iter()
            .map(|row| {
                lookup
                    .get(row[left_key].as_str())
                    .map(|matched| matched[ci].clone())
                    .unwrap_or_default()
            })
            .collect();
        out.push_column(name, values)?;
    }
    Ok(out)
}

/// Join station metadata onto a trip table: once on the start station (no
/// prefix) and once on the end station (columns prefixed `end_`, matching
/// the canonical `end_station_code`/`end_name` naming).
pub fn station_trip_join(stations: &Table, trips: Table) -> Result<Table> {
    let joined = merge_left(trips, stations, "start_station_code", "code", None)?;
    merge_left(joined, stations, "end_station_code", "code", Some("end_"))
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
    fn format_column_names_normalizes_headers() {
        let t = table(&[" Start date ", "Member Type", "duration"], &[]);
        let t = format_column_names(t);
        assert_eq!(t.columns(), ["start_date", "member_type", "duration"]);
    }

    #[test]
    fn rename_passes_unmapped_columns_through() {
        let t = table(&["pk", "emplacement_pk_start", "duration_sec"], &[]);
        let rename = &[
            ("emplacement_pk_start", "start_station_code"),
            ("pk", "code"),
        ];
        let t = rename_columns(t, rename);
        assert_eq!(t.columns(), ["code", "start_station_code", "duration_sec"]);
        // Idempotent: a second pass changes nothing.
        let again = rename_columns(t.clone(), rename);
        assert_eq!(again, t);
    }

    #[test]
    fn station_join_fills_both_ends() {
        let trips = table(
            &["start_station_code", "end_station_code", "duration"],
            &[&["5", "7", "120"]],
        );
        let stations = table(&["code", "name"], &[&["5", "A"], &["7", "B"]]);
        let joined = station_trip_join(&stations, trips).unwrap();
        assert_eq!(
            joined.columns(),
            [
                "start_station_code",
                "end_station_code",
                "duration",
                "name",
                "end_name"
            ]
        );
        assert_eq!(joined.rows()[0], ["5", "7", "120", "A", "B"]);
    }

    #[test]
    fn unmatched_codes_get_empty_fields() {
        let trips = table(
            &["start_station_code", "end_station_code"],
            &[&["5", "99"]],
        );
        let stations = table(&["code", "name"], &[&["5", "A"]]);
        let joined = station_trip_join(&stations, trips).unwrap();
        assert_eq!(joined.rows()[0], ["5", "99", "A", ""]);
    }

    #[test]
    fn duplicate_station_rows_keep_first_match() {
        let trips = table(&["start_station_code", "end_station_code"], &[&["5", "5"]]);
        let stations = table(&["code", "name"], &[&["5", "A"], &["5", "ghost"]]);
        let joined = station_trip_join(&stations, trips).unwrap();
        assert_eq!(joined.rows()[0], ["5", "5", "A", "A"]);
    }

    #[test]
    fn missing_join_key_is_an_error() {
        let trips = table(&["unrelated"], &[&["1"]]);
        let stations = table(&["code", "name"], &[&["5", "A"]]);
        assert!(station_trip_join(&stations, trips).is_err());
    }
}
