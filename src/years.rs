use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use std::collections::BTreeSet;

/// Earliest year considered when a range is open at the start ("-2015" or "-").
const FLOOR_YEAR: i32 = 2010;

/// Parse a year-selection expression into the set of years it covers.
///
/// The expression is a comma-separated list where each component is a single
/// year ("2020"), a closed range ("2020-2022"), an open-ended range ("2020-",
/// up to the current year), or an open-started range ("-2015", down from
/// [`FLOOR_YEAR`]). A bare "-" covers the full floor..current range.
/// Whitespace around components is ignored and empty components are skipped.
pub fn parse_years(query: &str) -> Result<BTreeSet<i32>> {
    let current_year = Local::now().year();
    let mut years = BTreeSet::new();

    for comp in query.split(',') {
        let comp = comp.trim();
        if comp.is_empty() {
            continue;
        }
        if let Some((start, end)) = comp.split_once('-') {
            let start = start.trim();
            let end = end.trim();
            let start = if start.is_empty() {
                FLOOR_YEAR
            } else {
                start
                    .parse::<i32>()
                    .with_context(|| format!("invalid year range start {start:?} in {comp:?}"))?
            };
            let end = if end.is_empty() {
                current_year
            } else {
                end.parse::<i32>()
                    .with_context(|| format!("invalid year range end {end:?} in {comp:?}"))?
            };
            years.extend(start..=end);
        } else {
            let year = comp
                .parse::<i32>()
                .with_context(|| format!("invalid year {comp:?}"))?;
            years.insert(year);
        }
    }

    Ok(years)
}
