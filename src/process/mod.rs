//! Per-chunk trip processing: normalize, join, expand, enrich, write.

pub mod datetime;
pub mod join;
pub mod table;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::holidays::HolidayCalendar;
use crate::operators::OperatorConfig;
use crate::process::join::{format_column_names, merge_left, rename_columns, station_trip_join};
use crate::process::table::{CsvChunks, Table};

/// Process every trip file downloaded for one URL, writing one output CSV
/// per file (`trip_{i}.csv`) or per chunk (`trip_{i}_{j}.csv`) into
/// `save_dir`.
///
/// Chunks are independent: a failure in one file aborts that file but leaves
/// every already-written output on disk, so a re-run can fill in the gaps.
pub fn run_url(
    files: &[PathBuf],
    save_dir: &Path,
    cfg: &OperatorConfig,
    chunk_size: Option<usize>,
) -> Result<()> {
    let (trip_files, station_files) = cfg.files.classify(files);
    info!(
        trips = trip_files.len(),
        stations = station_files.len(),
        "classified downloaded files"
    );

    let stations = if cfg.files.has_station_table() && !station_files.is_empty() {
        Some(load_stations(&station_files, cfg)?)
    } else {
        None
    };

    for (i, trip_file) in trip_files.iter().enumerate() {
        match chunk_size {
            Some(size) => {
                // The chunk reader owns the file handle for exactly this
                // scope, so it is closed on success and error alike.
                let mut chunks = CsvChunks::open(trip_file, size)
                    .with_context(|| format!("opening trips {}", trip_file.display()))?;
                let mut j = 0;
                while let Some(chunk) = chunks.next_chunk()? {
                    let out_path = save_dir.join(format!("trip_{i}_{j}.csv"));
                    process_chunk(chunk, stations.as_ref(), cfg, &out_path)?;
                    j += 1;
                }
            }
            None => {
                let trips = Table::read_csv(trip_file)
                    .with_context(|| format!("reading trips {}", trip_file.display()))?;
                let out_path = save_dir.join(format!("trip_{i}.csv"));
                process_chunk(trips, stations.as_ref(), cfg, &out_path)?;
            }
        }
    }
    Ok(())
}

/// Load, normalize and deduplicate the operator's station table(s).
fn load_stations(station_files: &[&Path], cfg: &OperatorConfig) -> Result<Table> {
    let mut tables = Vec::with_capacity(station_files.len());
    for file in station_files {
        let table = Table::read_csv(file)
            .with_context(|| format!("reading stations {}", file.display()))?;
        tables.push(rename_columns(format_column_names(table), cfg.rename));
    }
    let mut stations = Table::concat(tables)?;
    stations.dedup_rows();
    Ok(stations)
}

/// Run one chunk through the full pipeline and write it to `out_path`.
///
/// Order is fixed: rename, station join (when the operator has a station
/// table), datetime expansion of `start_date`/`end_date`, then a holiday
/// proximity join computed once per unique start date.
pub fn process_chunk(
    trips: Table,
    stations: Option<&Table>,
    cfg: &OperatorConfig,
    out_path: &Path,
) -> Result<()> {
    let mut trips = rename_columns(format_column_names(trips), cfg.rename);
    if let Some(stations) = stations {
        trips = station_trip_join(stations, trips)?;
    }
    let trips = datetime::break_datetime(trips, &["start_date", "end_date"])?;

    if trips.n_rows() == 0 {
        warn!(out = %out_path.display(), "empty chunk, nothing to write");
        return Ok(());
    }

    let dates = trips
        .unique_values("start_dt")?
        .iter()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .with_context(|| format!("start date {raw:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    let calendar = HolidayCalendar::for_dates(cfg.region, &dates)?;
    let proximity = calendar.proximity_table(&dates)?;
    let trips = merge_left(trips, &proximity, "start_dt", "dt", None)?;

    trips
        .write_csv(out_path)
        .with_context(|| format!("writing {}", out_path.display()))?;
    info!(
        out = %out_path.display(),
        rows = trips.n_rows(),
        cols = trips.n_cols(),
        "wrote chunk"
    );
    Ok(())
}
