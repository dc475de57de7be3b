//! An owned, column-named string table and its CSV I/O.
//!
//! Pipeline stages consume a `Table` by value and hand a new one to the next
//! stage, so no stage ever observes a half-transformed table.

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != columns.len()) {
            return Err(anyhow!(
                "row {bad} has {} fields, header has {}",
                rows[bad].len(),
                columns.len()
            ));
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| anyhow!("missing column {name:?}; have {:?}", self.columns))
    }

    /// Rewrite every column name through `f`, keeping the rows untouched.
    pub fn map_columns(mut self, mut f: impl FnMut(String) -> String) -> Self {
        self.columns = self.columns.drain(..).map(&mut f).collect();
        self
    }

    pub fn drop_column(mut self, name: &str) -> Result<Self> {
        let idx = self.require_column(name)?;
        self.columns.remove(idx);
        for row in &mut self.rows {
            row.remove(idx);
        }
        Ok(self)
    }

    /// Append a column. The name must be new and `values` must cover every row.
    pub fn push_column(&mut self, name: String, values: Vec<String>) -> Result<()> {
        if self.column_index(&name).is_some() {
            return Err(anyhow!("column {name:?} already exists"));
        }
        if values.len() != self.rows.len() {
            return Err(anyhow!(
                "column {name:?} has {} values for {} rows",
                values.len(),
                self.rows.len()
            ));
        }
        self.columns.push(name);
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Distinct values of a column, in first-seen order.
    pub fn unique_values(&self, name: &str) -> Result<Vec<String>> {
        let idx = self.require_column(name)?;
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for row in &self.rows {
            if seen.insert(row[idx].as_str()) {
                out.push(row[idx].clone());
            }
        }
        Ok(out)
    }

    /// Remove exact duplicate rows, keeping the first occurrence.
    pub fn dedup_rows(&mut self) {
        let mut seen = HashSet::new();
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// Stack tables with identical headers on top of each other.
    pub fn concat(tables: Vec<Table>) -> Result<Table> {
        let mut iter = tables.into_iter();
        let mut first = iter.next().ok_or_else(|| anyhow!("nothing to concat"))?;
        for table in iter {
            if table.columns != first.columns {
                return Err(anyhow!(
                    "header mismatch: {:?} vs {:?}",
                    table.columns,
                    first.columns
                ));
            }
            first.rows.extend(table.rows);
        }
        Ok(first)
    }

    pub fn read_csv(path: impl AsRef<Path>) -> Result<Table> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let columns = header_columns(&mut reader)?;
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.with_context(|| format!("reading {}", path.display()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Table::new(columns, rows)
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("creating {}", path.display()))?;
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// A CSV file read `chunk_size` rows at a time. The underlying file handle
/// lives exactly as long as this value, so dropping it on any exit path
/// closes the reader.
pub struct CsvChunks {
    reader: csv::Reader<File>,
    columns: Vec<String>,
    chunk_size: usize,
}

impl CsvChunks {
    pub fn open(path: impl AsRef<Path>, chunk_size: usize) -> Result<Self> {
        let path = path.as_ref();
        if chunk_size == 0 {
            return Err(anyhow!("chunk_size must be positive"));
        }
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let columns = header_columns(&mut reader)?;
        Ok(Self {
            reader,
            columns,
            chunk_size,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Next chunk of up to `chunk_size` rows, or `None` once the file is
    /// exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Table>> {
        let mut rows = Vec::with_capacity(self.chunk_size);
        let mut record = StringRecord::new();
        while rows.len() < self.chunk_size && self.reader.read_record(&mut record)? {
            rows.push(record.iter().map(str::to_string).collect());
        }
        if rows.is_empty() {
            return Ok(None);
        }
        Some(Table::new(self.columns.clone(), rows)).transpose()
    }
}

fn header_columns<R: std::io::Read>(reader: &mut csv::Reader<R>) -> Result<Vec<String>> {
    Ok(reader
        .headers()
        .context("reading CSV header")?
        .iter()
        .map(str::to_string)
        .collect())
}
