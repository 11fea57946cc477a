//! CSV-backed checkpoint store.
//!
//! The source dataset is never written. The first run copies it to
//! `<stem>_copy.csv` beside it; every later run resumes from that copy. Columns
//! the engine does not know about are carried through untouched.

use super::store::{CheckpointStore, Record, RecordId, StoreError};
use crate::classify::{KeywordGroup, KeywordGroupId, Verdict};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

pub const TITLE_COLUMN: &str = "Title";
pub const ABSTRACT_COLUMN: &str = "Abstract";
pub const PROCESSED_COLUMN: &str = "Processed";

#[derive(Debug)]
pub struct CsvStore {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    records: Vec<Record>,
    processed_col: usize,
    result_cols: BTreeMap<KeywordGroupId, usize>,
}

impl CsvStore {
    /// `papers.csv` -> `papers_copy.csv` in the same directory.
    pub fn working_copy_path(source: &Path) -> PathBuf {
        let stem = source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        source.with_file_name(format!("{stem}_copy.csv"))
    }

    /// Opens the working copy of `source`, creating it on the first run.
    pub fn open(source: &Path, groups: &[KeywordGroup]) -> Result<Self, StoreError> {
        let is_csv = source
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if !is_csv {
            return Err(StoreError::UnsupportedFormat(source.to_path_buf()));
        }
        let path = Self::working_copy_path(source);
        if path.exists() {
            crate::info!("resuming from working copy {}", path.display());
        } else {
            fs::copy(source, &path)?;
            crate::info!(
                "created working copy {} from {}",
                path.display(),
                source.display()
            );
        }
        Self::load(path, groups)
    }

    /// Reads an existing file as the store, adding any missing `Processed` and
    /// result columns.
    pub fn load(path: PathBuf, groups: &[KeywordGroup]) -> Result<Self, StoreError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(&path)?;
        let mut headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();

        let title_col = find_column(&headers, TITLE_COLUMN)
            .ok_or(StoreError::MissingColumn(TITLE_COLUMN))?;
        let abstract_col = find_column(&headers, ABSTRACT_COLUMN)
            .ok_or(StoreError::MissingColumn(ABSTRACT_COLUMN))?;
        let processed_col = ensure_column(&mut headers, PROCESSED_COLUMN);
        let result_cols: BTreeMap<KeywordGroupId, usize> = groups
            .iter()
            .map(|g| (g.id, ensure_column(&mut headers, &g.id.column_name())))
            .collect();

        let mut rows = Vec::new();
        let mut records = Vec::new();
        for (i, row) in reader.records().enumerate() {
            let mut cells: Vec<String> = row?.iter().map(String::from).collect();
            cells.resize(headers.len(), String::new());

            let mut record = Record::new(
                RecordId(i + 1),
                cells[title_col].as_str(),
                cells[abstract_col].as_str(),
            );
            record.processed = parse_processed(&cells[processed_col]);
            for (group, col) in &result_cols {
                if let Ok(verdict) = cells[*col].parse::<Verdict>() {
                    record.results.insert(*group, verdict);
                }
            }
            rows.push(cells);
            records.push(record);
        }

        let processed = records.iter().filter(|r| r.processed).count();
        crate::debug!(
            rows = records.len(),
            processed,
            columns = headers.len(),
            "loaded {}",
            path.display()
        );
        Ok(Self {
            path,
            headers,
            rows,
            records,
            processed_col,
            result_cols,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    fn sync_rows(&mut self) {
        for (cells, record) in self.rows.iter_mut().zip(&self.records) {
            cells[self.processed_col] = if record.processed { "True" } else { "False" }.to_owned();
            for (group, col) in &self.result_cols {
                if let Some(verdict) = record.results.get(group) {
                    cells[*col] = verdict.as_cell().to_owned();
                }
            }
        }
    }
}

impl CheckpointStore for CsvStore {
    fn records(&self) -> &[Record] {
        &self.records
    }

    fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    /// Writes a sibling temp file and renames it over the working copy, so a
    /// crash mid-write leaves the previous checkpoint intact.
    fn persist(&mut self) -> Result<(), StoreError> {
        self.sync_rows();

        let tmp = self.path.with_extension("csv.tmp");
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(&self.headers)?;
            for cells in &self.rows {
                writer.write_record(cells)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn find_column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

fn ensure_column(headers: &mut Vec<String>, name: &str) -> usize {
    find_column(headers, name).unwrap_or_else(|| {
        headers.push(name.to_owned());
        headers.len() - 1
    })
}

fn parse_processed(cell: &str) -> bool {
    let cell = cell.trim();
    cell.eq_ignore_ascii_case("true") || cell == "1"
}
