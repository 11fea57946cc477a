use crate::classify::VerdictMap;
use std::fmt;

/// 1-based data row number; stable across runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub usize);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub abstract_text: String,
    pub processed: bool,
    pub results: VerdictMap,
}

impl Record {
    pub fn new<T: Into<String>, A: Into<String>>(id: RecordId, title: T, abstract_text: A) -> Self {
        Self {
            id,
            title: title.into(),
            abstract_text: abstract_text.into(),
            processed: false,
            results: VerdictMap::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset has no {0:?} column")]
    MissingColumn(&'static str),
    #[error("no record {0} in dataset")]
    UnknownRecord(RecordId),
    #[error("{} is not a .csv file; export the sheet to CSV first", .0.display())]
    UnsupportedFormat(std::path::PathBuf),
}

/// The dataset being classified, plus its durable copy.
///
/// Only the batch scheduler mutates a store during a run. `apply` changes the
/// in-memory state; nothing is durable until `persist`.
pub trait CheckpointStore {
    fn records(&self) -> &[Record];

    fn records_mut(&mut self) -> &mut [Record];

    /// Writes the whole current state durably.
    fn persist(&mut self) -> Result<(), StoreError>;

    fn record(&self, id: RecordId) -> Option<&Record> {
        self.records().iter().find(|r| r.id == id)
    }

    /// Unprocessed records in dataset order.
    fn pending(&self) -> Vec<Record> {
        self.records()
            .iter()
            .filter(|r| !r.processed)
            .cloned()
            .collect()
    }

    /// Stores every group verdict of a record and marks it processed.
    fn apply(&mut self, id: RecordId, verdicts: &VerdictMap) -> Result<(), StoreError> {
        let record = self
            .records_mut()
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(StoreError::UnknownRecord(id))?;
        record
            .results
            .extend(verdicts.iter().map(|(group, verdict)| (*group, *verdict)));
        record.processed = true;
        Ok(())
    }
}

/// Store kept entirely in memory. `persist` snapshots the records, so the last
/// snapshot is what a restarted run would see.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    records: Vec<Record>,
    persisted: Option<Vec<Record>>,
    /// Processed count at each successful persist.
    pub checkpoints: Vec<usize>,
}

impl MemoryStore {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            ..Default::default()
        }
    }

    /// One unprocessed record per `(title, abstract)` pair, ids from 1.
    pub fn from_abstracts<I, T, A>(rows: I) -> Self
    where
        I: IntoIterator<Item = (T, A)>,
        T: Into<String>,
        A: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .enumerate()
                .map(|(i, (title, abstract_text))| Record::new(RecordId(i + 1), title, abstract_text))
                .collect(),
        )
    }

    /// A fresh store over the last persisted state, as if the process had restarted.
    pub fn reopen(&self) -> Self {
        Self::new(self.persisted.clone().unwrap_or_else(|| {
            self.records
                .iter()
                .cloned()
                .map(|r| Record::new(r.id, r.title, r.abstract_text))
                .collect()
        }))
    }

    pub fn processed_count(&self) -> usize {
        self.records.iter().filter(|r| r.processed).count()
    }
}

impl CheckpointStore for MemoryStore {
    fn records(&self) -> &[Record] {
        &self.records
    }

    fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    fn persist(&mut self) -> Result<(), StoreError> {
        self.persisted = Some(self.records.clone());
        self.checkpoints.push(self.processed_count());
        Ok(())
    }
}
