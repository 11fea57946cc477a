pub mod csv_store;
pub mod scheduler;
pub mod store;

pub use csv_store::CsvStore;
pub use scheduler::{BatchScheduler, BatchSummary};
pub use store::{CheckpointStore, MemoryStore, Record, RecordId, StoreError};
