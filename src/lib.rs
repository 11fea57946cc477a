#[allow(unused_imports)]
pub(crate) use anyhow::{anyhow, bail, Error, Result};
#[allow(unused_imports)]
pub(crate) use tracing::{debug, error, info, span, trace, warn, Level};

pub mod api;
pub mod batch;
pub mod classify;
pub mod config;
pub mod logging;
pub mod prelude;

use api::{client::ApiClient, ChatBackend};
use batch::{
    csv_store::CsvStore,
    scheduler::{BatchScheduler, BatchSummary},
    store::CheckpointStore,
    StoreError,
};
use classify::record::RecordClassifier;
use config::ClassifierConfig;

/// Entry point tying the engine together: one validated config, one backend,
/// one store.
pub struct AbstractClassifier<B: ChatBackend> {
    pub config: ClassifierConfig,
    pub backend: B,
}

impl AbstractClassifier<ApiClient> {
    /// Starts the configured logger and builds the HTTP backend described by the
    /// config.
    pub fn from_config(mut config: ClassifierConfig) -> crate::Result<Self> {
        config.logging_config.load_logger()?;
        let backend = ApiClient::new(config.api_config.clone())?;
        Ok(Self { config, backend })
    }
}

impl<B: ChatBackend> AbstractClassifier<B> {
    pub fn with_backend(config: ClassifierConfig, backend: B) -> Self {
        Self { config, backend }
    }

    /// Opens (or creates) the working copy of the configured dataset.
    pub fn open_csv_store(&self) -> std::result::Result<CsvStore, StoreError> {
        CsvStore::open(&self.config.dataset_path, &self.config.keyword_groups)
    }

    /// Classifies every unprocessed record of `store`, checkpointing as it goes.
    pub async fn run<S: CheckpointStore>(
        &self,
        store: &mut S,
    ) -> std::result::Result<BatchSummary, StoreError> {
        let classifier = RecordClassifier::new(&self.config, &self.backend);
        BatchScheduler::from_config(&self.config)
            .run(&classifier, store)
            .await
    }
}
