pub use crate::{
    api::{ApiClient, ApiConfig, ApiConfigTrait, ChatBackend, ClientError, FragmentStream},
    batch::{
        BatchScheduler,
        BatchSummary,
        CheckpointStore,
        CsvStore,
        MemoryStore,
        Record,
        RecordId,
        StoreError,
    },
    classify::{
        Answer,
        ConsistencyVoter,
        KeywordGroup,
        KeywordGroupId,
        QueryRunner,
        RecordClassifier,
        ResponseExtractor,
        Verdict,
        VerdictMap,
    },
    config::{ClassifierConfig, ConfigError, UnansweredVerdict},
    logging::{LoggingConfig, LoggingConfigTrait},
    AbstractClassifier,
};
