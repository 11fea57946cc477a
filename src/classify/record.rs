use super::{
    prompt::PromptBuilder,
    query::QueryRunner,
    voter::ConsistencyVoter,
    KeywordGroup,
    VerdictMap,
};
use crate::{api::ChatBackend, batch::store::Record, config::ClassifierConfig};
use tracing::Instrument;

/// Classifies one record against every configured keyword group.
pub struct RecordClassifier<'a, B: ChatBackend> {
    pub groups: &'a [KeywordGroup],
    pub voter: ConsistencyVoter<'a, B>,
}

impl<'a, B: ChatBackend> RecordClassifier<'a, B> {
    pub fn new(config: &'a ClassifierConfig, backend: &'a B) -> Self {
        let runner = QueryRunner::new(backend, config.max_retries)
            .with_retry_delay(config.retry_delay);
        let prompt = PromptBuilder {
            model: &config.model_name,
            temperature: config.temperature,
            example_abstract: &config.example_abstract,
        };
        Self {
            groups: &config.keyword_groups,
            voter: ConsistencyVoter {
                runner,
                prompt,
                run_times: config.run_times,
                unanswered_verdict: config.unanswered_verdict,
            },
        }
    }

    /// Groups are voted one after another; the map always holds every group.
    pub async fn classify(&self, record: &Record) -> VerdictMap {
        crate::info!(record = %record.id, title = %record.title, "classifying record");
        let mut verdicts = VerdictMap::new();
        for group in self.groups {
            let span = tracing::debug_span!("vote", record = %record.id, group = %group.id);
            let verdict = self.voter.vote(record, group).instrument(span).await;
            verdicts.insert(group.id, verdict);
        }
        verdicts
    }
}
