use super::{extractor::ResponseExtractor, Answer, KeywordGroupId};
use crate::{
    api::{ChatBackend, ChatCompletionRequest},
    batch::store::RecordId,
};
use backoff::{backoff::Backoff, ExponentialBackoff, ExponentialBackoffBuilder};
use std::time::Duration;

/// Upper bound for a single wait between attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// What a query is about. Carried into every log line of the attempt loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueryTarget {
    pub record: RecordId,
    pub group: KeywordGroupId,
    /// 1-based repeat number within the vote.
    pub run: usize,
}

/// Runs one query with a bounded number of sequential attempts.
pub struct QueryRunner<'a, B: ChatBackend> {
    backend: &'a B,
    pub max_retries: u32,
    /// `None` retries immediately.
    pub retry_delay: Option<Duration>,
}

impl<'a, B: ChatBackend> QueryRunner<'a, B> {
    pub fn new(backend: &'a B, max_retries: u32) -> Self {
        Self {
            backend,
            max_retries,
            retry_delay: None,
        }
    }

    /// Exponential backoff between attempts starting at `initial`, doubling, capped at
    /// [`MAX_RETRY_DELAY`].
    pub fn with_retry_delay(mut self, initial: Duration) -> Self {
        self.retry_delay = if initial.is_zero() {
            None
        } else {
            Some(initial)
        };
        self
    }

    fn retry_backoff(&self) -> Option<ExponentialBackoff> {
        self.retry_delay.map(|initial| {
            ExponentialBackoffBuilder::new()
                .with_initial_interval(initial)
                .with_multiplier(2.0)
                .with_randomization_factor(0.0)
                .with_max_interval(MAX_RETRY_DELAY)
                .with_max_elapsed_time(None)
                .build()
        })
    }

    /// Returns the first `Y`/`N` any attempt produces, or `NoAnswer` once
    /// `max_retries` attempts are used up.
    pub async fn run(&self, request: &ChatCompletionRequest, target: QueryTarget) -> Answer {
        let mut backoff = self.retry_backoff();

        for attempt in 1..=self.max_retries {
            if attempt > 1 {
                if let Some(delay) = backoff.as_mut().and_then(|b| b.next_backoff()) {
                    crate::trace!("waiting {:?} before attempt {}", delay, attempt);
                    tokio::time::sleep(delay).await;
                }
            }

            let fragments = match self.backend.stream_chat(request).await {
                Ok(fragments) => fragments,
                Err(e) => {
                    crate::warn!(
                        record = %target.record,
                        group = %target.group,
                        run = target.run,
                        attempt,
                        "request failed: {}",
                        e
                    );
                    continue;
                }
            };

            match ResponseExtractor::new().extract(fragments).await {
                Ok(answer) if answer.is_answered() => {
                    crate::debug!(
                        record = %target.record,
                        group = %target.group,
                        run = target.run,
                        attempt,
                        %answer,
                        "attempt answered"
                    );
                    return answer;
                }
                Ok(_) => {
                    crate::debug!(
                        record = %target.record,
                        group = %target.group,
                        run = target.run,
                        attempt,
                        "attempt returned no answer letter"
                    );
                }
                Err(e) => {
                    crate::warn!(
                        record = %target.record,
                        group = %target.group,
                        run = target.run,
                        attempt,
                        "stream failed: {}",
                        e
                    );
                }
            }
        }

        crate::warn!(
            record = %target.record,
            group = %target.group,
            run = target.run,
            "no answer after {} attempts",
            self.max_retries
        );
        Answer::NoAnswer
    }
}
