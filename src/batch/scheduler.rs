use super::store::{CheckpointStore, StoreError};
use crate::{
    api::ChatBackend,
    classify::{record::RecordClassifier, Verdict, VerdictMap},
    config::ClassifierConfig,
};
use chrono::{DateTime, Local};
use futures::{stream, StreamExt};
use std::{collections::BTreeMap, fmt, time::Duration};

/// Runs pending records through a classifier with bounded concurrency.
///
/// The scheduler is the store's only writer: completions are applied and
/// checkpointed one at a time from a single loop while up to `concurrency`
/// records are in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchScheduler {
    pub concurrency: usize,
    /// Completions between checkpoints after the first.
    pub save_interval: usize,
}

impl BatchScheduler {
    pub fn new(concurrency: usize, save_interval: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            save_interval: save_interval.max(1),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.concurrency, config.save_interval)
    }

    /// Persists after the first completion, then whenever `save_interval`
    /// completions have accumulated since the last checkpoint, then once more at
    /// the end if anything is unsaved.
    ///
    /// A failed intermediate checkpoint is logged and retried on the next
    /// completion. A failed final checkpoint is returned.
    pub async fn run<B: ChatBackend, S: CheckpointStore>(
        &self,
        classifier: &RecordClassifier<'_, B>,
        store: &mut S,
    ) -> Result<BatchSummary, StoreError> {
        let pending = store.pending();
        let mut summary = BatchSummary::new(pending.len(), store.records().len() - pending.len());
        crate::info!(
            pending = summary.pending,
            already_processed = summary.skipped,
            concurrency = self.concurrency,
            save_interval = self.save_interval,
            "starting batch"
        );
        if pending.is_empty() {
            crate::info!("nothing to classify");
            return Ok(summary.finish());
        }

        let mut completions = stream::iter(pending)
            .map(move |record| async move {
                let verdicts = classifier.classify(&record).await;
                (record.id, verdicts)
            })
            .buffer_unordered(self.concurrency);

        let mut unsaved = 0usize;
        let mut retry_checkpoint = false;
        while let Some((id, verdicts)) = completions.next().await {
            store.apply(id, &verdicts)?;
            summary.tally(&verdicts);
            unsaved += 1;
            crate::info!(
                record = %id,
                "completed {}/{}",
                summary.completed,
                summary.pending
            );

            if summary.completed == 1 || unsaved >= self.save_interval || retry_checkpoint {
                match store.persist() {
                    Ok(()) => {
                        summary.checkpoints += 1;
                        unsaved = 0;
                        retry_checkpoint = false;
                        crate::info!("saved progress at record {}", id);
                    }
                    Err(e) => {
                        summary.failed_checkpoints += 1;
                        retry_checkpoint = true;
                        crate::error!("checkpoint after record {} failed: {}", id, e);
                    }
                }
            }
        }

        if unsaved > 0 {
            store.persist()?;
            summary.checkpoints += 1;
            crate::info!("saved final progress");
        }

        let summary = summary.finish();
        crate::info!("{}", summary);
        Ok(summary)
    }
}

#[derive(Clone, Debug)]
pub struct BatchSummary {
    /// Records that were unprocessed when the run started.
    pub pending: usize,
    /// Records already processed by an earlier run.
    pub skipped: usize,
    pub completed: usize,
    pub checkpoints: usize,
    pub failed_checkpoints: usize,
    pub verdicts: BTreeMap<String, usize>,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl BatchSummary {
    fn new(pending: usize, skipped: usize) -> Self {
        Self {
            pending,
            skipped,
            completed: 0,
            checkpoints: 0,
            failed_checkpoints: 0,
            verdicts: BTreeMap::new(),
            started_at: Local::now(),
            elapsed: Duration::ZERO,
        }
    }

    fn tally(&mut self, verdicts: &VerdictMap) {
        self.completed += 1;
        for verdict in verdicts.values() {
            *self.verdicts.entry(verdict.as_cell().to_owned()).or_default() += 1;
        }
    }

    fn finish(mut self) -> Self {
        self.elapsed = (Local::now() - self.started_at)
            .to_std()
            .unwrap_or_default();
        self
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.verdicts.get(verdict.as_cell()).copied().unwrap_or(0)
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "BatchSummary:")?;
        writeln!(f, "  started: {}", self.started_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "  elapsed: {:.1}s", self.elapsed.as_secs_f64())?;
        writeln!(
            f,
            "  records: {} classified of {} pending ({} already done)",
            self.completed, self.pending, self.skipped
        )?;
        writeln!(
            f,
            "  checkpoints: {} ({} failed)",
            self.checkpoints, self.failed_checkpoints
        )?;
        write!(f, "  verdicts:")?;
        for (cell, count) in &self.verdicts {
            write!(f, " {}={}", cell, count)?;
        }
        Ok(())
    }
}
