use super::{
    prompt::PromptBuilder,
    query::{QueryRunner, QueryTarget},
    Answer,
    KeywordGroup,
    Verdict,
};
use crate::{api::ChatBackend, batch::store::Record, config::UnansweredVerdict};

/// Asks the same question `run_times` times and keeps the answer only if every run agrees.
pub struct ConsistencyVoter<'a, B: ChatBackend> {
    pub runner: QueryRunner<'a, B>,
    pub prompt: PromptBuilder<'a>,
    pub run_times: usize,
    pub unanswered_verdict: UnansweredVerdict,
}

impl<'a, B: ChatBackend> ConsistencyVoter<'a, B> {
    /// Runs are strictly sequential so one worker never has two copies of the same
    /// question in flight.
    pub async fn vote(&self, record: &Record, group: &KeywordGroup) -> Verdict {
        let request = self.prompt.request(group, &record.abstract_text);

        let mut answers = Vec::with_capacity(self.run_times);
        for run in 1..=self.run_times {
            let target = QueryTarget {
                record: record.id,
                group: group.id,
                run,
            };
            let answer = self.runner.run(&request, target).await;
            crate::debug!(
                record = %record.id,
                group = %group.id,
                "run {}/{}: {}",
                run,
                self.run_times,
                answer
            );
            answers.push(answer);
        }

        let verdict = reduce(&answers, self.unanswered_verdict);
        crate::info!(record = %record.id, group = %group.id, %verdict, "group classified");
        verdict
    }
}

/// Unanimous `Y` is Yes, unanimous `N` is No, anything else is Uncertain.
///
/// A vote where no run produced an answer is also Uncertain unless the policy maps it
/// to Unknown.
pub fn reduce(answers: &[Answer], unanswered: UnansweredVerdict) -> Verdict {
    let Some(first) = answers.first() else {
        return Verdict::Unknown;
    };
    if answers.iter().all(|a| a == first) {
        match first {
            Answer::Yes => return Verdict::Yes,
            Answer::No => return Verdict::No,
            Answer::NoAnswer => {
                if unanswered == UnansweredVerdict::Unknown {
                    return Verdict::Unknown;
                }
            }
        }
    }
    Verdict::Uncertain
}
