use super::Answer;
use crate::api::{
    stream::{delta_content, DONE_PAYLOAD},
    ClientError,
    FragmentStream,
};
use futures::StreamExt;

/// Finds the answer letter in a streamed response.
///
/// Alphabetic characters of each fragment's delta content are scanned in order and
/// the first `'Y'` or `'N'` wins. Once found, nothing later in the stream matters.
/// Fragments that are not chat completion chunks are counted and skipped.
#[derive(Debug, Default, Clone)]
pub struct ResponseExtractor {
    answer: Option<Answer>,
    pub fragments_seen: usize,
    pub parse_errors: usize,
}

impl ResponseExtractor {
    pub fn new() -> Self {
        Default::default()
    }

    /// Feeds one payload. Returns the answer as soon as one has been found.
    pub fn feed(&mut self, payload: &str) -> Option<Answer> {
        if self.answer.is_some() {
            return self.answer;
        }
        self.fragments_seen += 1;
        match delta_content(payload) {
            Ok(Some(content)) => {
                self.answer = first_answer_letter(&content);
                if let Some(answer) = self.answer {
                    crate::trace!("answer {} in fragment {}", answer, self.fragments_seen);
                }
            }
            Ok(None) => (),
            Err(e) => {
                self.parse_errors += 1;
                crate::error!("skipping fragment {}: {}", self.fragments_seen, e);
            }
        }
        self.answer
    }

    pub fn answer(&self) -> Answer {
        self.answer.unwrap_or(Answer::NoAnswer)
    }

    /// Drains `fragments` until an answer shows up or the stream ends.
    ///
    /// A transport error before the answer fails the whole attempt; the remaining
    /// fragments are dropped unread once the answer is known.
    pub async fn extract(mut self, mut fragments: FragmentStream) -> Result<Answer, ClientError> {
        while let Some(fragment) = fragments.next().await {
            let payload = fragment?;
            if payload == DONE_PAYLOAD {
                break;
            }
            if let Some(answer) = self.feed(&payload) {
                return Ok(answer);
            }
        }
        if self.parse_errors > 0 {
            crate::debug!(
                "stream ended without an answer ({} fragments, {} unparseable)",
                self.fragments_seen,
                self.parse_errors
            );
        }
        Ok(self.answer())
    }
}

fn first_answer_letter(content: &str) -> Option<Answer> {
    content
        .chars()
        .filter(|c| c.is_alphabetic())
        .find_map(Answer::from_letter)
}
