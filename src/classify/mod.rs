pub mod extractor;
pub mod prompt;
pub mod query;
pub mod record;
pub mod voter;

use std::{collections::BTreeMap, fmt, str::FromStr};

pub use extractor::ResponseExtractor;
pub use query::{QueryRunner, QueryTarget};
pub use record::RecordClassifier;
pub use voter::ConsistencyVoter;

/// Outcome of one run: the letter the model led with, or nothing usable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Answer {
    Yes,
    No,
    NoAnswer,
}

impl Answer {
    pub fn from_letter(c: char) -> Option<Self> {
        match c {
            'Y' => Some(Answer::Yes),
            'N' => Some(Answer::No),
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        !matches!(self, Answer::NoAnswer)
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::Yes => write!(f, "Y"),
            Answer::No => write!(f, "N"),
            Answer::NoAnswer => write!(f, "N/A"),
        }
    }
}

/// Final classification of one (record, keyword group) pair.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verdict {
    Yes,
    No,
    Uncertain,
    Unknown,
}

impl Verdict {
    pub fn as_cell(&self) -> &'static str {
        match self {
            Verdict::Yes => "Y",
            Verdict::No => "N",
            Verdict::Uncertain => "Uncertain",
            Verdict::Unknown => "N/A",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_cell())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("not a verdict: {0:?}")]
pub struct VerdictParseError(pub String);

impl FromStr for Verdict {
    type Err = VerdictParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Y" | "y" | "Yes" | "yes" => Ok(Verdict::Yes),
            "N" | "n" | "No" | "no" => Ok(Verdict::No),
            "Uncertain" | "uncertain" => Ok(Verdict::Uncertain),
            "N/A" | "Unknown" | "unknown" => Ok(Verdict::Unknown),
            other => Err(VerdictParseError(other.to_string())),
        }
    }
}

/// 1-based position of a keyword group in the configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct KeywordGroupId(pub usize);

impl KeywordGroupId {
    pub fn column_name(&self) -> String {
        format!("Keyword_Group_{}_Response", self.0)
    }
}

impl fmt::Display for KeywordGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type VerdictMap = BTreeMap<KeywordGroupId, Verdict>;

/// One question: "does this abstract relate to these keywords?".
#[derive(Clone, Debug, PartialEq)]
pub struct KeywordGroup {
    pub id: KeywordGroupId,
    pub keywords: Vec<String>,
    /// Expected answer for the worked example; anchors the response format.
    pub example_answer: Verdict,
}

impl KeywordGroup {
    pub fn keyword_list(&self) -> String {
        self.keywords.join(", ")
    }
}
