use super::KeywordGroup;
use crate::api::{ChatCompletionRequest, ChatMessage};

pub const SYSTEM_ROLE_PROMPT: &str = "You are a researcher";

const INSTRUCTION_PREFIX: &str = "ONLY RESPONSE ONE LETTER. Read the abstract carefully and determine if the paper discusses or relates to the concepts of";

const INSTRUCTION_SUFFIX: &str = "either explicitly or implicitly, in any context. Consider any related ideas, themes, or applications of these keywords. Respond with 'Y' if there is a mention or connection, or 'N' if there is none. The abstract is as follows:";

/// Builds the anchored request for one keyword group.
///
/// Every request replays the worked example first: the instruction applied to the
/// example abstract, followed by the expected letter, then the same instruction
/// applied to the abstract being classified.
#[derive(Clone, Debug)]
pub struct PromptBuilder<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub example_abstract: &'a str,
}

impl<'a> PromptBuilder<'a> {
    pub fn instruction(group: &KeywordGroup, abstract_text: &str) -> String {
        format!(
            "{INSTRUCTION_PREFIX} {}, {INSTRUCTION_SUFFIX} {abstract_text}",
            group.keyword_list()
        )
    }

    pub fn request(&self, group: &KeywordGroup, abstract_text: &str) -> ChatCompletionRequest {
        ChatCompletionRequest::new(
            self.model,
            self.temperature,
            vec![
                ChatMessage::system(SYSTEM_ROLE_PROMPT),
                ChatMessage::user(Self::instruction(group, self.example_abstract)),
                ChatMessage::system(group.example_answer.as_cell()),
                ChatMessage::user(Self::instruction(group, abstract_text)),
            ],
        )
    }
}
