//! Run configuration, read once from YAML and passed by reference to everything else.
//!
//! The YAML keys are those of the existing `config.yaml` files:
//!
//! ```yaml
//! port_number: 1234
//! model_name: "lmstudio-community/Meta-Llama-3-8B-Instruct-GGUF"
//! keywords_list: "soil, microbiome; drought, water stress"
//! temperature: 0.7
//! file_path: "abstracts.csv"
//! example_abstract: "..."
//! example_answer: "Y,N"
//! run_times: 3
//! max_retries: 5
//! ```
//!
//! Optional keys: `host`, `completion_path`, `concurrency`, `save_interval`,
//! `request_timeout_secs`, `retry_delay_ms`, `unanswered_verdict`, `api_key`,
//! `api_key_env_var`.

use crate::{
    api::config::{
        ApiConfig,
        ApiConfigTrait,
        DEFAULT_API_HOST,
        DEFAULT_API_KEY_ENV_VAR,
        DEFAULT_COMPLETION_PATH,
    },
    classify::{KeywordGroup, KeywordGroupId, Verdict},
    logging::{LoggingConfig, LoggingConfigTrait},
};
use secrecy::Secret;
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_CONCURRENCY: usize = 6;
pub const DEFAULT_SAVE_INTERVAL: usize = 12;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("the number of keyword groups ({groups}) does not match the number of example answers ({answers})")]
    GroupAnswerCountMismatch { groups: usize, answers: usize },
    #[error("keyword group {group} has no keywords")]
    EmptyKeywordGroup { group: usize },
    #[error("example answer {value:?} for keyword group {group} is neither Y nor N")]
    InvalidExampleAnswer { group: usize, value: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
    #[error("temperature {0} is outside 0.0..=2.0")]
    Temperature(f32),
}

/// What a vote becomes when none of its runs produced a letter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnansweredVerdict {
    /// Same bucket as disagreeing runs.
    #[default]
    Uncertain,
    Unknown,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    port_number: u16,
    model_name: String,
    keywords_list: String,
    temperature: f32,
    file_path: PathBuf,
    example_abstract: String,
    example_answer: String,
    run_times: usize,
    max_retries: u32,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_completion_path")]
    completion_path: String,
    #[serde(default = "default_concurrency")]
    concurrency: usize,
    #[serde(default = "default_save_interval")]
    save_interval: usize,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default)]
    retry_delay_ms: u64,
    #[serde(default)]
    unanswered_verdict: UnansweredVerdict,
    #[serde(default)]
    api_key: Option<Secret<String>>,
    #[serde(default = "default_api_key_env_var")]
    api_key_env_var: String,
}

fn default_host() -> String {
    DEFAULT_API_HOST.to_string()
}
fn default_completion_path() -> String {
    DEFAULT_COMPLETION_PATH.to_string()
}
fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}
fn default_save_interval() -> usize {
    DEFAULT_SAVE_INTERVAL
}
fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}
fn default_api_key_env_var() -> String {
    DEFAULT_API_KEY_ENV_VAR.to_string()
}

#[derive(Clone, Debug)]
pub struct ClassifierConfig {
    pub api_config: ApiConfig,
    pub logging_config: LoggingConfig,
    pub model_name: String,
    pub temperature: f32,
    pub dataset_path: PathBuf,
    pub example_abstract: String,
    pub keyword_groups: Vec<KeywordGroup>,
    /// Repeats per question.
    pub run_times: usize,
    /// Attempts per repeat.
    pub max_retries: u32,
    /// Zero retries immediately.
    pub retry_delay: Duration,
    pub concurrency: usize,
    pub save_interval: usize,
    pub unanswered_verdict: UnansweredVerdict,
}

impl ClassifierConfig {
    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&contents)?;
        // A relative dataset path is relative to the config file.
        if config.dataset_path.is_relative() {
            if let Some(dir) = path.parent() {
                config.dataset_path = dir.join(&config.dataset_path);
            }
        }
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_yaml::from_str(yaml)?;
        Self::from_raw(raw)
    }

    /// Checks the values that setters can change after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("run_times", self.run_times),
            ("max_retries", self.max_retries as usize),
            ("concurrency", self.concurrency),
            ("save_interval", self.save_interval),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Temperature(self.temperature));
        }
        Ok(())
    }

    pub fn with_dataset_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.dataset_path = path.into();
        self
    }

    /// Records classified at the same time.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Completed records between checkpoints.
    pub fn with_save_interval(mut self, save_interval: usize) -> Self {
        self.save_interval = save_interval;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn with_unanswered_verdict(mut self, unanswered_verdict: UnansweredVerdict) -> Self {
        self.unanswered_verdict = unanswered_verdict;
        self
    }
}

impl ClassifierConfig {
    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let keyword_groups = parse_keyword_groups(&raw.keywords_list, &raw.example_answer)?;

        let api_config = ApiConfig {
            host: raw.host,
            port: raw.port_number,
            completion_path: raw.completion_path,
            api_key: raw.api_key,
            api_key_env_var: raw.api_key_env_var,
            request_timeout: Duration::from_secs(raw.request_timeout_secs),
        };

        let config = Self {
            api_config,
            logging_config: LoggingConfig::default(),
            model_name: raw.model_name,
            temperature: raw.temperature,
            dataset_path: raw.file_path,
            example_abstract: raw.example_abstract,
            keyword_groups,
            run_times: raw.run_times,
            max_retries: raw.max_retries,
            retry_delay: Duration::from_millis(raw.retry_delay_ms),
            concurrency: raw.concurrency,
            save_interval: raw.save_interval,
            unanswered_verdict: raw.unanswered_verdict,
        };
        config.validate()?;
        Ok(config)
    }
}

/// `"a, b; c"` with `"Y,N"` becomes two groups anchored on Yes and No.
pub fn parse_keyword_groups(
    keywords_list: &str,
    example_answers: &str,
) -> Result<Vec<KeywordGroup>, ConfigError> {
    let groups: Vec<&str> = keywords_list.split(';').map(str::trim).collect();
    let answers: Vec<&str> = example_answers.split(',').map(str::trim).collect();
    if groups.len() != answers.len() {
        return Err(ConfigError::GroupAnswerCountMismatch {
            groups: groups.len(),
            answers: answers.len(),
        });
    }

    groups
        .into_iter()
        .zip(answers)
        .enumerate()
        .map(|(i, (group, answer))| {
            let id = KeywordGroupId(i + 1);
            let keywords: Vec<String> = group
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_owned)
                .collect();
            if keywords.is_empty() {
                return Err(ConfigError::EmptyKeywordGroup { group: id.0 });
            }
            let example_answer = match answer.to_ascii_uppercase().as_str() {
                "Y" => Verdict::Yes,
                "N" => Verdict::No,
                _ => {
                    return Err(ConfigError::InvalidExampleAnswer {
                        group: id.0,
                        value: answer.to_string(),
                    })
                }
            };
            Ok(KeywordGroup {
                id,
                keywords,
                example_answer,
            })
        })
        .collect()
}

impl ApiConfigTrait for ClassifierConfig {
    fn api_config_mut(&mut self) -> &mut ApiConfig {
        &mut self.api_config
    }
}

impl LoggingConfigTrait for ClassifierConfig {
    fn logging_config_mut(&mut self) -> &mut LoggingConfig {
        &mut self.logging_config
    }
}
