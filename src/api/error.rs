/// A failed request attempt. Consumed by the query runner, never surfaced past it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Underlying error from reqwest library after an API call was made
    #[error("http error: {0}")]
    Reqwest(#[from] reqwest::Error),
    /// Server answered with a non-success status
    #[error("request failed with status code {status}: {body}")]
    Status { status: u16, body: String },
    /// The streamed body broke off before the server finished it
    #[error("stream error: {0}")]
    Stream(#[from] std::io::Error),
    /// Error when a request cannot be serialized
    #[error("failed to serialize api request: {0}")]
    JSONSerialize(serde_json::Error),
    /// Error from client side validation
    #[error("invalid args: {0}")]
    InvalidArgument(String),
}

/// A streamed fragment that is not a chat completion chunk. The fragment is skipped.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed chunk: {source} (data: {data})")]
    Json {
        source: serde_json::Error,
        data: String,
    },
    #[error("chunk has no choices[0].delta")]
    MissingDelta,
}

pub(crate) fn map_serialization_error(e: serde_json::Error) -> ClientError {
    tracing::error!("failed serialization: {}", e);
    ClientError::JSONSerialize(e)
}

pub(crate) fn map_chunk_error(e: serde_json::Error, data: &str) -> ParseError {
    ParseError::Json {
        source: e,
        data: data.chars().take(200).collect(),
    }
}
