pub mod client;
pub mod config;
pub mod error;
pub mod request;
pub mod stream;

pub use client::ApiClient;
pub use config::{ApiConfig, ApiConfigTrait};
pub use error::{ClientError, ParseError};
pub use request::{ChatCompletionRequest, ChatMessage, Role};
pub use stream::FragmentStream;

/// Something that can answer a chat completion request with a stream of fragments.
///
/// One call is one attempt. A returned `Err` is a transport failure (network error,
/// non-success status) and costs the caller one retry.
#[allow(async_fn_in_trait)]
pub trait ChatBackend {
    async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FragmentStream, ClientError>;
}

