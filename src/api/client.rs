use super::{
    config::ApiConfig,
    error::{map_serialization_error, ClientError},
    request::ChatCompletionRequest,
    stream::{sse_fragments, FragmentStream},
    ChatBackend,
};

#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    pub config: ApiConfig,
}

impl ApiClient {
    pub fn new(mut config: ApiConfig) -> crate::Result<Self> {
        config.load_api_key();
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    /// POST the request and hand back the body as `data:` fragments.
    ///
    /// Exactly one HTTP exchange; retrying is the caller's business.
    pub(crate) async fn post_stream(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FragmentStream, ClientError> {
        if !request.stream {
            return Err(ClientError::InvalidArgument(
                "only streamed completions are supported".into(),
            ));
        }
        let serialized_request = serde_json::to_string(request).map_err(map_serialization_error)?;
        crate::trace!("Serialized request: {}", serialized_request);

        let response = self
            .http_client
            .post(self.config.url())
            .headers(self.config.headers())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(serialized_request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        Ok(sse_fragments(response.bytes_stream()))
    }
}

impl ChatBackend for ApiClient {
    async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<FragmentStream, ClientError> {
        self.post_stream(request).await
    }
}
