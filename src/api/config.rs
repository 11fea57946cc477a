use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;

pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_COMPLETION_PATH: &str = "/v1/chat/completions";
pub const DEFAULT_API_KEY_ENV_VAR: &str = "CLASSIFIER_API_KEY";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub completion_path: String,
    pub api_key: Option<Secret<String>>,
    pub api_key_env_var: String,
    /// Covers the whole exchange, including the streamed body.
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_API_HOST.to_string(),
            port: 1234,
            completion_path: DEFAULT_COMPLETION_PATH.to_string(),
            api_key: None,
            api_key_env_var: DEFAULT_API_KEY_ENV_VAR.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl ApiConfig {
    /// Local servers usually run without a key, so a missing key is not an error.
    pub(crate) fn load_api_key(&mut self) {
        if self.api_key.is_some() {
            crate::trace!("Using api_key from config");
            return;
        }
        dotenvy::dotenv().ok();
        match dotenvy::var(&self.api_key_env_var) {
            Ok(api_key) => {
                crate::trace!("Loaded api_key from {}", self.api_key_env_var);
                self.api_key = Some(Secret::new(api_key));
            }
            Err(_) => {
                crate::trace!("{} not set, sending requests without a key", self.api_key_env_var)
            }
        }
    }

    pub fn url(&self) -> String {
        format!(
            "http://{}:{}{}",
            self.host, self.port, self.completion_path
        )
    }

    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            if let Ok(header_value) =
                HeaderValue::from_str(&format!("Bearer {}", api_key.expose_secret()))
            {
                headers.insert(AUTHORIZATION, header_value);
            } else {
                crate::error!("Failed to create header value from authorization value");
            }
        }
        headers
    }
}

pub trait ApiConfigTrait {
    fn api_config_mut(&mut self) -> &mut ApiConfig;

    fn with_api_host<S: AsRef<str>>(mut self, host: S) -> Self
    where
        Self: Sized,
    {
        self.api_config_mut().host = host.as_ref().to_string();
        self
    }

    fn with_api_port(mut self, port: u16) -> Self
    where
        Self: Sized,
    {
        self.api_config_mut().port = port;
        self
    }

    fn with_completion_path<S: Into<String>>(mut self, path: S) -> Self
    where
        Self: Sized,
    {
        self.api_config_mut().completion_path = path.into();
        self
    }

    fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self
    where
        Self: Sized,
    {
        self.api_config_mut().api_key = Some(Secret::new(api_key.into()));
        self
    }

    fn with_request_timeout(mut self, timeout: Duration) -> Self
    where
        Self: Sized,
    {
        self.api_config_mut().request_timeout = timeout;
        self
    }
}

impl ApiConfigTrait for ApiConfig {
    fn api_config_mut(&mut self) -> &mut ApiConfig {
        self
    }
}
