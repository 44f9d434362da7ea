use std::fmt;

use humanizer_core::{ErrorBody, HumanizeRequest, HumanizeRequestBody, HumanizeResponseBody};

#[derive(Debug)]
pub enum ApiError {
    Network(reqwest::Error),
    Server { message: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(e) => write!(f, "could not reach the relay server ({e})"),
            ApiError::Server { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Network(e) => Some(e),
            ApiError::Server { .. } => None,
        }
    }
}

/// HTTP client for the relay's humanize endpoint.
#[derive(Debug, Clone)]
pub struct RelayApi {
    http: reqwest::Client,
    humanize_url: String,
}

impl RelayApi {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            humanize_url: format!("{}/api/humanize", base_url.trim_end_matches('/')),
        }
    }

    /// Single awaited call, no timeout beyond the client default and no
    /// cancellation: dropping the future simply discards the response.
    pub async fn humanize(&self, request: &HumanizeRequest) -> Result<String, ApiError> {
        let body = HumanizeRequestBody::from_request(request);
        let response = self
            .http
            .post(&self.humanize_url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::Network)?;

        if !response.status().is_success() {
            let message = response
                .json::<ErrorBody>()
                .await
                .map(|b| b.error)
                .unwrap_or_else(|_| "the relay returned an unexpected response".to_owned());
            return Err(ApiError::Server { message });
        }

        let body: HumanizeResponseBody = response.json().await.map_err(ApiError::Network)?;
        Ok(body.result)
    }
}
