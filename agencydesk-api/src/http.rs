//! Shared HTTP plumbing: client construction, URL joining, response envelope

use agencydesk_core::{AgencyError, AgencyResult, ApiConfig, ErrorContext};
use serde::{Deserialize, Serialize};
use url::Url;

/// Create the HTTP client used for every backend call
pub fn create_http_client(config: &ApiConfig) -> AgencyResult<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();

    headers.insert(
        reqwest::header::USER_AGENT,
        reqwest::header::HeaderValue::from_str(&config.user_agent).map_err(|e| {
            AgencyError::Config {
                message: format!("Invalid user agent: {}", e),
                source: Some(Box::new(e)),
                context: ErrorContext::new("http_client").with_operation("create_client"),
            }
        })?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|e| AgencyError::Network {
            message: format!("Failed to create HTTP client: {}", e),
            source: Some(Box::new(e)),
            context: ErrorContext::new("http_client").with_operation("create_client"),
        })
}

/// Append `path` to `base_url`, keeping any path prefix of the base
pub fn endpoint_url(base_url: &str, path: &str) -> AgencyResult<Url> {
    let joined = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    );

    Url::parse(&joined).map_err(|e| AgencyError::Config {
        message: format!("Invalid endpoint URL '{}': {}", joined, e),
        source: Some(Box::new(e)),
        context: ErrorContext::new("http_client")
            .with_operation("endpoint_url")
            .with_suggestion("Check api.base_url in the configuration"),
    })
}

/// `{success, data, meta?}` wrapper around every backend response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Pagination metadata of list responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}
