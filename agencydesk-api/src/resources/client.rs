//! Generic authenticated resource client
//!
//! Every call carries the owning session's bearer token. A 401 from the
//! backend clears that session before the error is returned, so guards
//! re-evaluate and send the viewer back to the login route.

use super::entities::{Draft, Resource};
use crate::error::ApiError;
use crate::http::{endpoint_url, Envelope, PageMeta};
use agencydesk_auth::SessionStore;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

/// Query parameters of a list call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

impl ListQuery {
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    pub fn per_page(mut self, per_page: u32) -> Self {
        self.per_page = Some(per_page);
        self
    }

    pub fn search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = (!search.trim().is_empty()).then_some(search);
        self
    }
}

/// One page of a list response
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: Option<PageMeta>,
}

#[derive(Deserialize)]
struct ValidationBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: std::collections::BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ResourceClient {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    login_route: String,
}

impl ResourceClient {
    pub fn new(
        http: reqwest::Client,
        base_url: impl Into<String>,
        store: SessionStore,
        login_route: impl Into<String>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            store,
            login_route: login_route.into(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub async fn list<T: Resource>(&self, query: &ListQuery) -> Result<Page<T>, ApiError> {
        let url = self.url(T::PATH, None)?;
        let request = self.http.get(url).query(query);
        let envelope: Envelope<Vec<T>> = self.send(request).await?;

        Ok(Page {
            items: envelope.data.unwrap_or_default(),
            meta: envelope.meta,
        })
    }

    pub async fn get<T: Resource>(&self, id: &str) -> Result<T, ApiError> {
        let url = self.url(T::PATH, Some(id))?;
        self.expect_data(self.http.get(url)).await
    }

    pub async fn create<T: Resource>(&self, draft: &T::Draft) -> Result<T, ApiError> {
        draft.validate()?;
        let url = self.url(T::PATH, None)?;
        self.expect_data(self.http.post(url).json(draft)).await
    }

    pub async fn update<T: Resource>(&self, id: &str, draft: &T::Draft) -> Result<T, ApiError> {
        draft.validate()?;
        let url = self.url(T::PATH, Some(id))?;
        self.expect_data(self.http.put(url).json(draft)).await
    }

    /// Partial update with an arbitrary JSON body
    pub async fn patch<T: Resource>(
        &self,
        id: &str,
        changes: &serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = self.url(T::PATH, Some(id))?;
        self.expect_data(self.http.patch(url).json(changes)).await
    }

    pub async fn toggle_status<T: Resource>(&self, id: &str) -> Result<T, ApiError> {
        let mut url = self.url(T::PATH, Some(id))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::MalformedResponse {
                reason: format!("cannot extend URL {}", self.base_url),
            })?
            .push("toggle-status");
        self.expect_data(self.http.request(Method::PATCH, url)).await
    }

    pub async fn delete<T: Resource>(&self, id: &str) -> Result<(), ApiError> {
        let url = self.url(T::PATH, Some(id))?;
        let _: Envelope<serde_json::Value> = self.send(self.http.delete(url)).await?;
        info!(resource = T::NAME, id = id, "Deleted record");
        Ok(())
    }

    fn url(&self, path: &str, id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = endpoint_url(&self.base_url, path)?;
        if let Some(id) = id {
            url.path_segments_mut()
                .map_err(|_| ApiError::MalformedResponse {
                    reason: format!("cannot extend URL {}", self.base_url),
                })?
                .push(id);
        }
        Ok(url)
    }

    async fn expect_data<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let envelope: Envelope<T> = self.send(request).await?;
        envelope.data.ok_or_else(|| ApiError::MalformedResponse {
            reason: "response has no data".to_string(),
        })
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        let authorization = self
            .store
            .snapshot()
            .session()
            .map(|s| s.authorization_header())
            .ok_or(ApiError::NotAuthenticated {
                class: self.store.class(),
            })?;

        let response = request
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await?;

        let status = response.status();
        let resource = response.url().path().to_string();
        debug!(status = status.as_u16(), resource = %resource, "Resource response");

        if status.is_success() {
            let body = response.text().await?;
            let envelope: Envelope<T> =
                serde_json::from_str(&body).map_err(|e| ApiError::MalformedResponse {
                    reason: e.to_string(),
                })?;
            if !envelope.success {
                return Err(ApiError::MalformedResponse {
                    reason: envelope
                        .message
                        .unwrap_or_else(|| "success flag is false".to_string()),
                });
            }
            return Ok(envelope);
        }

        Err(match status {
            StatusCode::UNAUTHORIZED => self.handle_unauthorized(),
            StatusCode::FORBIDDEN => ApiError::Forbidden { resource },
            StatusCode::NOT_FOUND => ApiError::NotFound { resource },
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                validation_failure(&body)
            }
            s if s.is_server_error() => ApiError::Server { status: s.as_u16() },
            s => ApiError::Unexpected { status: s.as_u16() },
        })
    }

    fn handle_unauthorized(&self) -> ApiError {
        warn!(class = %self.store.class(), "Token rejected by backend; clearing session");
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to erase persisted session");
        }
        ApiError::Unauthorized {
            login_route: self.login_route.clone(),
        }
    }
}

fn validation_failure(body: &str) -> ApiError {
    match serde_json::from_str::<ValidationBody>(body) {
        Ok(parsed) => {
            let first = parsed.errors.into_iter().next();
            let message = first
                .as_ref()
                .and_then(|(_, messages)| messages.first().cloned())
                .or(parsed.message)
                .unwrap_or_else(|| "request was rejected".to_string());
            ApiError::Validation {
                message,
                field: first.map(|(field, _)| field),
            }
        }
        Err(_) => ApiError::Validation {
            message: "request was rejected".to_string(),
            field: None,
        },
    }
}
