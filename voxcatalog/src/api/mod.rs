//! Low-level access layer for the catalog REST API
//!
//! Thin wrapper over `reqwest`: base URL, auth header, the `{"result": ...}`
//! envelope and error-body mapping. The higher-level [`crate::client`]
//! builds the core-facing operations on top of this.

pub mod auth;
pub mod radio;
pub mod track;

use crate::error::{CatalogError, Result};
use crate::models::ResultWrapper;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Default catalog API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.music.yandex.net";

/// Timeout for API requests (seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// User agent presented to the API
pub const USER_AGENT: &str = "VoxWave/0.1 (voxcatalog)";

/// Low-level API client
pub struct CatalogApi {
    client: Client,
    base_url: String,
    token: Option<String>,
    uid: Option<String>,
}

impl CatalogApi {
    /// Create a client against the default API host
    pub fn new() -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Create a client against a specific host (used by tests)
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            token: None,
            uid: None,
        })
    }

    /// Install the auth token and account id for subsequent calls
    pub fn set_auth(&mut self, token: String, uid: String) {
        self.token = Some(token);
        self.uid = Some(uid);
    }

    /// Drop any installed token and account id
    pub(crate) fn reset_auth(&mut self) {
        self.token = None;
        self.uid = None;
    }

    /// The underlying HTTP client, for calls outside the API base
    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    /// Current auth token, if any
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Account id of the authenticated user, if any
    pub fn uid(&self) -> Option<&str> {
        self.uid.as_deref()
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET an endpoint, unwrapping the result envelope
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.request(reqwest::Method::GET, endpoint, params).await
    }

    /// POST form parameters to an endpoint, unwrapping the result envelope
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        self.request(reqwest::Method::POST, endpoint, params).await
    }

    /// POST a JSON body to an endpoint with query parameters
    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        body: &Value,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("POST {} (json body)", url);

        let mut request = self.client.post(&url).query(query).json(body);
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("OAuth {token}"));
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// GET an absolute URL outside the API base (storage hosts)
    pub(crate) async fn get_raw(&self, url: &str) -> Result<String> {
        debug!("GET {} (raw)", url);

        let mut request = self.client.get(url);
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("OAuth {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!("Storage error ({}): {}", status, text);
            return Err(CatalogError::Api {
                code: status.as_u16(),
                message: text,
            });
        }
        Ok(response.text().await?)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {} with {} params", method, url, params.len());

        let mut request = if method == reqwest::Method::GET {
            self.client.get(&url).query(params)
        } else {
            self.client.post(&url).form(params)
        };

        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("OAuth {token}"));
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Map the HTTP response onto a result payload or a catalog error
    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let status_code = status.as_u16();

        debug!("Response status: {}", status);

        let text = response.text().await?;

        if !status.is_success() {
            let message = extract_error_message(&text).unwrap_or_else(|| text.clone());
            warn!("API error ({}): {}", status_code, message);
            if status_code == 401 || status_code == 403 {
                return Err(CatalogError::Unauthorized(message));
            }
            if status_code == 404 {
                return Err(CatalogError::NotFound(message));
            }
            return Err(CatalogError::Api {
                code: status_code,
                message,
            });
        }

        let wrapper: ResultWrapper<T> = serde_json::from_str(&text).map_err(|e| {
            warn!("Failed to parse response: {}", e);
            CatalogError::Json(e)
        })?;
        Ok(wrapper.result)
    }
}

/// Pull the human-readable message out of an API error body
fn extract_error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let error = json.get("error")?;
    if let Some(message) = error.get("message").and_then(|m| m.as_str()) {
        return Some(message.to_string());
    }
    error.as_str().map(|s| s.to_string())
}
