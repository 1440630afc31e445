use crate::config::Settings;
use crate::prelude::*;
use codeaura_core::action::{backend_error_message, ToolPayload};
use codeaura_core::catalogue::{ToolCatalogue, ToolSummary};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;

/// The external AI-tool execution endpoint
pub trait AiToolService {
    /// `POST /ai-tools/{tool_id}/use`, returning the raw response body
    fn use_tool(
        &self,
        tool_id: u32,
        payload: &ToolPayload,
    ) -> impl Future<Output = std::result::Result<Value, Error>> + Send;
}

/// HTTP client for the Code Aura REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

/// Create an HTTP client that sends the bearer token, when there is one
pub fn create_authenticated_client(token: Option<&str>) -> Result<reqwest::Client> {
    use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&f!("Bearer {token}"))
                .map_err(|e| eyre!("Invalid header value: {}", e))?,
        );
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(concat!("codeaura/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| eyre!("Failed to build HTTP client: {}", e))
}

impl ApiClient {
    pub fn new(settings: &Settings) -> Result<Self> {
        Ok(Self {
            http: create_authenticated_client(settings.token.as_deref())?,
            base_url: settings.api_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        f!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `GET /ai-tools`
    pub async fn list_tools(&self) -> std::result::Result<ToolCatalogue, Error> {
        let response = self
            .http
            .get(self.url("ai-tools"))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        read_json(response).await
    }

    /// `GET /ai-tools/{id}`
    pub async fn get_tool(&self, id: u32) -> std::result::Result<ToolSummary, Error> {
        let response = self
            .http
            .get(self.url(&f!("ai-tools/{id}")))
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        read_json(response).await
    }
}

impl AiToolService for ApiClient {
    async fn use_tool(
        &self,
        tool_id: u32,
        payload: &ToolPayload,
    ) -> std::result::Result<Value, Error> {
        let url = self.url(&f!("ai-tools/{tool_id}/use"));
        log::debug!("POST {url}");

        let response = self
            .http
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;
        read_json(response).await
    }
}

/// Decode a success body, or turn a failure status into [`Error::Backend`]
async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> std::result::Result<T, Error> {
    let status = response.status();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = match backend_error_message(&body) {
            m if m.is_empty() => status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string(),
            m => m,
        };
        log::warn!("backend answered {status}: {message}");
        return Err(Error::Backend {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| Error::Decode(e.to_string()))
}
