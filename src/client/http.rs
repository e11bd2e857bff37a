//! reqwest-backed management API client.
//!
//! Every endpoint answers with a `{ "data": ... }` envelope; list and item
//! calls unwrap it, the snapshot call keeps it so the document can be
//! persisted as received.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde_json::Value;
use tracing::debug;

use super::{ApiError, ApiResult, RemoteApi};

/// User agent sent with every request.
const USER_AGENT: &str = concat!("promote/", env!("CARGO_PKG_VERSION"));

/// HTTP client for one instance.
#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    token: String,
    http_client: Client,
}

impl HttpClient {
    /// Create a client for `base_url` authenticated with a static bearer token.
    pub fn new(base_url: &str, token: &str) -> ApiResult<Self> {
        let http_client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self::with_http_client(base_url, token, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_http_client(base_url: &str, token: &str, http_client: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            http_client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn read_json(response: Response) -> ApiResult<Value> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::from_body(status.as_u16(), &body));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| ApiError::Parse(format!("invalid JSON body: {}", e)))
    }

    fn unwrap_data(mut value: Value) -> Value {
        match value.get_mut("data") {
            Some(data) => data.take(),
            None => value,
        }
    }
}

#[async_trait]
impl RemoteApi for HttpClient {
    async fn snapshot(&self) -> ApiResult<Value> {
        let url = self.url("schema/snapshot");
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::read_json(response).await
    }

    async fn list(&self, resource: &str) -> ApiResult<Vec<Value>> {
        let url = self.url(resource);
        debug!("GET {}", url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("limit", "-1")])
            .bearer_auth(&self.token)
            .send()
            .await?;

        match Self::unwrap_data(Self::read_json(response).await?) {
            Value::Array(items) => Ok(items),
            Value::Null => Ok(Vec::new()),
            other => Err(ApiError::Parse(format!(
                "expected a list of {}, got {}",
                resource,
                json_kind(&other)
            ))),
        }
    }

    async fn create(&self, path: &str, body: &Value) -> ApiResult<Value> {
        let url = self.url(path);
        debug!("POST {}", url);
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(Self::unwrap_data(Self::read_json(response).await?))
    }

    async fn patch(&self, path: &str, id: &str, body: &Value) -> ApiResult<Value> {
        let url = self.url(&format!("{}/{}", path, id));
        debug!("PATCH {}", url);
        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;
        Ok(Self::unwrap_data(Self::read_json(response).await?))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
