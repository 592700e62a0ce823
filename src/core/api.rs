use std::time::Duration;

use reqwest::{Client, Response, StatusCode, multipart::Form};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::core::config::DashboardConfig;

/// Header that scopes analytics calls to one project.
pub const PROJECT_HEADER: &str = "X-Requested-Project";

#[derive(Debug)]
pub enum ApiError {
    /// The request never produced a response.
    Network(String),
    /// The backend answered with a non-success status.
    Status {
        status: u16,
        reason: String,
        /// `detail` field of a JSON error body, if there was one.
        detail: Option<String>,
        /// Whether the error body parsed as JSON at all.
        json_body: bool,
    },
    /// A success response whose body was not the expected JSON.
    Decode(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Network(e) => write!(f, "{}", e),
            ApiError::Status { reason, .. } => write!(f, "{}", reason),
            ApiError::Decode(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            ApiError::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// The backend's `detail`, or `fallback` when there is none.
    pub fn detail_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.detail().filter(|d| !d.is_empty()).unwrap_or(fallback)
    }

    /// True for a non-success response whose body was not JSON (proxy pages, crashes).
    pub fn is_opaque_failure(&self) -> bool {
        matches!(self, ApiError::Status { json_body: false, .. })
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

/// JSON client for the dashboard backend. Cheap to clone; clones share the cookie jar.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base: String,
}

impl ApiClient {
    pub fn new(base: impl Into<String>) -> Self {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(client, base)
    }

    pub fn with_client(client: Client, base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { client, base }
    }

    pub fn from_config(config: &DashboardConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config.api_base.clone()))
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        debug!("GET {}", path);
        let res = self.client.get(self.url(path)).send().await?;
        decode(path, res).await
    }

    /// GET with the project header set. `path` is expected to carry `project=` already.
    pub async fn get_scoped_json<T: DeserializeOwned>(
        &self,
        path: &str,
        project: &str,
    ) -> Result<T, ApiError> {
        debug!("GET {} [{}]", path, project);
        let res = self
            .client
            .get(self.url(path))
            .header(PROJECT_HEADER, project)
            .header(reqwest::header::CACHE_CONTROL, "no-store")
            .send()
            .await?;
        decode(path, res).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        debug!("POST {}", path);
        let res = self.client.post(self.url(path)).json(body).send().await?;
        decode(path, res).await
    }

    /// POST without a body; the response body is ignored.
    pub async fn post_empty(&self, path: &str) -> Result<(), ApiError> {
        debug!("POST {}", path);
        let res = self.client.post(self.url(path)).send().await?;
        check(path, res).await.map(|_| ())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        debug!("POST multipart {}", path);
        let res = self.client.post(self.url(path)).multipart(form).send().await?;
        decode(path, res).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        debug!("DELETE {}", path);
        let res = self.client.delete(self.url(path)).send().await?;
        check(path, res).await.map(|_| ())
    }
}

async fn check(path: &str, res: Response) -> Result<Response, ApiError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    let parsed = serde_json::from_str::<serde_json::Value>(&body).ok();
    let detail = parsed
        .as_ref()
        .and_then(|v| v.get("detail"))
        .and_then(|d| match d {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        });
    warn!("{} failed with {}: {:?}", path, status, detail);
    Err(ApiError::Status {
        status: status.as_u16(),
        reason: reason_phrase(status),
        detail,
        json_body: parsed.is_some(),
    })
}

async fn decode<T: DeserializeOwned>(path: &str, res: Response) -> Result<T, ApiError> {
    let res = check(path, res).await?;
    let body = res.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        warn!("{} returned undecodable body: {}", path, e);
        ApiError::Decode(e.to_string())
    })
}

fn reason_phrase(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let api = ApiClient::new("http://localhost:8000/api/");
        assert_eq!(api.url("/stats"), "http://localhost:8000/api/stats");
    }

    #[test]
    fn detail_fallbacks() {
        let err = ApiError::Status {
            status: 400,
            reason: "Bad Request".into(),
            detail: Some(String::new()),
            json_body: true,
        };
        assert_eq!(err.detail_or("Ошибка"), "Ошибка");
        assert!(!err.is_opaque_failure());
        assert_eq!(err.to_string(), "Bad Request");

        let err = ApiError::Status {
            status: 502,
            reason: "Bad Gateway".into(),
            detail: None,
            json_body: false,
        };
        assert!(err.is_opaque_failure());
        assert_eq!(err.status(), Some(502));
    }
}
