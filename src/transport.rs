//! HTTP boundary: the only place requests leave the process.

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::debug;

use crate::config::Config;
use crate::error::{RelEditError, Result};
use crate::models::Method;

/// Response as handed back by the transport, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.contains("json"))
    }
}

/// Issues one request. Timeouts and connection failures come back as
/// [`RelEditError::Network`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        url: &str,
        params: &[(String, String)],
        method: Method,
    ) -> Result<RawResponse>;
}

/// reqwest backed transport: `get` sends params as query string, `post` as a form body.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| RelEditError::Network(format!("client setup failed: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(
        &self,
        url: &str,
        params: &[(String, String)],
        method: Method,
    ) -> Result<RawResponse> {
        debug!(url, method = method.as_str(), params = params.len(), "sending request");
        let request = match method {
            Method::Get => self.client.get(url).query(params),
            Method::Post => self.client.post(url).form(params),
        };
        let response = request.send().await?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;
        debug!(url, status, bytes = body.len(), "response received");
        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}
