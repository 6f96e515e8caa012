//! Remote fetch client: turns a request into content, never touches the document.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{RelEditError, Result};
use crate::models::{Content, FetchRequest, Method, SubmitResponse};
use crate::transport::{RawResponse, Transport};

#[derive(Clone)]
pub struct FetchClient {
    transport: Arc<dyn Transport>,
    config: Arc<Config>,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn Transport>, config: Arc<Config>) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch `endpoint` with `params`. Relative endpoints are resolved against
    /// the configured base url.
    pub async fn fetch(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        method: Method,
    ) -> Result<Content> {
        let url = self.config.resolve(endpoint);
        let response = self.transport.request(&url, params, method).await?;
        decode(response)
    }

    /// Call a server side function through the ajax controller.
    pub async fn call(&self, request: &FetchRequest) -> Result<Content> {
        debug!(
            region = %request.region,
            fname = %request.function_name,
            args = request.args.len(),
            "calling remote function"
        );
        let params = request.encode(self.config.page_id.as_deref());
        self.fetch(&self.config.ajax_url(), &params, request.method)
            .await
    }

    /// Post an edition form and read the directive the server answers with.
    pub async fn submit(&self, fields: &[(String, String)]) -> Result<SubmitResponse> {
        let content = self
            .fetch(&self.config.submit_url(), fields, Method::Post)
            .await?;
        let value = match content {
            Content::Json(value) => value,
            Content::Markup(body) => serde_json::from_str(body.trim()).map_err(|e| {
                RelEditError::MalformedResponse(format!("submission answer is not JSON: {e}"))
            })?,
        };
        if !value.is_object() {
            return Err(RelEditError::MalformedResponse(format!(
                "submission answer is not an object: {value}"
            )));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Interpret a raw response: non-2xx is a network error, JSON bodies become
/// structured content, anything else is markup.
pub fn decode(response: RawResponse) -> Result<Content> {
    if !response.is_success() {
        let detail = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| {
                body.get("reason")
                    .or_else(|| body.get("error"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });
        warn!(status = response.status, ?detail, "request failed");
        return Err(RelEditError::Network(match detail {
            Some(detail) => format!("HTTP error: {}: {detail}", response.status),
            None => format!("HTTP error: {}", response.status),
        }));
    }
    if response.is_json() {
        let value = serde_json::from_str(&response.body)?;
        return Ok(Content::Json(value));
    }
    Ok(Content::Markup(response.body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticTransport {
        response: RawResponse,
        seen: Mutex<Vec<(String, Vec<(String, String)>, Method)>>,
    }

    #[async_trait]
    impl Transport for StaticTransport {
        async fn request(
            &self,
            url: &str,
            params: &[(String, String)],
            method: Method,
        ) -> Result<RawResponse> {
            self.seen
                .lock()
                .unwrap()
                .push((url.to_string(), params.to_vec(), method));
            Ok(self.response.clone())
        }
    }

    fn client_for(status: u16, content_type: Option<&str>, body: &str) -> (FetchClient, Arc<StaticTransport>) {
        let transport = Arc::new(StaticTransport {
            response: RawResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            },
            seen: Mutex::new(Vec::new()),
        });
        let config = Config {
            page_id: Some("p1".to_string()),
            ..Config::default()
        };
        (FetchClient::new(transport.clone(), Arc::new(config)), transport)
    }

    #[tokio::test]
    async fn call_goes_through_the_ajax_controller() {
        let (client, transport) = client_for(200, Some("text/html"), "<div>hi</div>");
        let request = FetchRequest::new("r1", "render").arg("x").method(Method::Post);
        let content = client.call(&request).await.unwrap();
        assert_eq!(content, Content::Markup("<div>hi</div>".to_string()));

        let seen = transport.seen.lock().unwrap();
        let (url, params, method) = &seen[0];
        assert_eq!(url, "http://localhost:8080/ajax");
        assert_eq!(*method, Method::Post);
        assert!(params.contains(&("pageid".to_string(), "p1".to_string())));
    }

    #[tokio::test]
    async fn non_success_status_is_a_network_error() {
        let (client, _) = client_for(500, Some("application/json"), r#"{"reason": "oops"}"#);
        let err = client.fetch("view", &[], Method::Get).await.unwrap_err();
        assert_eq!(err, RelEditError::Network("HTTP error: 500: oops".to_string()));
    }

    #[tokio::test]
    async fn broken_json_is_malformed() {
        let (client, _) = client_for(200, Some("application/json"), "{not json");
        let err = client.fetch("view", &[], Method::Get).await.unwrap_err();
        assert!(matches!(err, RelEditError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn submit_reads_json_sent_as_html() {
        let (client, _) = client_for(200, Some("text/html"), r#" {"status": "ok", "reload": true} "#);
        let response = client.submit(&[]).await.unwrap();
        assert_eq!(response.reload, Some(Value::Bool(true)));

        let (client, _) = client_for(200, Some("text/html"), "<html></html>");
        assert!(matches!(
            client.submit(&[]).await,
            Err(RelEditError::MalformedResponse(_))
        ));
    }
}
