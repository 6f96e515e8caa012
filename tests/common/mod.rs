#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

use reledit::models::{EditFormArgs, Method, Reload};
use reledit::render::MemoryDocument;
use reledit::transport::{RawResponse, Transport};
use reledit::{Config, Page, RelEditError, Result};

/// A request as seen by the transport.
#[derive(Debug, Clone)]
pub struct Call {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub method: Method,
}

impl Call {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

enum Reply {
    Ready(Result<RawResponse>),
    Later(oneshot::Receiver<Result<RawResponse>>),
}

/// Answers requests in call order from a queue of scripted replies.
#[derive(Default)]
pub struct ScriptedTransport {
    calls: Mutex<Vec<Call>>,
    replies: Mutex<VecDeque<Reply>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn html(&self, body: &str) {
        self.push(Reply::Ready(Ok(html_response(body))));
    }

    pub fn json(&self, body: Value) {
        self.push(Reply::Ready(Ok(json_response(body))));
    }

    pub fn fail(&self, error: RelEditError) {
        self.push(Reply::Ready(Err(error)));
    }

    /// Reply whose answer is sent later through the returned sender.
    pub fn later(&self) -> oneshot::Sender<Result<RawResponse>> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Later(rx));
        tx
    }

    fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub async fn wait_for_calls(&self, count: usize) {
        while self.call_count() < count {
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn request(
        &self,
        url: &str,
        params: &[(String, String)],
        method: Method,
    ) -> Result<RawResponse> {
        self.calls.lock().unwrap().push(Call {
            url: url.to_string(),
            params: params.to_vec(),
            method,
        });
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Later(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(RelEditError::Network("reply dropped".into()))),
            None => Err(RelEditError::Network(format!("no reply scripted for {url}"))),
        }
    }
}

pub fn html_response(body: &str) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("text/html; charset=utf-8".to_string()),
        body: body.to_string(),
    }
}

pub fn json_response(body: Value) -> RawResponse {
    RawResponse {
        status: 200,
        content_type: Some("application/json".to_string()),
        body: body.to_string(),
    }
}

pub fn page(transport: Arc<ScriptedTransport>) -> (Arc<Page>, Arc<MemoryDocument>) {
    page_with(transport, Config::default())
}

pub fn page_with(
    transport: Arc<ScriptedTransport>,
    config: Config,
) -> (Arc<Page>, Arc<MemoryDocument>) {
    let document = Arc::new(MemoryDocument::new());
    let page = Page::new(config, transport, document.clone());
    (Arc::new(page), document)
}

/// Edition form as the server renders it, session fields included.
pub fn edit_form(div_id: &str, form_id: &str, reload: &str) -> String {
    format!(
        r#"<div id="{div_id}-form"><form id="{form_id}" action="validateform" method="post">
  <input type="hidden" name="__reledit|divid" value="{div_id}"/>
  <input type="hidden" name="__reledit|formid" value="{form_id}"/>
  <input type="hidden" name="__reledit|reload" value='{reload}'/>
  <input type="hidden" name="__reledit|eid" value="42"/>
  <input type="hidden" name="__reledit|rtype" value="title"/>
  <input type="hidden" name="__reledit|role" value="subject"/>
  <input type="hidden" name="__form_id" value="edition"/>
  <input type="text" name="title-subject:42" value="Old title"/>
</form></div>"#
    )
}

pub fn title_args(div_id: &str, form_id: &str) -> EditFormArgs {
    EditFormArgs {
        form_id: form_id.to_string(),
        eid: 42,
        rtype: "title".to_string(),
        role: "subject".to_string(),
        div_id: div_id.to_string(),
        reload: Reload::No,
        vid: "edition".to_string(),
        action: "update".to_string(),
    }
}
