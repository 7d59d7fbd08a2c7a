use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use wirecore::{Node, NodeContext, NodeError, NodeOutput, PortSpec, Value};

/// Locate the list of posts inside a JSON response body.
///
/// With a dotted `path` (`data.children`, `items.0.entries`) the value at that
/// path must be an array. Without one, the body itself is used when it is an
/// array, falling back to a top-level `posts` field.
pub fn extract_posts(
    body: &serde_json::Value,
    path: Option<&str>,
) -> Option<Vec<serde_json::Value>> {
    let target = match path {
        Some(path) => path
            .split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(body, |current, segment| match current {
                serde_json::Value::Array(items) => {
                    segment.parse::<usize>().ok().and_then(|i| items.get(i))
                }
                other => other.get(segment),
            })?,
        None if body.is_array() => body,
        None => body.get("posts")?,
    };
    target.as_array().cloned()
}

fn apply_headers(
    mut request: reqwest::RequestBuilder,
    headers: &HashMap<String, String>,
) -> reqwest::RequestBuilder {
    for (key, value) in headers {
        request = request.header(key, value);
    }
    request
}

fn require_url(url: &str) -> Result<(), NodeError> {
    if url.trim().is_empty() {
        return Err(NodeError::Configuration("url must not be empty".to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub posts_path: Option<String>,
}

/// GET a URL and expose the body and any list of posts found in it
pub struct FetchNode {
    config: FetchConfig,
    client: reqwest::Client,
}

impl FetchNode {
    pub fn new(config: FetchConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![
            PortSpec::exec("exec"),
            PortSpec::data("status"),
            PortSpec::data("body"),
            PortSpec::data("posts"),
        ]
    }

    async fn fetch(&self, ctx: &NodeContext) -> Result<(u16, String), NodeError> {
        let request = apply_headers(self.client.get(&self.config.url), &self.config.headers);
        let response = request
            .send()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        ctx.log.info(format!("Response status: {}", status.as_u16()));
        if !status.is_success() {
            return Err(NodeError::ExecutionFailed(format!(
                "GET {} returned {}",
                self.config.url, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("Failed to read response: {}", e)))?;
        Ok((status.as_u16(), body))
    }
}

#[async_trait]
impl Node for FetchNode {
    fn node_type(&self) -> &str {
        "http.fetch"
    }

    fn inputs(&self) -> Vec<PortSpec> {
        Self::input_ports()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        Self::output_ports()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        require_url(&self.config.url)?;
        ctx.log.info(format!("GET {}", self.config.url));

        let (status, body) = tokio::select! {
            result = self.fetch(&ctx) => result?,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };

        let mut output = NodeOutput::new()
            .with_output("status", status as f64)
            .with_output("body", body.as_str());

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => match extract_posts(&json, self.config.posts_path.as_deref()) {
                Some(posts) => {
                    ctx.log.info(format!("Fetched {} posts", posts.len()));
                    output = output.with_output("posts", serde_json::Value::Array(posts));
                }
                None => ctx.log.warn("Response contains no list of posts"),
            },
            Err(e) => ctx.log.warn(format!("Response is not JSON: {}", e)),
        }

        Ok(output)
    }
}

fn default_message_field() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Field of the JSON payload that carries the message text
    #[serde(default = "default_message_field")]
    pub message_field: String,
}

/// POST a message to a chat-style webhook
pub struct WebhookNode {
    config: WebhookConfig,
    client: reqwest::Client,
}

impl WebhookNode {
    pub fn new(config: WebhookConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub(crate) fn input_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::data("message")]
    }

    pub(crate) fn output_ports() -> Vec<PortSpec> {
        vec![PortSpec::exec("exec"), PortSpec::data("status")]
    }

    fn payload(&self, message: &Value) -> serde_json::Value {
        let mut payload = serde_json::Map::new();
        payload.insert(
            self.config.message_field.clone(),
            serde_json::Value::String(message.to_text()),
        );
        serde_json::Value::Object(payload)
    }

    async fn post(&self, payload: &serde_json::Value) -> Result<u16, NodeError> {
        let request = apply_headers(self.client.post(&self.config.url), &self.config.headers);
        let response = request
            .json(payload)
            .send()
            .await
            .map_err(|e| NodeError::ExecutionFailed(format!("Webhook request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NodeError::ExecutionFailed(format!(
                "Webhook returned {}",
                status
            )));
        }
        Ok(status.as_u16())
    }
}

#[async_trait]
impl Node for WebhookNode {
    fn node_type(&self) -> &str {
        "notify.webhook"
    }

    fn inputs(&self) -> Vec<PortSpec> {
        Self::input_ports()
    }

    fn outputs(&self) -> Vec<PortSpec> {
        Self::output_ports()
    }

    fn config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }

    async fn execute(&self, ctx: NodeContext) -> Result<NodeOutput, NodeError> {
        require_url(&self.config.url)?;
        let payload = self.payload(ctx.require_input("message")?);

        let status = tokio::select! {
            result = self.post(&payload) => result?,
            _ = ctx.cancellation.cancelled() => return Err(NodeError::Cancelled),
        };
        ctx.log.info(format!("Webhook accepted message ({})", status));

        Ok(NodeOutput::new().with_output("status", status as f64))
    }
}
