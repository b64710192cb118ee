//! xAI Responses adapter.
//!
//! One `POST {base_url}/responses` per turn. The request carries the rendered
//! prompts, the tool set, the continuation anchor and a strict JSON schema
//! for the output text; the response is flattened into a [`RawResponse`].

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use super::backend::{GenerationBackend, TurnRequest};
use super::response::{RawResponse, ToolInvocation, ToolKind};
use crate::config::Config;
use crate::errors::{HarnessError, HarnessResult};

pub struct XaiBackend {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl XaiBackend {
    /// Build the adapter from resolved configuration. Fails with a
    /// configuration error when no API key is available.
    pub fn from_config(config: &Config) -> HarnessResult<Self> {
        let api_key = config.api_key()?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/responses", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
        })
    }

    fn request_body(&self, request: &TurnRequest) -> Value {
        build_request_body(&self.model, request)
    }
}

#[async_trait]
impl GenerationBackend for XaiBackend {
    async fn sample(&self, request: &TurnRequest) -> HarnessResult<RawResponse> {
        let body = self.request_body(request);
        debug!(
            endpoint = %self.endpoint,
            phase = %request.turn.phase,
            model = %self.model,
            anchor = ?request.turn.previous_response_id,
            "Sending turn"
        );

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach generation endpoint {}", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(HarnessError::Operational(anyhow!(
                "Generation endpoint returned {}: {}",
                status,
                text.trim()
            )));
        }

        let value: Value = resp
            .json()
            .await
            .context("Failed to parse generation endpoint response")?;
        parse_response(&value)
    }
}

fn build_request_body(model: &str, request: &TurnRequest) -> Value {
    let format = &request.turn.response_format;
    let mut body = json!({
        "model": model,
        "input": [
            {"role": "system", "content": request.prompt.system},
            {"role": "user", "content": request.prompt.user},
        ],
        "tools": request.turn.tools,
        "store": true,
        "text": {
            "format": {
                "type": "json_schema",
                "name": format.name,
                "schema": format.schema,
                "strict": true,
            }
        },
    });
    if let Some(anchor) = &request.turn.previous_response_id {
        body["previous_response_id"] = json!(anchor);
    }
    body
}

/// Flatten a Responses payload into the fields the harness inspects.
///
/// `tool_invocations` is `Some` whenever the payload carries an `output`
/// list, even an empty one. `citations` prefers the top-level list and
/// falls back to message annotations.
fn parse_response(value: &Value) -> HarnessResult<RawResponse> {
    let id = value["id"]
        .as_str()
        .ok_or_else(|| anyhow!("Generation endpoint response has no id"))?
        .to_string();

    let output = value["output"].as_array();
    let mut content = String::new();
    let mut annotations = Vec::new();
    let mut invocations = Vec::new();

    for item in output.into_iter().flatten() {
        let item_type = item["type"].as_str().unwrap_or_default();
        if item_type == "message" {
            for part in item["content"].as_array().into_iter().flatten() {
                if let Some(text) = part["text"].as_str() {
                    content.push_str(text);
                }
                annotations.extend(
                    part["annotations"]
                        .as_array()
                        .into_iter()
                        .flatten()
                        .filter_map(|a| a["url"].as_str().map(str::to_string)),
                );
            }
        } else if item_type.ends_with("_call") {
            invocations.push(tool_invocation(item_type, item));
        }
    }

    if content.is_empty()
        && let Some(text) = value["output_text"].as_str()
    {
        content = text.to_string();
    }

    let citations = match value["citations"].as_array() {
        Some(list) => Some(
            list.iter()
                .filter_map(|c| c.as_str().map(str::to_string))
                .collect(),
        ),
        None if !annotations.is_empty() => Some(annotations),
        None => None,
    };

    Ok(RawResponse {
        id,
        content,
        citations,
        tool_invocations: output.map(|_| invocations),
    })
}

fn tool_invocation(item_type: &str, item: &Value) -> ToolInvocation {
    let kind = match item_type {
        "code_interpreter_call" | "code_execution_call" => ToolKind::CodeExecution,
        "collections_search_call" | "file_search_call" => ToolKind::CollectionsSearch,
        "web_search_call" => ToolKind::WebSearch,
        other => ToolKind::Other(other.to_string()),
    };

    // Function-style calls carry their code inside a JSON-encoded argument string
    let code = item["code"].as_str().map(str::to_string).or_else(|| {
        item["arguments"]
            .as_str()
            .and_then(|args| serde_json::from_str::<Value>(args).ok())
            .and_then(|args| args["code"].as_str().map(str::to_string))
    });

    ToolInvocation { kind, code }
}
