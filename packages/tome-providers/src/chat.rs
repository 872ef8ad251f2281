//! Chat-model client speaking the Anthropic-style messages protocol with
//! tool use. Wire types here are shared with the service layer so the
//! conversation loop can match on content blocks exhaustively.

// std
use std::time::Duration;

// crates.io
use color_eyre::{Result, eyre};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const TRANSPORT_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF_MS: u64 = 200;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
	Text { text: String },
	ToolUse { id: String, name: String, input: Value },
	ToolResult { tool_use_id: String, content: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
	Text(String),
	Blocks(Vec<ContentBlock>),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Message {
	pub role: String,
	pub content: MessageContent,
}
impl Message {
	pub fn user(text: impl Into<String>) -> Self {
		Self { role: "user".to_string(), content: MessageContent::Text(text.into()) }
	}

	pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
		Self { role: "assistant".to_string(), content: MessageContent::Blocks(blocks) }
	}

	pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
		Self {
			role: "user".to_string(),
			content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
				tool_use_id: tool_use_id.into(),
				content: content.into(),
			}]),
		}
	}
}

#[derive(Clone, Debug, Serialize)]
pub struct ToolDefinition {
	pub name: String,
	pub description: String,
	pub input_schema: Value,
}

#[derive(Clone, Debug, Default)]
pub struct ChatRequest {
	pub system: Option<String>,
	pub max_tokens: u32,
	pub tools: Vec<ToolDefinition>,
	pub messages: Vec<Message>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelResponse {
	#[serde(default)]
	pub content: Vec<ContentBlock>,
	#[serde(default)]
	pub stop_reason: Option<String>,
}
impl ModelResponse {
	pub fn wants_tool(&self) -> bool {
		self.stop_reason.as_deref() == Some("tool_use")
	}

	/// First tool-use block, if any. When the model requests several tools in
	/// one turn, only this one is executed.
	pub fn first_tool_use(&self) -> Option<(&str, &str, &Value)> {
		self.content.iter().find_map(|block| match block {
			ContentBlock::ToolUse { id, name, input } => {
				Some((id.as_str(), name.as_str(), input))
			},
			_ => None,
		})
	}

	pub fn first_text(&self) -> Option<&str> {
		self.content.iter().find_map(|block| match block {
			ContentBlock::Text { text } => Some(text.as_str()),
			_ => None,
		})
	}
}

/// One completion turn. Transport failures are retried a bounded number of
/// times with a short backoff; HTTP error statuses are surfaced immediately.
pub async fn complete(
	cfg: &tome_config::ChatProviderConfig,
	request: &ChatRequest,
) -> Result<ModelResponse> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut body = serde_json::json!({
		"model": cfg.model,
		"max_tokens": request.max_tokens,
		"messages": request.messages,
	});

	if let Some(system) = request.system.as_ref() {
		body["system"] = Value::String(system.clone());
	}
	if !request.tools.is_empty() {
		body["tools"] = serde_json::to_value(&request.tools)?;
	}

	let mut last_err = None;

	for attempt in 1..=TRANSPORT_ATTEMPTS {
		let sent = client.post(&url).headers(auth_headers(cfg)?).json(&body).send().await;

		match sent {
			Ok(res) => {
				let res = res.error_for_status()?;

				return Ok(res.json::<ModelResponse>().await?);
			},
			Err(err) if err.is_connect() || err.is_timeout() => {
				tracing::warn!(attempt, error = %err, "Chat provider transport failure.");

				last_err = Some(err);

				tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS * u64::from(attempt)))
					.await;
			},
			Err(err) => return Err(err.into()),
		}
	}

	Err(match last_err {
		Some(err) => err.into(),
		None => eyre::eyre!("Chat provider call failed without a transport error."),
	})
}

fn auth_headers(cfg: &tome_config::ChatProviderConfig) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert("x-api-key", cfg.api_key.parse::<HeaderValue>()?);
	headers.insert("anthropic-version", cfg.version.parse::<HeaderValue>()?);

	Ok(headers)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_text_and_tool_use_blocks() {
		let raw = serde_json::json!({
			"content": [
				{ "type": "text", "text": "Let me check the book." },
				{ "type": "tool_use", "id": "tu_1", "name": "search_book",
				  "input": { "query": "price objections" } }
			],
			"stop_reason": "tool_use"
		});
		let response: ModelResponse = serde_json::from_value(raw).expect("parse failed");

		assert!(response.wants_tool());

		let (id, name, input) = response.first_tool_use().expect("missing tool use");

		assert_eq!(id, "tu_1");
		assert_eq!(name, "search_book");
		assert_eq!(input["query"], "price objections");
		assert_eq!(response.first_text(), Some("Let me check the book."));
	}

	#[test]
	fn first_tool_use_picks_the_first_of_many() {
		let raw = serde_json::json!({
			"content": [
				{ "type": "tool_use", "id": "tu_1", "name": "get_user_notes", "input": {} },
				{ "type": "tool_use", "id": "tu_2", "name": "search_book",
				  "input": { "query": "niches" } }
			],
			"stop_reason": "tool_use"
		});
		let response: ModelResponse = serde_json::from_value(raw).expect("parse failed");

		assert_eq!(response.first_tool_use().expect("missing tool use").1, "get_user_notes");
	}

	#[test]
	fn serializes_tool_result_as_block_content() {
		let message = Message::tool_result("tu_1", "{\"results\":[]}");
		let json = serde_json::to_value(&message).expect("serialize failed");

		assert_eq!(json["role"], "user");
		assert_eq!(json["content"][0]["type"], "tool_result");
		assert_eq!(json["content"][0]["tool_use_id"], "tu_1");
	}

	#[test]
	fn plain_text_content_serializes_as_string() {
		let json = serde_json::to_value(Message::user("hello")).expect("serialize failed");

		assert_eq!(json["content"], "hello");
	}
}
