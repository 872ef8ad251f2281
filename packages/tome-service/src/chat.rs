//! The tool-augmented conversation loop: a bounded back-and-forth with the
//! chat model, which may call `search_book` or `get_user_notes` before
//! producing its final answer.

// crates.io
use serde::Deserialize;
use serde_json::Value;

use tome_providers::chat::{ChatRequest, Message, ToolDefinition};

use crate::{ServiceError, ServiceResult, TomeService};

/// Inbound message shape, `{role, content}` with plain text content.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatMessage {
	pub role: String,
	#[serde(default)]
	pub content: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskContext {
	pub title: Option<String>,
	pub guidance: Option<String>,
}

/// The closed set of tools the model may invoke. Dispatch is an exhaustive
/// match, so adding a tool forces every call site to handle it.
#[derive(Clone, Debug, PartialEq)]
pub enum ToolRequest {
	SearchBook { query: String },
	GetUserNotes,
}
impl ToolRequest {
	pub fn parse(name: &str, input: &Value) -> Result<Self, String> {
		match name {
			"search_book" => input
				.get("query")
				.and_then(Value::as_str)
				.map(|query| Self::SearchBook { query: query.to_string() })
				.ok_or_else(|| "search_book requires a string query.".to_string()),
			"get_user_notes" => Ok(Self::GetUserNotes),
			other => Err(format!("Unknown tool: {other}.")),
		}
	}
}

impl TomeService {
	/// Runs one chat request to completion and returns the final answer text.
	///
	/// At most `chat.max_tool_rounds` tool executions; on exhaustion the last
	/// text the model produced is returned rather than an error.
	pub async fn chat(
		&self,
		messages: Vec<ChatMessage>,
		task_context: Option<TaskContext>,
	) -> ServiceResult<String> {
		if self.cfg.providers.chat.api_key.trim().is_empty() {
			return Err(ServiceError::Config {
				message: "Chat model credential is not configured.".to_string(),
			});
		}

		let mut history = prepare_history(messages)?;
		let system = build_system_prompt(task_context.as_ref());
		let tools = tool_definitions();
		let mut response = self
			.providers
			.chat
			.complete(
				&self.cfg.providers.chat,
				ChatRequest {
					system: Some(system.clone()),
					max_tokens: self.cfg.chat.max_tokens,
					tools: tools.clone(),
					messages: history.clone(),
				},
			)
			.await
			.map_err(|err| ServiceError::Provider { message: err.to_string() })?;
		let mut rounds = 0_u32;

		while response.wants_tool() && rounds < self.cfg.chat.max_tool_rounds {
			rounds += 1;

			let Some((id, name, input)) = response.first_tool_use() else {
				break;
			};
			let (id, name, input) = (id.to_string(), name.to_string(), input.clone());

			tracing::info!(tool = %name, round = rounds, "Tool use requested.");

			let payload = match ToolRequest::parse(&name, &input) {
				Ok(tool) => match self.execute_tool(tool).await {
					Ok(value) => value.to_string(),
					Err(err) => {
						tracing::warn!(tool = %name, error = %err, "Tool execution failed.");

						serde_json::json!({ "error": err.to_string() }).to_string()
					},
				},
				Err(reason) => {
					tracing::warn!(tool = %name, reason, "Rejected tool request.");

					serde_json::json!({ "error": reason }).to_string()
				},
			};

			history.push(Message::assistant_blocks(response.content.clone()));
			history.push(Message::tool_result(id, payload));

			response = self
				.providers
				.chat
				.complete(
					&self.cfg.providers.chat,
					ChatRequest {
						system: Some(system.clone()),
						max_tokens: self.cfg.chat.max_tokens,
						tools: tools.clone(),
						messages: history.clone(),
					},
				)
				.await
				.map_err(|err| ServiceError::Provider { message: err.to_string() })?;
		}

		if response.wants_tool() {
			tracing::warn!(rounds, "Tool round budget exhausted; returning partial text.");
		}

		Ok(response.first_text().unwrap_or_default().to_string())
	}

	async fn execute_tool(&self, tool: ToolRequest) -> ServiceResult<Value> {
		match tool {
			ToolRequest::SearchBook { query } => {
				let found = self.search_book(&query).await?;

				Ok(serde_json::to_value(found)
					.map_err(|err| ServiceError::Provider { message: err.to_string() })?)
			},
			ToolRequest::GetUserNotes => {
				let notes = self.user_notes().await;

				Ok(serde_json::json!({
					"notesCount": notes.len(),
					"notes": notes,
				}))
			},
		}
	}
}

/// Drops empty-content turns, strips leading assistant turns (a conversation
/// must begin with a user turn), and rejects an empty result.
fn prepare_history(messages: Vec<ChatMessage>) -> ServiceResult<Vec<Message>> {
	let mut valid: Vec<ChatMessage> = messages
		.into_iter()
		.filter(|m| {
			!m.content.trim().is_empty() && matches!(m.role.as_str(), "user" | "assistant")
		})
		.collect();
	let first_user = valid.iter().position(|m| m.role == "user").unwrap_or(valid.len());

	valid.drain(..first_user);

	if valid.is_empty() {
		return Err(ServiceError::InvalidRequest {
			message: "No valid messages to process.".to_string(),
		});
	}

	Ok(valid
		.into_iter()
		.map(|m| Message {
			role: m.role,
			content: tome_providers::chat::MessageContent::Text(m.content),
		})
		.collect())
}

fn tool_definitions() -> Vec<ToolDefinition> {
	vec![
		ToolDefinition {
			name: "search_book".to_string(),
			description: "Semantic search through the AI Advisory Business methodology book. \
				Uses AI embeddings to find content by meaning, not just keywords. Search for \
				concepts like \"handling price objections\", \"sales call structure\", or \
				\"positioning as expert\"."
				.to_string(),
			input_schema: serde_json::json!({
				"type": "object",
				"properties": {
					"query": {
						"type": "string",
						"description": "The search query in natural language"
					}
				},
				"required": ["query"]
			}),
		},
		ToolDefinition {
			name: "get_user_notes".to_string(),
			description: "Retrieve all of the user's notes and progress from their tasks. Use \
				this to understand what the user has already worked on, their thoughts, \
				decisions, and where they are in their journey. Returns notes organized by \
				phase and task."
				.to_string(),
			input_schema: serde_json::json!({
				"type": "object",
				"properties": {},
				"required": []
			}),
		},
	]
}

fn build_system_prompt(task_context: Option<&TaskContext>) -> String {
	let task_title = task_context
		.and_then(|ctx| ctx.title.as_deref())
		.unwrap_or("General AI Advisory Business");
	let guidance = task_context
		.and_then(|ctx| ctx.guidance.as_deref())
		.map(|guidance| format!("GUIDANCE:\n{guidance}"))
		.unwrap_or_default();

	format!(
		r#"You are an expert AI business coach helping someone build a million-dollar AI advisory business.

## THE OVERALL GOAL
Help the user become a "Fractional AI Officer" - an executive-level AI strategist who helps businesses ($1M-$50M revenue) identify and close their "AI Profit Gap." The goal is to build a $1M+ advisory business through:
- Premium retainer pricing ($2,500-$10,000/month)
- Long-term contracts (24-36 months)
- Strategy over delivery (be the general contractor, not the tool builder)

## KEY METHODOLOGY
1. **The AI Profit Gap**: Every business has inefficiencies that AI can fix. Your job is to expose the gap and put a dollar sign on it.
2. **Strategy > Tools**: Don't sell tools or implementations. Sell outcomes and ROI.
3. **The Offer Stack**:
   - Entry: AI Growth & Profit Assessment ($1,000-$5,000)
   - Core: Monthly Advisory Retainer ($2,500-$10,000/month)
4. **Promise-Process-Proof Framework**: Clear outcome promise, simple 3-step process, case studies with ROI.
5. **Target Niches**: Home services, med spas, law firms, real estate, e-commerce ($2M-$20M), B2B SaaS.

## CURRENT TASK
**{task_title}**

{guidance}

## YOUR ROLE
- Help them understand and complete this specific task
- Give practical, actionable advice tied to the methodology above
- Provide examples, templates, scripts, and specific language they can use
- Help them overcome obstacles and objections
- Be direct and confident - no fluff, no hedging
- Always tie advice back to ROI and outcomes

## TOOLS
You have access to TWO tools:

### 1. search_book
Semantic search through the AI Advisory Business methodology book. Use it when:
- The user asks for specific scripts, templates, or exact language from the book
- You need to reference specific frameworks, objection handling, or sales techniques
- The user asks "what does the book say about..."

### 2. get_user_notes
Retrieve the user's notes and progress from all their tasks. Use it when:
- You want to understand what the user has already worked on
- The user asks about their progress or previous decisions
- You need context about their niche, positioning, or choices
- You want to give personalized advice based on their journey

**IMPORTANT: Show transparency when using tools:**
- When using search_book, show "Book sources:" with chapters cited
- When using get_user_notes, show "Your notes:" summarizing what you found
- Always cite sources and reference the user's own words when relevant

Keep responses concise. Use markdown formatting (bold, bullets, headers) for clarity."#
	)
}
