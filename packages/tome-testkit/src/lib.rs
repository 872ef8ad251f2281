//! Test doubles for the service's injected collaborators: a scripted chat
//! model, a fixed embedding provider, an in-memory progress store, and config
//! plus corpus builders for synthetic setups.

use std::{
	collections::{HashMap, VecDeque},
	sync::Mutex,
};

use color_eyre::eyre;
use serde_json::Value;

use tome_config::{
	Chat, ChatProviderConfig, Chunking, Config, CorpusConfig, EmbeddingProviderConfig, Providers,
	Search, Service,
};
use tome_corpus::{ChapterNumber, Chunk};
use tome_providers::{
	chat::{ChatRequest, ContentBlock, ModelResponse},
	progress::ProgressRecord,
};
use tome_service::{BoxFuture, ChatProvider, EmbeddingProvider, ProgressStore};

/// Embedding provider that returns canned vectors by exact text, with a
/// fallback for anything unscripted.
pub struct FixedEmbedding {
	vectors: HashMap<String, Vec<f32>>,
	fallback: Vec<f32>,
}
impl FixedEmbedding {
	pub fn new(fallback: Vec<f32>) -> Self {
		Self { vectors: HashMap::new(), fallback }
	}

	pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
		self.vectors.insert(text.to_string(), vector);

		self
	}

	fn lookup(&self, text: &str) -> Vec<f32> {
		self.vectors.get(text).cloned().unwrap_or_else(|| self.fallback.clone())
	}
}
impl EmbeddingProvider for FixedEmbedding {
	fn embed_one<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		let vector = self.lookup(text);

		Box::pin(async move { Ok(vector) })
	}

	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		let vectors = texts.iter().map(|text| self.lookup(text)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Embedding provider that always fails; for provider-failure paths.
pub struct FailingEmbedding;
impl EmbeddingProvider for FailingEmbedding {
	fn embed_one<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(async { Err(eyre::eyre!("embedding provider unreachable")) })
	}

	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async { Err(eyre::eyre!("embedding provider unreachable")) })
	}
}

/// Chat model double that replays a queue of responses and records every
/// request it receives.
#[derive(Default)]
pub struct ScriptedChat {
	responses: Mutex<VecDeque<ModelResponse>>,
	pub requests: Mutex<Vec<ChatRequest>>,
}
impl ScriptedChat {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(self, response: ModelResponse) -> Self {
		self.responses.lock().unwrap_or_else(|err| err.into_inner()).push_back(response);

		self
	}

	pub fn push_text(self, text: &str) -> Self {
		self.push(text_response(text))
	}

	pub fn request_count(&self) -> usize {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).len()
	}
}
impl ChatProvider for ScriptedChat {
	fn complete<'a>(
		&'a self,
		_cfg: &'a ChatProviderConfig,
		request: ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<ModelResponse>> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(request);

		let next = self.responses.lock().unwrap_or_else(|err| err.into_inner()).pop_front();

		Box::pin(async move {
			next.ok_or_else(|| eyre::eyre!("scripted chat exhausted"))
		})
	}
}

/// Chat model double that always fails.
pub struct FailingChat;
impl ChatProvider for FailingChat {
	fn complete<'a>(
		&'a self,
		_cfg: &'a ChatProviderConfig,
		_request: ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<ModelResponse>> {
		Box::pin(async { Err(eyre::eyre!("chat provider unreachable")) })
	}
}

pub fn text_response(text: &str) -> ModelResponse {
	ModelResponse {
		content: vec![ContentBlock::Text { text: text.to_string() }],
		stop_reason: Some("end_turn".to_string()),
	}
}

pub fn tool_use_response(id: &str, name: &str, input: Value) -> ModelResponse {
	ModelResponse {
		content: vec![ContentBlock::ToolUse {
			id: id.to_string(),
			name: name.to_string(),
			input,
		}],
		stop_reason: Some("tool_use".to_string()),
	}
}

/// In-memory progress store keyed by `(milestone_id, task_id)`; writes are
/// last-write-wins like the real store's upserts.
#[derive(Default)]
pub struct MemoryProgressStore {
	user_id: String,
	rows: Mutex<HashMap<(String, String), ProgressRecord>>,
}
impl MemoryProgressStore {
	pub fn new(user_id: &str) -> Self {
		Self { user_id: user_id.to_string(), rows: Mutex::new(HashMap::new()) }
	}

	pub fn seed(self, record: ProgressRecord) -> Self {
		{
			let mut rows = self.rows.lock().unwrap_or_else(|err| err.into_inner());

			rows.insert((record.milestone_id.clone(), record.task_id.clone()), record);
		}

		self
	}

	fn blank_row(&self, milestone_id: &str, task_id: &str) -> ProgressRecord {
		ProgressRecord {
			user_id: self.user_id.clone(),
			milestone_id: milestone_id.to_string(),
			task_id: task_id.to_string(),
			completed: false,
			completed_at: None,
			notes: None,
		}
	}
}
impl ProgressStore for MemoryProgressStore {
	fn fetch(&self) -> BoxFuture<'_, color_eyre::Result<Vec<ProgressRecord>>> {
		let mut rows: Vec<ProgressRecord> = self
			.rows
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.values()
			.cloned()
			.collect();

		rows.sort_by(|a, b| {
			(&a.milestone_id, &a.task_id).cmp(&(&b.milestone_id, &b.task_id))
		});

		Box::pin(async move { Ok(rows) })
	}

	fn toggle_task<'a>(
		&'a self,
		milestone_id: &'a str,
		task_id: &'a str,
		completed: bool,
		completed_at: Option<String>,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		{
			let mut rows = self.rows.lock().unwrap_or_else(|err| err.into_inner());
			let row = rows
				.entry((milestone_id.to_string(), task_id.to_string()))
				.or_insert_with(|| self.blank_row(milestone_id, task_id));

			row.completed = completed;
			row.completed_at = completed_at;
		}

		Box::pin(async { Ok(()) })
	}

	fn update_notes<'a>(
		&'a self,
		milestone_id: &'a str,
		task_id: &'a str,
		notes: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		{
			let mut rows = self.rows.lock().unwrap_or_else(|err| err.into_inner());
			let row = rows
				.entry((milestone_id.to_string(), task_id.to_string()))
				.or_insert_with(|| self.blank_row(milestone_id, task_id));

			row.notes = Some(notes.to_string());
		}

		Box::pin(async { Ok(()) })
	}
}

/// A corpus chunk with a numbered chapter.
pub fn chunk(
	id: &str,
	chapter_number: u32,
	chapter_title: &str,
	content: &str,
	embedding: Vec<f32>,
) -> Chunk {
	Chunk {
		id: id.to_string(),
		chapter_number: ChapterNumber::Number(chapter_number),
		chapter_title: chapter_title.to_string(),
		content: content.to_string(),
		embedding,
	}
}

/// Config with loopback provider endpoints, suitable for tests that never
/// reach the network.
pub fn test_config(dimensions: u32) -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
			request_timeout_ms: 5_000,
		},
		corpus: CorpusConfig {
			artifact_path: "book-embeddings.json".into(),
			vector_dim: dimensions,
		},
		chunking: Chunking::default(),
		search: Search::default(),
		chat: Chat::default(),
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/embeddings".to_string(),
				model: "test-embedding".to_string(),
				dimensions,
				timeout_ms: 1_000,
			},
			chat: ChatProviderConfig {
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/v1/messages".to_string(),
				model: "test-chat".to_string(),
				version: "2023-06-01".to_string(),
				timeout_ms: 1_000,
			},
		},
		progress: None,
		roadmap: None,
	}
}
