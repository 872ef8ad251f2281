use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub corpus: CorpusConfig,
	#[serde(default)]
	pub chunking: Chunking,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub chat: Chat,
	pub providers: Providers,
	/// Optional; absence degrades the notes feature to empty results.
	pub progress: Option<Progress>,
	/// Optional; absence leaves notes tagged with raw milestone/task ids.
	pub roadmap: Option<RoadmapConfig>,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
	/// Overall ceiling on a single chat request, provider calls included.
	#[serde(default = "default_request_timeout_ms")]
	pub request_timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct CorpusConfig {
	pub artifact_path: PathBuf,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chunking {
	pub min_paragraph_chars: u32,
	pub min_chunk_chars: u32,
	pub max_chunk_chars: u32,
	pub min_tail_chars: u32,
}
impl Default for Chunking {
	fn default() -> Self {
		Self {
			min_paragraph_chars: 30,
			min_chunk_chars: 200,
			max_chunk_chars: 1_500,
			min_tail_chars: 100,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	/// Candidates returned by the cosine scan before reranking.
	pub candidate_k: u32,
	/// Excerpts kept after the rerank turn.
	pub rerank_keep: u32,
	/// Per-candidate content shown to the rerank model.
	pub listing_chars: u32,
	/// Excerpt length in the final tool result.
	pub excerpt_chars: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { candidate_k: 8, rerank_keep: 3, listing_chars: 600, excerpt_chars: 800 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Chat {
	pub max_tokens: u32,
	/// Tool-execution round-trips allowed per request.
	pub max_tool_rounds: u32,
	/// Output budget for the single rerank turn.
	pub rerank_max_tokens: u32,
}
impl Default for Chat {
	fn default() -> Self {
		Self { max_tokens: 2_048, max_tool_rounds: 5, rerank_max_tokens: 100 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub chat: ChatProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub api_base: String,
	/// May be empty; embedding-dependent requests then fail fast at call time.
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	/// Must match the model the corpus artifact was built with; mismatched
	/// models make similarity scores meaningless.
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChatProviderConfig {
	pub api_base: String,
	#[serde(default)]
	pub api_key: String,
	pub path: String,
	pub model: String,
	/// Value of the provider's required version header.
	pub version: String,
	pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Progress {
	pub endpoint: String,
	pub api_key: String,
	#[serde(default = "default_progress_table")]
	pub table: String,
	#[serde(default = "default_user_id")]
	pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RoadmapConfig {
	pub path: PathBuf,
}

fn default_request_timeout_ms() -> u64 {
	60_000
}

fn default_progress_table() -> String {
	"user_progress".to_string()
}

fn default_user_id() -> String {
	"default_user".to_string()
}
