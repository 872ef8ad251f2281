//! Retrieval-augmented advisory chat over the embedded book corpus.
//!
//! All collaborators that cross the network (embedding provider, chat model,
//! progress store) sit behind injected traits so the core can be exercised
//! against a synthetic corpus and scripted providers.

pub mod chat;
mod error;
pub mod notes;
pub mod progress;
pub mod rerank;
pub mod roadmap;
pub mod search;

use std::{future::Future, pin::Pin, sync::Arc};

pub use chat::{ChatMessage, TaskContext, ToolRequest};
pub use error::{ServiceError, ServiceResult};
pub use notes::NoteEntry;
pub use progress::CompletionStats;
pub use rerank::Excerpt;
pub use roadmap::Roadmap;
pub use search::Candidate;

use tome_config::{ChatProviderConfig, Config, EmbeddingProviderConfig};
use tome_corpus::Corpus;
use tome_providers::{
	chat::{ChatRequest, ModelResponse},
	progress::ProgressRecord,
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed_one<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>>;

	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a ChatProviderConfig,
		request: ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<ModelResponse>>;
}

pub trait ProgressStore
where
	Self: Send + Sync,
{
	fn fetch(&self) -> BoxFuture<'_, color_eyre::Result<Vec<ProgressRecord>>>;

	fn toggle_task<'a>(
		&'a self,
		milestone_id: &'a str,
		task_id: &'a str,
		completed: bool,
		completed_at: Option<String>,
	) -> BoxFuture<'a, color_eyre::Result<()>>;

	fn update_notes<'a>(
		&'a self,
		milestone_id: &'a str,
		task_id: &'a str,
		notes: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
}

pub struct TomeService {
	pub cfg: Config,
	/// Read-only after construction; safe to share across requests.
	pub corpus: Corpus,
	pub roadmap: Roadmap,
	pub providers: Providers,
	pub progress: Option<Arc<dyn ProgressStore>>,
}
impl TomeService {
	pub fn new(
		cfg: Config,
		corpus: Corpus,
		roadmap: Roadmap,
		providers: Providers,
		progress: Option<Arc<dyn ProgressStore>>,
	) -> Self {
		Self { cfg, corpus, roadmap, providers, progress }
	}
}
