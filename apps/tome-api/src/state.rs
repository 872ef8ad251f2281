use std::sync::Arc;

use tome_config::{ChatProviderConfig, Config, EmbeddingProviderConfig};
use tome_corpus::Corpus;
use tome_providers::{
	chat::{ChatRequest, ModelResponse},
	progress::ProgressRecord,
};
use tome_service::{
	BoxFuture, ChatProvider, EmbeddingProvider, ProgressStore, Providers, Roadmap, TomeService,
};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<TomeService>,
}
impl AppState {
	pub fn new(config: Config) -> color_eyre::Result<Self> {
		let corpus = match Corpus::load(&config.corpus.artifact_path) {
			Ok(corpus) => corpus,
			Err(err) => {
				tracing::warn!(
					error = %err,
					"Corpus artifact unavailable; book search is disabled until it is generated."
				);

				Corpus::empty()
			},
		};
		let roadmap = match config.roadmap.as_ref() {
			Some(roadmap) => Roadmap::load(&roadmap.path)?,
			None => Roadmap::empty(),
		};
		let progress: Option<Arc<dyn ProgressStore>> = config
			.progress
			.clone()
			.map(|cfg| Arc::new(RestProgress { cfg }) as Arc<dyn ProgressStore>);

		if progress.is_none() {
			tracing::info!("Progress store not configured; notes features degrade to empty.");
		}

		let providers =
			Providers { embedding: Arc::new(HttpEmbedding), chat: Arc::new(HttpChat) };
		let service = TomeService::new(config, corpus, roadmap, providers, progress);

		Ok(Self { service: Arc::new(service) })
	}
}

struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed_one<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		text: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(tome_providers::embedding::embed_one(cfg, text))
	}

	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(tome_providers::embedding::embed(cfg, texts))
	}
}

struct HttpChat;
impl ChatProvider for HttpChat {
	fn complete<'a>(
		&'a self,
		cfg: &'a ChatProviderConfig,
		request: ChatRequest,
	) -> BoxFuture<'a, color_eyre::Result<ModelResponse>> {
		Box::pin(async move { tome_providers::chat::complete(cfg, &request).await })
	}
}

struct RestProgress {
	cfg: tome_config::Progress,
}
impl ProgressStore for RestProgress {
	fn fetch(&self) -> BoxFuture<'_, color_eyre::Result<Vec<ProgressRecord>>> {
		Box::pin(tome_providers::progress::fetch(&self.cfg))
	}

	fn toggle_task<'a>(
		&'a self,
		milestone_id: &'a str,
		task_id: &'a str,
		completed: bool,
		completed_at: Option<String>,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			let row = serde_json::json!({
				"user_id": self.cfg.user_id,
				"milestone_id": milestone_id,
				"task_id": task_id,
				"completed": completed,
				"completed_at": completed_at,
			});

			tome_providers::progress::upsert(&self.cfg, &row).await
		})
	}

	fn update_notes<'a>(
		&'a self,
		milestone_id: &'a str,
		task_id: &'a str,
		notes: &'a str,
	) -> BoxFuture<'a, color_eyre::Result<()>> {
		Box::pin(async move {
			// Only the notes column; completion state of an existing row is
			// left untouched by the merge.
			let row = serde_json::json!({
				"user_id": self.cfg.user_id,
				"milestone_id": milestone_id,
				"task_id": task_id,
				"notes": notes,
			});

			tome_providers::progress::upsert(&self.cfg, &row).await
		})
	}
}
