mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Chat, ChatProviderConfig, Chunking, Config, CorpusConfig, EmbeddingProviderConfig, Progress,
	Providers, RoadmapConfig, Search, Service,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.request_timeout_ms == 0 {
		return Err(Error::Validation {
			message: "service.request_timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.corpus.vector_dim == 0 {
		return Err(Error::Validation {
			message: "corpus.vector_dim must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.corpus.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match corpus.vector_dim.".to_string(),
		});
	}
	if cfg.providers.embedding.model.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.model must be pinned to the model the corpus was built with.".to_string(),
		});
	}
	if cfg.search.candidate_k == 0 {
		return Err(Error::Validation {
			message: "search.candidate_k must be greater than zero.".to_string(),
		});
	}
	if cfg.search.rerank_keep == 0 || cfg.search.rerank_keep > cfg.search.candidate_k {
		return Err(Error::Validation {
			message: "search.rerank_keep must be between one and search.candidate_k.".to_string(),
		});
	}
	if cfg.search.listing_chars == 0 || cfg.search.excerpt_chars == 0 {
		return Err(Error::Validation {
			message: "search.listing_chars and search.excerpt_chars must be greater than zero."
				.to_string(),
		});
	}
	if cfg.chat.max_tool_rounds == 0 {
		return Err(Error::Validation {
			message: "chat.max_tool_rounds must be greater than zero.".to_string(),
		});
	}
	if cfg.chat.max_tokens == 0 || cfg.chat.rerank_max_tokens == 0 {
		return Err(Error::Validation {
			message: "chat.max_tokens and chat.rerank_max_tokens must be greater than zero."
				.to_string(),
		});
	}
	if cfg.chunking.max_chunk_chars <= cfg.chunking.min_chunk_chars {
		return Err(Error::Validation {
			message: "chunking.max_chunk_chars must exceed chunking.min_chunk_chars.".to_string(),
		});
	}
	if cfg.chunking.min_tail_chars == 0 {
		return Err(Error::Validation {
			message: "chunking.min_tail_chars must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	// A progress section without endpoint or key behaves as if absent; the
	// notes feature degrades to empty results instead of erroring per request.
	if cfg
		.progress
		.as_ref()
		.map(|progress| {
			progress.endpoint.trim().is_empty() || progress.api_key.trim().is_empty()
		})
		.unwrap_or(false)
	{
		cfg.progress = None;
	}
}
