//! Brute-force cosine ranking over the corpus. O(corpus) per query, which is
//! fine at one book's scale; an approximate index is the scaling path if the
//! corpus ever grows past that.

// std
use std::cmp::Ordering;

// crates.io
use serde::Serialize;

use crate::{Excerpt, ServiceError, ServiceResult, TomeService};

/// A transient ranked result, discarded after the request completes.
#[derive(Clone, Debug, Serialize)]
pub struct Candidate {
	pub chapter: String,
	pub content: String,
	pub score: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchBookResult {
	pub results: Vec<Excerpt>,
}

/// Cosine similarity of two vectors. Zero-length or mismatched vectors rank
/// lowest instead of propagating a division by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	if a.len() != b.len() || a.is_empty() {
		return f32::NEG_INFINITY;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b) {
		dot += f64::from(*x) * f64::from(*y);
		norm_a += f64::from(*x) * f64::from(*x);
		norm_b += f64::from(*y) * f64::from(*y);
	}

	if norm_a == 0.0 || norm_b == 0.0 {
		return f32::NEG_INFINITY;
	}

	(dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

impl TomeService {
	/// Ranks every corpus chunk against `query`, highest similarity first,
	/// and returns the top `search.candidate_k`.
	pub async fn semantic_search(&self, query: &str) -> ServiceResult<Vec<Candidate>> {
		if self.corpus.is_empty() {
			return Err(ServiceError::CorpusUnavailable);
		}
		if self.cfg.providers.embedding.api_key.trim().is_empty() {
			return Err(ServiceError::Config {
				message: "Embedding provider credential is not configured.".to_string(),
			});
		}

		let query_vector = self
			.providers
			.embedding
			.embed_one(&self.cfg.providers.embedding, query)
			.await
			.map_err(|err| ServiceError::Provider { message: err.to_string() })?;
		let mut scored: Vec<Candidate> = self
			.corpus
			.all()
			.iter()
			.map(|chunk| Candidate {
				chapter: chunk.chapter_label(),
				content: chunk.content.clone(),
				score: cosine_similarity(&query_vector, &chunk.embedding),
			})
			.collect();

		// Stable sort keeps corpus order on ties, so results are deterministic
		// across runs.
		scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
		scored.truncate(self.cfg.search.candidate_k as usize);

		Ok(scored)
	}

	/// The `search_book` tool: cosine retrieval followed by the rerank turn.
	pub async fn search_book(&self, query: &str) -> ServiceResult<SearchBookResult> {
		tracing::info!(query, "Semantic search.");

		let candidates = self.semantic_search(query).await?;

		tracing::info!(
			candidates = candidates.len(),
			top_score = candidates.first().map(|c| c.score),
			"Retrieval complete."
		);

		let results = self.rerank(query, &candidates).await?;

		tracing::info!(results = results.len(), "Rerank complete.");

		Ok(SearchBookResult { results })
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn similarity_of_a_vector_with_itself_is_one() {
		let v = [0.3_f32, -0.4, 0.5];

		assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
	}

	#[test]
	fn similarity_is_symmetric_and_bounded() {
		let a = [0.9_f32, 0.1, -0.2];
		let b = [-0.3_f32, 0.8, 0.4];
		let ab = cosine_similarity(&a, &b);
		let ba = cosine_similarity(&b, &a);

		assert!((ab - ba).abs() < 1e-6);
		assert!((-1.0..=1.0).contains(&ab));
	}

	#[test]
	fn opposite_vectors_score_negative_one() {
		let a = [1.0_f32, 0.0];
		let b = [-1.0_f32, 0.0];

		assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
	}

	#[test]
	fn zero_vector_ranks_lowest_not_nan() {
		let score = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]);

		assert_eq!(score, f32::NEG_INFINITY);
	}

	#[test]
	fn mismatched_lengths_rank_lowest() {
		assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), f32::NEG_INFINITY);
	}
}
