//! Relevance refinement: one small-budget model turn picks the most relevant
//! candidates. The step is an enhancement, not a correctness-critical path;
//! unparseable output falls back to the original retrieval order.

// crates.io
use serde::Serialize;

use tome_providers::chat::{ChatRequest, Message};

use crate::{Candidate, ServiceError, ServiceResult, TomeService};

#[derive(Clone, Debug, Serialize)]
pub struct Excerpt {
	pub chapter: String,
	pub excerpt: String,
}

impl TomeService {
	/// Asks the chat model to select the `search.rerank_keep` most relevant
	/// candidates, in preference order, each returned as a cited excerpt.
	///
	/// Provider failure is returned as an error so the caller decides between
	/// fallback and propagation; parse failure is recovered locally.
	pub async fn rerank(
		&self,
		query: &str,
		candidates: &[Candidate],
	) -> ServiceResult<Vec<Excerpt>> {
		if candidates.is_empty() {
			return Ok(Vec::new());
		}

		let keep = self.cfg.search.rerank_keep as usize;
		let listing = candidates
			.iter()
			.enumerate()
			.map(|(i, candidate)| {
				format!(
					"[{}] {}\n{}...",
					i + 1,
					candidate.chapter,
					truncate_chars(&candidate.content, self.cfg.search.listing_chars as usize)
				)
			})
			.collect::<Vec<_>>()
			.join("\n\n---\n\n");
		let prompt = format!(
			"Query: \"{query}\"\n\nHere are {} candidate passages. Select the {keep} MOST relevant.\nRespond with ONLY the numbers like: 1, 4, 2\n\nCandidates:\n{listing}",
			candidates.len(),
		);
		let request = ChatRequest {
			system: None,
			max_tokens: self.cfg.chat.rerank_max_tokens,
			tools: Vec::new(),
			messages: vec![Message::user(prompt)],
		};
		let response = self
			.providers
			.chat
			.complete(&self.cfg.providers.chat, request)
			.await
			.map_err(|err| ServiceError::Provider { message: err.to_string() })?;
		let text = response.first_text().unwrap_or_default();
		let mut indices = parse_selection(text, candidates.len(), keep);

		if indices.is_empty() {
			tracing::warn!(response = text, "Unparseable rerank selection; keeping retrieval order.");

			indices = (0..candidates.len().min(keep)).collect();
		}

		let excerpt_chars = self.cfg.search.excerpt_chars as usize;

		Ok(indices
			.into_iter()
			.map(|i| {
				let candidate = &candidates[i];
				let truncated = truncate_chars(&candidate.content, excerpt_chars);
				let marker = if truncated.chars().count() < candidate.content.chars().count() {
					"..."
				} else {
					""
				};

				Excerpt {
					chapter: candidate.chapter.clone(),
					excerpt: format!("{truncated}{marker}"),
				}
			})
			.collect())
	}
}

/// Extracts integer tokens from the model's reply, converts 1-based positions
/// to indices, drops anything out of bounds, and keeps at most `keep`.
fn parse_selection(text: &str, len: usize, keep: usize) -> Vec<usize> {
	let mut indices = Vec::new();
	let mut digits = String::new();

	for c in text.chars().chain(std::iter::once(' ')) {
		if c.is_ascii_digit() {
			digits.push(c);

			continue;
		}
		if digits.is_empty() {
			continue;
		}
		if let Ok(position) = digits.parse::<usize>()
			&& position >= 1 && position <= len
		{
			indices.push(position - 1);

			if indices.len() == keep {
				break;
			}
		}

		digits.clear();
	}

	indices
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((byte_index, _)) => &text[..byte_index],
		None => text,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_comma_separated_selection() {
		assert_eq!(parse_selection("3, 1, 7", 8, 3), vec![2, 0, 6]);
	}

	#[test]
	fn parses_selection_embedded_in_prose() {
		assert_eq!(parse_selection("The most relevant are 2 and 5.", 8, 3), vec![1, 4]);
	}

	#[test]
	fn drops_out_of_bounds_positions() {
		assert_eq!(parse_selection("0, 9, 2", 8, 3), vec![1]);
	}

	#[test]
	fn keeps_at_most_the_requested_count() {
		assert_eq!(parse_selection("1, 2, 3, 4, 5", 8, 3), vec![0, 1, 2]);
	}

	#[test]
	fn junk_output_yields_no_indices() {
		assert!(parse_selection("I cannot decide.", 8, 3).is_empty());
	}

	#[test]
	fn truncation_is_char_based() {
		assert_eq!(truncate_chars("héllo", 3), "hél");
		assert_eq!(truncate_chars("hi", 10), "hi");
	}
}
