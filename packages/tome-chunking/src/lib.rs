//! Paragraph-oriented chunking for chapter text.
//!
//! Chunks are built from whole paragraphs only; a paragraph is never split
//! mid-way, so a single paragraph longer than `max_chunk_chars` becomes an
//! oversized chunk on its own.

#[derive(Clone, Debug)]
pub struct ChunkingConfig {
	/// Trimmed paragraphs shorter than this are treated as headings or noise.
	pub min_paragraph_chars: usize,
	/// A buffer must hold at least this much before it is eligible to flush.
	pub min_chunk_chars: usize,
	/// Flush before appending a paragraph that would push the buffer past this.
	pub max_chunk_chars: usize,
	/// The final leftover buffer is kept only above this length.
	pub min_tail_chars: usize,
}
impl Default for ChunkingConfig {
	fn default() -> Self {
		Self {
			min_paragraph_chars: 30,
			min_chunk_chars: 200,
			max_chunk_chars: 1_500,
			min_tail_chars: 100,
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
	/// Increments once per flushed chunk, not once per paragraph.
	pub chunk_index: usize,
	pub content: String,
}

/// Splits `text` into bounded chunks along blank-line paragraph boundaries.
///
/// Pure and total; an empty document yields an empty sequence.
pub fn chunk_text(text: &str, cfg: &ChunkingConfig) -> Vec<Chunk> {
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut chunk_index = 0_usize;

	for paragraph in split_paragraphs(text) {
		if paragraph.chars().count() < cfg.min_paragraph_chars {
			continue;
		}

		let current_len = current.chars().count();

		if current_len > cfg.min_chunk_chars
			&& current_len + paragraph.chars().count() > cfg.max_chunk_chars
		{
			chunks.push(Chunk { chunk_index, content: current.trim().to_string() });

			chunk_index += 1;
			current = String::new();
		}
		if !current.is_empty() {
			current.push_str("\n\n");
		}

		current.push_str(paragraph);
	}

	let tail = current.trim();

	if tail.chars().count() > cfg.min_tail_chars {
		chunks.push(Chunk { chunk_index, content: tail.to_string() });
	} else if !tail.is_empty() {
		tracing::debug!(chars = tail.chars().count(), "Dropped short trailing chunk.");
	}

	chunks
}

/// Builds the stable chunk id for `(chapter_id, chunk_index)`.
pub fn chunk_id(chapter_id: &str, chunk_index: usize) -> String {
	format!("{chapter_id}-chunk-{chunk_index}")
}

fn split_paragraphs(text: &str) -> impl Iterator<Item = &str> {
	// Blank-line boundaries; runs of blank lines count as one separator.
	text.split("\n\n").flat_map(|block| block.split("\r\n\r\n")).map(str::trim).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn paragraph(len: usize) -> String {
		"x".repeat(len)
	}

	#[test]
	fn empty_document_yields_no_chunks() {
		assert!(chunk_text("", &ChunkingConfig::default()).is_empty());
		assert!(chunk_text("\n\n\n\n", &ChunkingConfig::default()).is_empty());
	}

	#[test]
	fn short_paragraphs_are_dropped_as_noise() {
		let text = format!("Heading\n\n{}", paragraph(300));
		let chunks = chunk_text(&text, &ChunkingConfig::default());

		assert_eq!(chunks.len(), 1);
		assert!(!chunks[0].content.contains("Heading"));
	}

	#[test]
	fn flushes_before_exceeding_max_size() {
		let cfg = ChunkingConfig::default();
		let text = [paragraph(600), paragraph(600), paragraph(600)].join("\n\n");
		let chunks = chunk_text(&text, &cfg);

		assert_eq!(chunks.len(), 2);
		// First two paragraphs fit together; the third would push past 1_500.
		assert_eq!(chunks[0].content.chars().count(), 1_202);
		assert_eq!(chunks[0].chunk_index, 0);
		assert_eq!(chunks[1].chunk_index, 1);
	}

	#[test]
	fn oversized_paragraph_is_never_split() {
		let cfg = ChunkingConfig::default();
		let text = format!("{}\n\n{}", paragraph(300), paragraph(4_000));
		let chunks = chunk_text(&text, &cfg);

		assert_eq!(chunks.len(), 2);
		assert_eq!(chunks[1].content.chars().count(), 4_000);
	}

	#[test]
	fn short_tail_is_dropped() {
		let cfg = ChunkingConfig::default();
		// Single 80-char paragraph passes the noise filter but not the tail gate.
		let chunks = chunk_text(&paragraph(80), &cfg);

		assert!(chunks.is_empty());
	}

	#[test]
	fn rechunking_a_chunk_is_identity_below_max() {
		let cfg = ChunkingConfig::default();
		let text = [paragraph(400), paragraph(400), paragraph(300)].join("\n\n");
		let first = chunk_text(&text, &cfg);

		assert_eq!(first.len(), 1);

		let second = chunk_text(&first[0].content, &cfg);

		assert_eq!(second.len(), 1);
		assert_eq!(second[0].content, first[0].content);
	}

	#[test]
	fn chunks_cover_all_surviving_paragraphs_in_order() {
		let cfg = ChunkingConfig::default();
		let paragraphs: Vec<String> = (0..9).map(|i| format!("{i}-{}", paragraph(340))).collect();
		let text = paragraphs.join("\n\n");
		let chunks = chunk_text(&text, &cfg);
		let rejoined: Vec<&str> =
			chunks.iter().flat_map(|c| c.content.split("\n\n")).collect();

		assert_eq!(rejoined, paragraphs.iter().map(String::as_str).collect::<Vec<_>>());

		for chunk in &chunks {
			assert!(!chunk.content.is_empty());
		}
	}

	#[test]
	fn chunk_ids_follow_flush_order() {
		assert_eq!(chunk_id("chapter-3", 0), "chapter-3-chunk-0");
		assert_eq!(chunk_id("conclusion", 4), "conclusion-chunk-4");
	}
}
