//! The embedded book corpus: precomputed chunk embeddings plus provenance.
//!
//! The artifact is produced entirely offline (see the tome-embed app) and
//! loaded wholesale at process start; nothing mutates it at runtime.

mod error;

pub use error::{Error, Result};

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

/// Chapter provenance; either a numbered chapter or a symbolic label such as
/// "conclusion".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChapterNumber {
	Number(u32),
	Label(String),
}
impl std::fmt::Display for ChapterNumber {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Number(n) => write!(f, "{n}"),
			Self::Label(label) => write!(f, "{label}"),
		}
	}
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
	/// Stable id, `{chapter_id}-chunk-{index}`.
	pub id: String,
	pub chapter_number: ChapterNumber,
	pub chapter_title: String,
	pub content: String,
	pub embedding: Vec<f32>,
}
impl Chunk {
	/// Display label used in search results and citations.
	pub fn chapter_label(&self) -> String {
		format!("Chapter {}: {}", self.chapter_number, self.chapter_title)
	}
}

/// The complete, read-only set of embedded chunks.
#[derive(Clone, Debug, Default)]
pub struct Corpus {
	chunks: Vec<Chunk>,
}
impl Corpus {
	pub fn new(chunks: Vec<Chunk>) -> Result<Self> {
		validate(&chunks)?;

		Ok(Self { chunks })
	}

	/// An empty corpus; embedding-dependent features are unavailable.
	pub fn empty() -> Self {
		Self::default()
	}

	/// Eagerly loads the whole artifact. There is no partial corpus state.
	pub fn load(path: &Path) -> Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| Error::ReadArtifact { path: path.to_path_buf(), source: err })?;
		let chunks: Vec<Chunk> = serde_json::from_str(&raw)
			.map_err(|err| Error::ParseArtifact { path: path.to_path_buf(), source: err })?;
		let corpus = Self::new(chunks)?;

		tracing::info!(chunks = corpus.len(), dimensions = corpus.dimensions(), "Corpus loaded.");

		Ok(corpus)
	}

	/// Serializes to a temporary sibling file, then renames into place, so an
	/// existing complete artifact is never replaced with partial data.
	pub fn save(&self, path: &Path) -> Result<()> {
		validate(&self.chunks)?;

		let json = serde_json::to_string_pretty(&self.chunks)
			.map_err(|err| Error::SerializeArtifact { source: err })?;
		let tmp = path.with_extension("json.tmp");

		fs::write(&tmp, json)
			.map_err(|err| Error::WriteArtifact { path: tmp.clone(), source: err })?;
		fs::rename(&tmp, path)
			.map_err(|err| Error::WriteArtifact { path: path.to_path_buf(), source: err })?;

		Ok(())
	}

	pub fn all(&self) -> &[Chunk] {
		&self.chunks
	}

	pub fn len(&self) -> usize {
		self.chunks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.chunks.is_empty()
	}

	/// Embedding dimensionality, `0` for an empty corpus.
	pub fn dimensions(&self) -> usize {
		self.chunks.first().map(|chunk| chunk.embedding.len()).unwrap_or(0)
	}
}

fn validate(chunks: &[Chunk]) -> Result<()> {
	let Some(first) = chunks.first() else {
		return Ok(());
	};
	let dimensions = first.embedding.len();

	if dimensions == 0 {
		return Err(Error::InvalidArtifact {
			message: format!("Chunk {} has an empty embedding.", first.id),
		});
	}

	for chunk in chunks {
		if chunk.content.is_empty() {
			return Err(Error::InvalidArtifact {
				message: format!("Chunk {} has empty content.", chunk.id),
			});
		}
		if chunk.embedding.len() != dimensions {
			return Err(Error::InvalidArtifact {
				message: format!(
					"Chunk {} has {} dimensions; expected {dimensions}.",
					chunk.id,
					chunk.embedding.len()
				),
			});
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
		Chunk {
			id: id.to_string(),
			chapter_number: ChapterNumber::Number(1),
			chapter_title: "Pricing".to_string(),
			content: "Premium retainers anchor the offer.".to_string(),
			embedding,
		}
	}

	#[test]
	fn chapter_number_accepts_numbers_and_labels() {
		let numbered: ChapterNumber = serde_json::from_str("7").expect("parse failed");
		let labeled: ChapterNumber = serde_json::from_str("\"conclusion\"").expect("parse failed");

		assert_eq!(numbered, ChapterNumber::Number(7));
		assert_eq!(labeled, ChapterNumber::Label("conclusion".to_string()));
		assert_eq!(labeled.to_string(), "conclusion");
	}

	#[test]
	fn chapter_label_includes_number_and_title() {
		assert_eq!(chunk("c1-chunk-0", vec![0.1]).chapter_label(), "Chapter 1: Pricing");
	}

	#[test]
	fn parses_camel_case_artifact_records() {
		let raw = serde_json::json!([{
			"id": "ch1-chunk-0",
			"chapterNumber": 1,
			"chapterTitle": "Pricing",
			"content": "Premium retainers anchor the offer.",
			"embedding": [0.25, -0.5]
		}]);
		let chunks: Vec<Chunk> = serde_json::from_value(raw).expect("parse failed");
		let corpus = Corpus::new(chunks).expect("validation failed");

		assert_eq!(corpus.len(), 1);
		assert_eq!(corpus.dimensions(), 2);
	}

	#[test]
	fn rejects_mismatched_dimensions() {
		let chunks = vec![chunk("a", vec![0.1, 0.2]), chunk("b", vec![0.1])];

		assert!(matches!(Corpus::new(chunks), Err(Error::InvalidArtifact { .. })));
	}

	#[test]
	fn rejects_empty_embedding() {
		assert!(matches!(Corpus::new(vec![chunk("a", vec![])]), Err(Error::InvalidArtifact { .. })));
	}

	#[test]
	fn save_then_load_round_trips() {
		let dir = std::env::temp_dir().join(format!("tome-corpus-{}", std::process::id()));

		fs::create_dir_all(&dir).expect("Failed to create temp dir.");

		let path = dir.join("book-embeddings.json");
		let corpus =
			Corpus::new(vec![chunk("a", vec![0.5, 0.5]), chunk("b", vec![1.0, 0.0])]).unwrap();

		corpus.save(&path).expect("save failed");

		let loaded = Corpus::load(&path).expect("load failed");

		assert_eq!(loaded.len(), 2);
		assert_eq!(loaded.all()[1].embedding, vec![1.0, 0.0]);

		let _ = fs::remove_dir_all(&dir);
	}
}
