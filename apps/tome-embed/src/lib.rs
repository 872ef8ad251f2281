//! Offline embedding generation: chunk every chapter, embed the chunks in
//! batches, and write the corpus artifact the serving process loads at start.
//!
//! Any batch failure aborts the run before anything is written, so a complete
//! artifact from a previous run is never replaced with partial data.

use std::{fs, path::Path, path::PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre};
use tracing_subscriber::EnvFilter;

use tome_chunking::ChunkingConfig;
use tome_corpus::{ChapterNumber, Chunk, Corpus};
use tome_service::EmbeddingProvider;

const BATCH_SIZE: usize = 20;

#[derive(Debug, Parser)]
#[command(
	version = tome_cli::VERSION,
	rename_all = "kebab",
	styles = tome_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Directory of chapter files named like `03-pricing.md`; non-numeric
	/// stems such as `conclusion.md` become symbolic chapter labels.
	#[arg(long, value_name = "DIR")]
	pub chapters: PathBuf,
	/// Defaults to `corpus.artifact_path` from the config.
	#[arg(long, value_name = "FILE")]
	pub output: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct Chapter {
	pub id: String,
	pub number: ChapterNumber,
	pub title: String,
	pub content: String,
}

pub async fn run(args: Args) -> Result<()> {
	let config = tome_config::load(&args.config)?;
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();

	if config.providers.embedding.api_key.trim().is_empty() {
		return Err(eyre::eyre!("providers.embedding.api_key is required to generate embeddings."));
	}

	let chapters = load_chapters(&args.chapters)?;

	tracing::info!(chapters = chapters.len(), "Processing chapters.");

	let corpus = generate(&config, &chapters, &HttpEmbedding).await?;
	let output = args.output.unwrap_or(config.corpus.artifact_path);

	corpus.save(&output)?;

	tracing::info!(chunks = corpus.len(), path = %output.display(), "Embeddings saved.");

	Ok(())
}

/// Chunks every chapter and fills embeddings in batches of [`BATCH_SIZE`].
/// Returns an error on the first failed batch; nothing is written here.
pub async fn generate(
	config: &tome_config::Config,
	chapters: &[Chapter],
	provider: &dyn EmbeddingProvider,
) -> Result<Corpus> {
	let chunking = ChunkingConfig {
		min_paragraph_chars: config.chunking.min_paragraph_chars as usize,
		min_chunk_chars: config.chunking.min_chunk_chars as usize,
		max_chunk_chars: config.chunking.max_chunk_chars as usize,
		min_tail_chars: config.chunking.min_tail_chars as usize,
	};
	let mut records: Vec<Chunk> = Vec::new();

	for chapter in chapters {
		let pieces = tome_chunking::chunk_text(&chapter.content, &chunking);

		tracing::info!(chapter = %chapter.id, chunks = pieces.len(), "Chapter chunked.");

		records.extend(pieces.into_iter().map(|piece| Chunk {
			id: tome_chunking::chunk_id(&chapter.id, piece.chunk_index),
			chapter_number: chapter.number.clone(),
			chapter_title: chapter.title.clone(),
			content: piece.content,
			embedding: Vec::new(),
		}));
	}

	tracing::info!(total = records.len(), "Generating embeddings.");

	let mut done = 0_usize;

	for batch in records.chunks_mut(BATCH_SIZE) {
		let texts: Vec<String> = batch.iter().map(|record| record.content.clone()).collect();
		let vectors = provider
			.embed(&config.providers.embedding, &texts)
			.await
			.map_err(|err| eyre::eyre!("Embedding batch starting at {done} failed: {err}."))?;

		if vectors.len() != batch.len() {
			return Err(eyre::eyre!(
				"Embedding batch starting at {done} returned {} vectors for {} texts.",
				vectors.len(),
				batch.len(),
			));
		}

		for (record, vector) in batch.iter_mut().zip(vectors) {
			record.embedding = vector;
		}

		done += batch.len();

		tracing::info!(done, "Batch embedded.");
	}

	Ok(Corpus::new(records)?)
}

pub fn load_chapters(dir: &Path) -> Result<Vec<Chapter>> {
	let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
		.filter_map(|entry| entry.ok().map(|entry| entry.path()))
		.filter(|path| {
			matches!(
				path.extension().and_then(|ext| ext.to_str()),
				Some("md") | Some("txt")
			)
		})
		.collect();

	paths.sort();

	let mut chapters = Vec::with_capacity(paths.len());

	for path in paths {
		let stem = path
			.file_stem()
			.and_then(|stem| stem.to_str())
			.ok_or_else(|| eyre::eyre!("Chapter file {path:?} has no usable name."))?;
		let (number, title) = chapter_meta(stem);

		chapters.push(Chapter {
			id: stem.to_string(),
			number,
			title,
			content: fs::read_to_string(&path)?,
		});
	}

	if chapters.is_empty() {
		return Err(eyre::eyre!("No chapter files found in {dir:?}."));
	}

	Ok(chapters)
}

fn chapter_meta(stem: &str) -> (ChapterNumber, String) {
	let digits: String = stem.chars().take_while(char::is_ascii_digit).collect();

	if !digits.is_empty()
		&& let Ok(number) = digits.parse::<u32>()
	{
		let rest = stem[digits.len()..].trim_start_matches('-');

		if !rest.is_empty() {
			return (ChapterNumber::Number(number), title_case(rest));
		}

		return (ChapterNumber::Number(number), format!("Chapter {number}"));
	}

	(ChapterNumber::Label(stem.to_string()), title_case(stem))
}

fn title_case(slug: &str) -> String {
	slug.split(['-', '_'])
		.filter(|word| !word.is_empty())
		.map(|word| {
			let mut chars = word.chars();

			match chars.next() {
				Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
				None => String::new(),
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

struct HttpEmbedding;
impl EmbeddingProvider for HttpEmbedding {
	fn embed_one<'a>(
		&'a self,
		cfg: &'a tome_config::EmbeddingProviderConfig,
		text: &'a str,
	) -> tome_service::BoxFuture<'a, color_eyre::Result<Vec<f32>>> {
		Box::pin(tome_providers::embedding::embed_one(cfg, text))
	}

	fn embed<'a>(
		&'a self,
		cfg: &'a tome_config::EmbeddingProviderConfig,
		texts: &'a [String],
	) -> tome_service::BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(tome_providers::embedding::embed(cfg, texts))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	use tome_testkit::{FailingEmbedding, FixedEmbedding, test_config};

	fn chapter(id: &str, number: u32, paragraphs: usize) -> Chapter {
		let content = (0..paragraphs)
			.map(|i| format!("Paragraph {i}: {}", "advice ".repeat(60)))
			.collect::<Vec<_>>()
			.join("\n\n");

		Chapter {
			id: id.to_string(),
			number: ChapterNumber::Number(number),
			title: format!("Chapter {number}"),
			content,
		}
	}

	#[test]
	fn chapter_meta_parses_numbered_stems() {
		assert_eq!(
			chapter_meta("03-pricing-objections"),
			(ChapterNumber::Number(3), "Pricing Objections".to_string())
		);
	}

	#[test]
	fn chapter_meta_falls_back_to_labels() {
		assert_eq!(
			chapter_meta("conclusion"),
			(ChapterNumber::Label("conclusion".to_string()), "Conclusion".to_string())
		);
	}

	#[tokio::test]
	async fn generate_fills_every_chunk_embedding() {
		let config = test_config(2);
		// Enough text to span several batches of 20.
		let chapters = vec![chapter("01-intro", 1, 60), chapter("02-offer", 2, 60)];
		let provider = FixedEmbedding::new(vec![0.6, 0.8]);
		let corpus = generate(&config, &chapters, &provider).await.expect("generate failed");

		assert!(corpus.len() > BATCH_SIZE);
		assert_eq!(corpus.dimensions(), 2);
		assert!(corpus.all().iter().all(|chunk| chunk.embedding == vec![0.6, 0.8]));
		assert!(corpus.all()[0].id.starts_with("01-intro-chunk-"));
	}

	#[tokio::test]
	async fn generate_aborts_on_provider_failure() {
		let config = test_config(2);
		let chapters = vec![chapter("01-intro", 1, 4)];

		assert!(generate(&config, &chapters, &FailingEmbedding).await.is_err());
	}
}
