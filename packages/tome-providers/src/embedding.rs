// crates.io
use color_eyre::{Result, eyre};
use serde_json::Value;

/// Embeds `texts` in a single provider call, preserving input order.
///
/// The model identifier in `cfg` must match the one the corpus artifact was
/// built with; scores against a differently-embedded corpus are meaningless.
pub async fn embed(
	cfg: &tome_config::EmbeddingProviderConfig,
	texts: &[String],
) -> Result<Vec<Vec<f32>>> {
	let client = crate::http_client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"input": texts,
	});
	let res = client
		.post(url)
		.bearer_auth(&cfg.api_key)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_embedding_response(json, cfg.dimensions as usize)
}

/// Embeds a single query string.
pub async fn embed_one(
	cfg: &tome_config::EmbeddingProviderConfig,
	text: &str,
) -> Result<Vec<f32>> {
	let mut vectors = embed(cfg, &[text.to_string()]).await?;

	if vectors.len() != 1 {
		return Err(eyre::eyre!("Expected one embedding, got {}.", vectors.len()));
	}

	Ok(vectors.remove(0))
}

fn parse_embedding_response(json: Value, dimensions: usize) -> Result<Vec<Vec<f32>>> {
	let data = json
		.get("data")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding response is missing data array."))?;

	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());
	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let values = item
			.get("embedding")
			.and_then(|v| v.as_array())
			.ok_or_else(|| eyre::eyre!("Embedding item is missing embedding array."))?;
		let mut vector = Vec::with_capacity(values.len());
		for value in values {
			let number =
				value.as_f64().ok_or_else(|| eyre::eyre!("Embedding value must be numeric."))?;
			vector.push(number as f32);
		}
		if vector.len() != dimensions {
			return Err(eyre::eyre!(
				"Embedding has {} dimensions; expected {dimensions}.",
				vector.len()
			));
		}
		indexed.push((index, vector));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vector)| vector).collect())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn orders_embeddings_by_index() {
		let json = serde_json::json!({
			"data": [
				{ "index": 1, "embedding": [2.0, 3.0] },
				{ "index": 0, "embedding": [0.5, 1.5] }
			]
		});
		let parsed = parse_embedding_response(json, 2).expect("parse failed");

		assert_eq!(parsed[0], vec![0.5, 1.5]);
		assert_eq!(parsed[1], vec![2.0, 3.0]);
	}

	#[test]
	fn rejects_wrong_dimensionality() {
		let json = serde_json::json!({
			"data": [{ "index": 0, "embedding": [1.0, 2.0, 3.0] }]
		});

		assert!(parse_embedding_response(json, 1_536).is_err());
	}

	#[test]
	fn rejects_missing_data_array() {
		assert!(parse_embedding_response(serde_json::json!({}), 2).is_err());
	}
}
