//! PostgREST-style client for the external progress store. Rows are keyed by
//! `(user_id, milestone_id, task_id)`; writes are last-write-wins upserts.

// crates.io
use color_eyre::{Result, eyre};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProgressRecord {
	pub user_id: String,
	pub milestone_id: String,
	pub task_id: String,
	pub completed: bool,
	/// RFC 3339 timestamp; `None` while the task is open.
	pub completed_at: Option<String>,
	pub notes: Option<String>,
}

pub async fn fetch(cfg: &tome_config::Progress) -> Result<Vec<ProgressRecord>> {
	let client = crate::http_client(15_000)?;
	let url = table_url(cfg);
	let res = client
		.get(url)
		.headers(auth_headers(cfg)?)
		.query(&[("user_id", format!("eq.{}", cfg.user_id).as_str()), ("select", "*")])
		.send()
		.await?;
	let rows: Vec<ProgressRecord> = res.error_for_status()?.json().await?;

	Ok(rows)
}

pub async fn upsert(cfg: &tome_config::Progress, row: &serde_json::Value) -> Result<()> {
	let client = crate::http_client(15_000)?;
	let url = table_url(cfg);
	let res = client
		.post(url)
		.headers(auth_headers(cfg)?)
		.header("Prefer", "resolution=merge-duplicates")
		.query(&[("on_conflict", "user_id,milestone_id,task_id")])
		.json(&serde_json::json!([row]))
		.send()
		.await?;

	res.error_for_status()?;

	Ok(())
}

fn table_url(cfg: &tome_config::Progress) -> String {
	format!("{}/rest/v1/{}", cfg.endpoint.trim_end_matches('/'), cfg.table)
}

fn auth_headers(cfg: &tome_config::Progress) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert("apikey", cfg.api_key.parse::<HeaderValue>()?);
	headers.insert(
		reqwest::header::AUTHORIZATION,
		format!("Bearer {}", cfg.api_key)
			.parse::<HeaderValue>()
			.map_err(|err| eyre::eyre!("Invalid progress store credential: {err}."))?,
	);

	Ok(headers)
}
