pub mod chat;
pub mod embedding;
pub mod progress;

use std::time::Duration;

use color_eyre::Result;
use reqwest::Client;

pub(crate) fn http_client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}
