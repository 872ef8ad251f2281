//! Progress operations over the external store: reads degrade to empty when
//! the store is absent, writes require it. All writes are idempotent
//! last-write-wins upserts keyed by `(user_id, milestone_id, task_id)`.

// crates.io
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use tome_providers::progress::ProgressRecord;

use crate::{ServiceError, ServiceResult, TomeService};

#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct CompletionStats {
	pub completed: usize,
	pub total: usize,
}

impl TomeService {
	pub async fn get_progress(&self) -> ServiceResult<Vec<ProgressRecord>> {
		let Some(store) = self.progress.as_ref() else {
			return Ok(Vec::new());
		};

		match store.fetch().await {
			Ok(rows) => Ok(rows),
			Err(err) => {
				tracing::warn!(error = %err, "Failed to fetch progress; returning empty.");

				Ok(Vec::new())
			},
		}
	}

	/// Marks a task complete or open; `completed_at` is set on completion and
	/// cleared when re-opened.
	pub async fn toggle_task(
		&self,
		milestone_id: &str,
		task_id: &str,
		completed: bool,
	) -> ServiceResult<()> {
		let store = self.progress.as_ref().ok_or(ServiceError::ProgressUnavailable)?;
		let completed_at = if completed { Some(now_rfc3339()?) } else { None };

		store
			.toggle_task(milestone_id, task_id, completed, completed_at)
			.await
			.map_err(|err| ServiceError::Provider { message: err.to_string() })
	}

	/// Updates only the notes column; completion state is untouched for
	/// existing rows.
	pub async fn update_notes(
		&self,
		milestone_id: &str,
		task_id: &str,
		notes: &str,
	) -> ServiceResult<()> {
		let store = self.progress.as_ref().ok_or(ServiceError::ProgressUnavailable)?;

		store
			.update_notes(milestone_id, task_id, notes)
			.await
			.map_err(|err| ServiceError::Provider { message: err.to_string() })
	}

	pub async fn completion_stats(&self) -> ServiceResult<CompletionStats> {
		let rows = self.get_progress().await?;

		Ok(CompletionStats {
			completed: rows.iter().filter(|row| row.completed).count(),
			total: rows.len(),
		})
	}
}

fn now_rfc3339() -> ServiceResult<String> {
	OffsetDateTime::now_utc()
		.format(&Rfc3339)
		.map_err(|err| ServiceError::Provider { message: format!("Failed to format timestamp: {err}.") })
}
