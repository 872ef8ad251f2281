//! The `get_user_notes` tool. Notes are supplementary context, so every
//! failure mode here degrades to an empty result instead of failing the
//! request.

// crates.io
use serde::Serialize;

use crate::TomeService;

#[derive(Clone, Debug, Serialize)]
pub struct NoteEntry {
	pub phase: u32,
	pub milestone: String,
	pub task: String,
	pub notes: String,
	pub completed: bool,
}

impl TomeService {
	/// Progress rows with non-blank notes, decorated with roadmap titles and
	/// sorted by phase.
	pub async fn user_notes(&self) -> Vec<NoteEntry> {
		let Some(store) = self.progress.as_ref() else {
			tracing::info!("Progress store not configured; returning no notes.");

			return Vec::new();
		};
		let rows = match store.fetch().await {
			Ok(rows) => rows,
			Err(err) => {
				tracing::warn!(error = %err, "Failed to fetch progress rows; returning no notes.");

				return Vec::new();
			},
		};
		let mut entries: Vec<NoteEntry> = rows
			.into_iter()
			.filter_map(|row| {
				let notes = row.notes.as_deref().unwrap_or_default().trim().to_string();

				if notes.is_empty() {
					return None;
				}

				let info = self.roadmap.task_info(&row.milestone_id, &row.task_id);

				Some(NoteEntry {
					phase: info.as_ref().map(|i| i.phase).unwrap_or(0),
					milestone: info
						.as_ref()
						.map(|i| i.milestone_title.clone())
						.unwrap_or_else(|| row.milestone_id.clone()),
					task: info
						.map(|i| i.task_title)
						.unwrap_or_else(|| row.task_id.clone()),
					notes,
					completed: row.completed,
				})
			})
			.collect();

		entries.sort_by_key(|entry| entry.phase);

		entries
	}
}
