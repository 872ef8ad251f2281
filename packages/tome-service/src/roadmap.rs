//! Static task roadmap, used only to decorate progress rows with readable
//! phase/milestone/task titles. The tree itself is owned by the content side
//! of the app and shipped as a JSON file.

use std::{fs, path::Path};

use serde::Deserialize;

use crate::{ServiceError, ServiceResult};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Roadmap {
	#[serde(default)]
	pub phases: Vec<Phase>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Phase {
	pub number: u32,
	pub title: String,
	pub milestones: Vec<Milestone>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Milestone {
	pub id: String,
	pub title: String,
	pub tasks: Vec<Task>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Task {
	pub id: String,
	pub title: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskInfo {
	pub phase: u32,
	pub milestone_title: String,
	pub task_title: String,
}

impl Roadmap {
	pub fn empty() -> Self {
		Self::default()
	}

	pub fn load(path: &Path) -> ServiceResult<Self> {
		let raw = fs::read_to_string(path).map_err(|err| ServiceError::Config {
			message: format!("Failed to read roadmap at {path:?}: {err}."),
		})?;

		serde_json::from_str(&raw).map_err(|err| ServiceError::Config {
			message: format!("Failed to parse roadmap at {path:?}: {err}."),
		})
	}

	pub fn task_info(&self, milestone_id: &str, task_id: &str) -> Option<TaskInfo> {
		for phase in &self.phases {
			for milestone in &phase.milestones {
				if milestone.id != milestone_id {
					continue;
				}
				if let Some(task) = milestone.tasks.iter().find(|task| task.id == task_id) {
					return Some(TaskInfo {
						phase: phase.number,
						milestone_title: milestone.title.clone(),
						task_title: task.title.clone(),
					});
				}
			}
		}

		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> Roadmap {
		serde_json::from_value(serde_json::json!({
			"phases": [{
				"number": 1,
				"title": "Foundation",
				"milestones": [{
					"id": "m1",
					"title": "Pick your niche",
					"tasks": [
						{ "id": "t1", "title": "List candidate niches" },
						{ "id": "t2", "title": "Validate demand" }
					]
				}]
			}]
		}))
		.expect("parse failed")
	}

	#[test]
	fn resolves_known_task() {
		let info = sample().task_info("m1", "t2").expect("missing task");

		assert_eq!(info.phase, 1);
		assert_eq!(info.milestone_title, "Pick your niche");
		assert_eq!(info.task_title, "Validate demand");
	}

	#[test]
	fn unknown_ids_resolve_to_none() {
		assert!(sample().task_info("m1", "t9").is_none());
		assert!(sample().task_info("m9", "t1").is_none());
		assert!(Roadmap::empty().task_info("m1", "t1").is_none());
	}
}
