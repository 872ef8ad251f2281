use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use tome_service::{ChatMessage, CompletionStats, ServiceError, TaskContext};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/chat", post(chat))
		.route("/api/progress", get(get_progress))
		.route("/api/progress/toggle", post(toggle_task))
		.route("/api/progress/notes", post(update_notes))
		.route("/api/progress/stats", get(completion_stats))
		.with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct ChatRequestBody {
	#[serde(default)]
	messages: Vec<ChatMessage>,
	#[serde(default, rename = "taskContext")]
	task_context: Option<TaskContext>,
}

/// Runs the conversation loop and delivers the answer with the line-delimited
/// stream framing `0:<json string>\n`. The text is computed in full before the
/// single frame is written; the framing leaves room for incremental delivery.
async fn chat(
	State(state): State<AppState>,
	Json(payload): Json<ChatRequestBody>,
) -> Result<Response, ApiError> {
	let deadline = Duration::from_millis(state.service.cfg.service.request_timeout_ms);
	let answer =
		tokio::time::timeout(deadline, state.service.chat(payload.messages, payload.task_context))
			.await
			.map_err(|_| {
				json_error(
					StatusCode::GATEWAY_TIMEOUT,
					"deadline_exceeded",
					"Request exceeded the overall deadline.",
				)
			})??;
	let frame = format!(
		"0:{}\n",
		serde_json::to_string(&answer).map_err(|err| json_error(
			StatusCode::INTERNAL_SERVER_ERROR,
			"encoding_error",
			err.to_string(),
		))?
	);

	Ok((
		[(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
		frame,
	)
		.into_response())
}

async fn get_progress(
	State(state): State<AppState>,
) -> Result<Json<Vec<tome_providers::progress::ProgressRecord>>, ApiError> {
	Ok(Json(state.service.get_progress().await?))
}

#[derive(Debug, Deserialize)]
struct ToggleTaskRequest {
	milestone_id: String,
	task_id: String,
	completed: bool,
}

async fn toggle_task(
	State(state): State<AppState>,
	Json(payload): Json<ToggleTaskRequest>,
) -> Result<StatusCode, ApiError> {
	state
		.service
		.toggle_task(&payload.milestone_id, &payload.task_id, payload.completed)
		.await?;

	Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct UpdateNotesRequest {
	milestone_id: String,
	task_id: String,
	notes: String,
}

async fn update_notes(
	State(state): State<AppState>,
	Json(payload): Json<UpdateNotesRequest>,
) -> Result<StatusCode, ApiError> {
	state
		.service
		.update_notes(&payload.milestone_id, &payload.task_id, &payload.notes)
		.await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn completion_stats(
	State(state): State<AppState>,
) -> Result<Json<CompletionStats>, ApiError> {
	Ok(Json(state.service.completion_stats().await?))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	error: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match &err {
			ServiceError::Config { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "config_error", err.to_string()),
			ServiceError::InvalidRequest { .. } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", err.to_string()),
			ServiceError::Provider { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", err.to_string()),
			ServiceError::CorpusUnavailable =>
				json_error(StatusCode::SERVICE_UNAVAILABLE, "corpus_unavailable", err.to_string()),
			ServiceError::ProgressUnavailable => json_error(
				StatusCode::SERVICE_UNAVAILABLE,
				"progress_unavailable",
				err.to_string(),
			),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, error: self.message };

		(self.status, Json(body)).into_response()
	}
}
