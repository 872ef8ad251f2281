use std::sync::Arc;

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use tower::util::ServiceExt;

use tome_api::{routes, state::AppState};
use tome_corpus::Corpus;
use tome_service::{Providers, Roadmap, TomeService};
use tome_testkit::{FixedEmbedding, MemoryProgressStore, ScriptedChat, chunk, test_config};

fn app_state(chat: ScriptedChat, progress: Option<Arc<MemoryProgressStore>>) -> AppState {
	let corpus = Corpus::new(vec![chunk(
		"pricing-chunk-0",
		3,
		"Pricing",
		"Anchor the retainer high and let the assessment de-risk the entry.",
		vec![1.0, 0.0],
	)])
	.expect("corpus invalid");
	let providers = Providers {
		embedding: Arc::new(FixedEmbedding::new(vec![1.0, 0.0])),
		chat: Arc::new(chat),
	};
	let progress =
		progress.map(|store| store as Arc<dyn tome_service::ProgressStore>);
	let service =
		TomeService::new(test_config(2), corpus, Roadmap::empty(), providers, progress);

	AppState { service: Arc::new(service) }
}

#[tokio::test]
async fn health_ok() {
	let app = routes::router(app_state(ScriptedChat::new(), None));
	let response = app
		.oneshot(
			Request::builder().uri("/health").body(Body::empty()).expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_rejects_empty_message_history() {
	let app = routes::router(app_state(ScriptedChat::new(), None));
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/chat")
				.header("content-type", "application/json")
				.body(Body::from(r#"{"messages": []}"#))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /api/chat.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Failed to parse body.");

	assert_eq!(json["error_code"], "invalid_request");
	assert!(json["error"].as_str().expect("missing error field").contains("No valid messages"));
}

#[tokio::test]
async fn chat_answers_with_line_framed_stream() {
	let chat = ScriptedChat::new().push_text("Anchor high.");
	let app = routes::router(app_state(chat, None));
	let payload = serde_json::json!({
		"messages": [{ "role": "user", "content": "Pricing?" }],
		"taskContext": { "title": "Set your retainer", "guidance": "Use the offer stack." }
	});
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/chat")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /api/chat.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(
		response.headers()[axum::http::header::CONTENT_TYPE],
		"text/plain; charset=utf-8"
	);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");

	assert_eq!(&bytes[..], b"0:\"Anchor high.\"\n");
}

#[tokio::test]
async fn chat_without_credential_is_a_config_error() {
	let mut state = app_state(ScriptedChat::new(), None);
	let service = Arc::get_mut(&mut state.service).expect("state not unique");

	service.cfg.providers.chat.api_key = String::new();

	let app = routes::router(state);
	let payload = serde_json::json!({
		"messages": [{ "role": "user", "content": "Hello" }]
	});
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/chat")
				.header("content-type", "application/json")
				.body(Body::from(payload.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /api/chat.");

	assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let json: serde_json::Value = serde_json::from_slice(&bytes).expect("Failed to parse body.");

	assert_eq!(json["error_code"], "config_error");
}

#[tokio::test]
async fn toggle_then_fetch_progress_round_trips() {
	let store = Arc::new(MemoryProgressStore::new("default_user"));
	let state = app_state(ScriptedChat::new(), Some(store));
	let app = routes::router(state.clone());
	let toggle = serde_json::json!({
		"milestone_id": "m1",
		"task_id": "t1",
		"completed": true
	});
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/progress/toggle")
				.header("content-type", "application/json")
				.body(Body::from(toggle.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call toggle.");

	assert_eq!(response.status(), StatusCode::NO_CONTENT);

	let app = routes::router(state);
	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/progress")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call progress.");

	assert_eq!(response.status(), StatusCode::OK);

	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Failed to read response body.");
	let rows: serde_json::Value = serde_json::from_slice(&bytes).expect("Failed to parse body.");

	assert_eq!(rows[0]["completed"], true);
	assert!(rows[0]["completed_at"].is_string());
}

#[tokio::test]
async fn progress_writes_without_store_are_unavailable() {
	let app = routes::router(app_state(ScriptedChat::new(), None));
	let toggle = serde_json::json!({
		"milestone_id": "m1",
		"task_id": "t1",
		"completed": true
	});
	let response = app
		.oneshot(
			Request::builder()
				.method("POST")
				.uri("/api/progress/toggle")
				.header("content-type", "application/json")
				.body(Body::from(toggle.to_string()))
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call toggle.");

	assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
