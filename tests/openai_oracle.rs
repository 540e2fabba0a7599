//! `OpenAiOracle` against a mock chat-completions endpoint.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use quote_harness::config::OracleConfig;
use quote_harness::error::QuoteError;
use quote_harness::oracle::{extract_quote, OpenAiOracle};

#[derive(Clone, Default)]
struct MockState {
    /// Number of leading requests answered with 503.
    fail_first: usize,
    calls: Arc<AtomicUsize>,
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn completions(
    State(state): State<MockState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let n = state.calls.fetch_add(1, Ordering::SeqCst);
    state.bodies.lock().unwrap().push(body);
    if n < state.fail_first {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    let content = json!({
        "guestroomTotal": 18900,
        "meetingRoomTotal": 2500,
        "foodBeverageTotal": null,
        "confidence": 0.8,
        "aiNotes": "Meeting room rental listed separately."
    })
    .to_string();
    Ok(Json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    })))
}

async fn start_mock(state: MockState) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}/v1", addr)
}

fn oracle_config(base_url: String, max_retries: u32) -> OracleConfig {
    OracleConfig {
        base_url,
        max_retries,
        ..OracleConfig::default()
    }
}

#[tokio::test]
async fn sends_json_mode_request_and_parses_content() {
    let state = MockState::default();
    let config = oracle_config(start_mock(state.clone()).await, 0);
    let oracle = OpenAiOracle::with_api_key(&config, "test-key").unwrap();

    let result = extract_quote(&oracle, &config, "Rate $189 x 20 rooms x 5 nights")
        .await
        .unwrap();

    assert_eq!(result.guestroom_total, Some(18900.0));
    assert_eq!(result.meeting_room_total, Some(2500.0));
    assert_eq!(result.food_beverage_total, None);

    let bodies = state.bodies.lock().unwrap();
    let sent = &bodies[0];
    assert_eq!(sent["model"], json!("gpt-4o-mini"));
    assert_eq!(sent["response_format"]["type"], json!("json_object"));
    assert_eq!(sent["max_tokens"], json!(1500));
    assert_eq!(sent["messages"][0]["role"], json!("system"));
    let user = sent["messages"][1]["content"].as_str().unwrap();
    assert!(user.contains("Rate $189 x 20 rooms x 5 nights"));
}

#[tokio::test]
async fn retries_server_errors() {
    let state = MockState {
        fail_first: 1,
        ..MockState::default()
    };
    let config = oracle_config(start_mock(state.clone()).await, 2);
    let oracle = OpenAiOracle::with_api_key(&config, "test-key").unwrap();

    let result = extract_quote(&oracle, &config, "quote").await.unwrap();

    assert_eq!(result.meeting_room_total, Some(2500.0));
    assert_eq!(state.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn exhausted_retries_are_unavailable() {
    let state = MockState {
        fail_first: usize::MAX,
        ..MockState::default()
    };
    let config = oracle_config(start_mock(state.clone()).await, 0);
    let oracle = OpenAiOracle::with_api_key(&config, "test-key").unwrap();

    let err = extract_quote(&oracle, &config, "quote").await.unwrap_err();

    assert!(matches!(err, QuoteError::OracleUnavailable { .. }));
    assert_eq!(state.calls.load(Ordering::SeqCst), 1);
}
