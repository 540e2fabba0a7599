//! HTTP contract of `POST /api/parse`.
//!
//! The real router is served on an ephemeral port with a static oracle
//! and an in-memory sink; requests go through `reqwest` multipart forms.

use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use std::sync::Arc;

use quote_harness::config::{Config, ServerConfig};
use quote_harness::oracle::{DisabledOracle, QuoteOracle, StaticOracle};
use quote_harness::pipeline::QuotePipeline;
use quote_harness::server::build_router;
use quote_harness::store::MemoryQuoteStore;

fn stub_oracle() -> Arc<StaticOracle> {
    Arc::new(StaticOracle::json(json!({
        "guestroomTotal": 30000,
        "meetingRoomTotal": null,
        "foodBeverageTotal": 50000,
        "confidence": 0.92,
        "aiNotes": "Meeting space complimentary with $50,000 F&B minimum.",
        "calculationBreakdown": {
            "roomRate": 200,
            "roomsPerNight": 50,
            "numberOfNights": 3,
            "calculatedTotal": 30000
        }
    })))
}

fn config_for(environment: &str) -> Config {
    Config {
        server: ServerConfig {
            environment: environment.to_string(),
            ..ServerConfig::default()
        },
        ..Config::default()
    }
}

/// Serves the router and returns the parse endpoint URL.
async fn start_server(
    config: Config,
    oracle: Arc<dyn QuoteOracle>,
    sink: Arc<MemoryQuoteStore>,
) -> String {
    let pipeline = Arc::new(QuotePipeline::new(config, oracle, sink).unwrap());
    let app = build_router(pipeline);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn post_form(base: &str, form: Form) -> (u16, Value) {
    let resp = reqwest::Client::new()
        .post(format!("{}/api/parse", base))
        .multipart(form)
        .send()
        .await
        .unwrap();
    let status = resp.status().as_u16();
    let body: Value = resp.json().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn text_only_quote_returns_totals() {
    let sink = Arc::new(MemoryQuoteStore::new());
    let base = start_server(config_for("production"), stub_oracle(), sink.clone()).await;

    let text = "Room rate $200 x 50 rooms x 3 nights, Complimentary meeting space with $50,000 F&B minimum";
    let (status, body) = post_form(&base, Form::new().text("emailText", text)).await;

    assert_eq!(status, 200, "body: {}", body);
    assert_eq!(body["guestroomTotal"], json!(30000.0));
    assert_eq!(body["meetingRoomTotal"], Value::Null);
    assert_eq!(body["foodBeverageTotal"], json!(50000.0));
    assert_eq!(body["totalQuote"], json!(80000.0));
    assert_eq!(body["hasLinkedContent"], json!(false));
    assert_eq!(body["linkedContentFetched"], json!(0));
    assert_eq!(body["linkedContentErrors"], json!([]));
    assert_eq!(body["contentLength"], json!(text.chars().count()));
    assert_eq!(body["calculationBreakdown"]["roomRate"], json!(200.0));
    assert!(body["processedAt"].as_str().unwrap().ends_with('Z'));

    assert_eq!(sink.records().len(), 1);
}

#[tokio::test]
async fn empty_form_is_rejected() {
    let oracle = stub_oracle();
    let base = start_server(
        config_for("production"),
        oracle.clone(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let (status, body) = post_form(&base, Form::new().text("emailText", "  ")).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["error"],
        json!("No content provided. Please paste email text or upload a file.")
    );
    assert!(oracle.requests().is_empty());
}

#[tokio::test]
async fn image_upload_is_rejected() {
    let base = start_server(
        config_for("production"),
        stub_oracle(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let part = Part::bytes(vec![0x89, b'P', b'N', b'G'])
        .file_name("photo.png")
        .mime_str("image/png")
        .unwrap();
    let form = Form::new().text("emailText", "see attached").part("file", part);
    let (status, body) = post_form(&base, form).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["error"],
        json!("File type not supported. Please upload PDF, HTML, or text files.")
    );
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn html_upload_is_extracted() {
    let oracle = stub_oracle();
    let base = start_server(
        config_for("production"),
        oracle.clone(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let part = Part::bytes(b"<html><body><p>Group rate $200</p><script>x()</script></body></html>".to_vec())
        .file_name("proposal.html")
        .mime_str("text/html")
        .unwrap();
    let (status, _) = post_form(&base, Form::new().part("file", part)).await;

    assert_eq!(status, 200);
    let prompt = &oracle.requests()[0].user;
    assert!(prompt.contains("--- UPLOADED FILE CONTENT ---\nGroup rate $200"));
    assert!(!prompt.contains("x()"));
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let mut config = config_for("production");
    config.upload.max_file_bytes = 1024 * 1024;
    let oracle = stub_oracle();
    let base = start_server(config, oracle.clone(), Arc::new(MemoryQuoteStore::new())).await;

    let part = Part::bytes(vec![b'a'; 1024 * 1024 + 10])
        .file_name("big.txt")
        .mime_str("text/plain")
        .unwrap();
    let (status, body) = post_form(&base, Form::new().part("file", part)).await;

    assert_eq!(status, 400);
    assert_eq!(
        body["error"],
        json!("File too large. Please upload files smaller than 1MB.")
    );
    assert!(oracle.requests().is_empty());
}

#[tokio::test]
async fn server_errors_hide_details_in_production() {
    let base = start_server(
        config_for("production"),
        Arc::new(DisabledOracle),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let (status, body) = post_form(&base, Form::new().text("emailText", "quote")).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], json!("AI service temporarily unavailable"));
    assert!(body.get("details").is_none());
}

#[tokio::test]
async fn server_errors_show_details_in_development() {
    let base = start_server(
        config_for("development"),
        Arc::new(StaticOracle::new("no json here")),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let (status, body) = post_form(&base, Form::new().text("emailText", "quote")).await;

    assert_eq!(status, 500);
    assert_eq!(body["error"], json!("AI returned invalid JSON response"));
    assert_eq!(body["details"], json!("no json here"));
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let base = start_server(
        config_for("production"),
        stub_oracle(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let resp = reqwest::Client::new()
        .get(format!("{}/api/parse", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 405);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], json!("Method not allowed"));
}

#[tokio::test]
async fn health_reports_version() {
    let base = start_server(
        config_for("production"),
        stub_oracle(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let body: Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["version"], json!(env!("CARGO_PKG_VERSION")));
}

#[tokio::test]
async fn non_multipart_body_gets_json_error() {
    let oracle = stub_oracle();
    let base = start_server(
        config_for("production"),
        oracle.clone(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let resp = reqwest::Client::new()
        .post(format!("{}/api/parse", base))
        .json(&json!({ "emailText": "Room rate $200" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 400);
    let content_type = resp
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/json"), "{}", content_type);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], json!("Error parsing form data"));
    assert!(oracle.requests().is_empty());
}

#[tokio::test]
async fn second_file_is_rejected() {
    let base = start_server(
        config_for("production"),
        stub_oracle(),
        Arc::new(MemoryQuoteStore::new()),
    )
    .await;

    let part = |name: &str| {
        Part::bytes(b"Rate $200".to_vec())
            .file_name(name.to_string())
            .mime_str("text/plain")
            .unwrap()
    };
    let form = Form::new()
        .part("file", part("a.txt"))
        .part("file", part("b.txt"));
    let (status, body) = post_form(&base, form).await;

    assert_eq!(status, 400);
    assert_eq!(body["error"], json!("Only one file may be uploaded."));
}
