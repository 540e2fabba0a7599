//! Quote extraction oracle.
//!
//! The language model is treated as an opaque text-in / JSON-out service
//! behind the [`QuoteOracle`] trait:
//! - **[`OpenAiOracle`]**: chat completions API in JSON mode.
//! - **[`DisabledOracle`]**: always unavailable; used when `oracle.provider = "disabled"`.
//! - **[`StaticOracle`]**: returns a fixed body; used by tests and offline runs.
//!
//! [`extract_quote`] builds the prompt, invokes the oracle, and validates the
//! output with [`parse_oracle_response`].
//!
//! # Retry Strategy
//!
//! The OpenAI oracle retries HTTP 429, 5xx, and transport errors with
//! exponential backoff (1s, 2s, 4s, ...). Other 4xx responses fail at once.
//! Each attempt is bounded by `oracle.timeout_secs`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::config::OracleConfig;
use crate::error::QuoteError;
use crate::models::{CalculationBreakdown, ExtractionResult};
use crate::prompts::{build_extraction_prompt, SYSTEM_PROMPT};

/// The three totals the oracle must always emit.
pub const REQUIRED_FIELDS: [&str; 3] = ["guestroomTotal", "meetingRoomTotal", "foodBeverageTotal"];

/// One oracle invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct OracleRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A text-in / JSON-out language model.
#[async_trait]
pub trait QuoteOracle: Send + Sync {
    /// Identifier for logs (e.g. the model name).
    fn name(&self) -> &str;

    /// Returns the raw model output for `request`.
    ///
    /// Service failures map to [`QuoteError::OracleUnavailable`]; the output
    /// itself is not interpreted here.
    async fn complete(&self, request: &OracleRequest) -> Result<String, QuoteError>;
}

/// Runs the extraction prompt for `combined_text` and parses the result.
pub async fn extract_quote(
    oracle: &dyn QuoteOracle,
    config: &OracleConfig,
    combined_text: &str,
) -> Result<ExtractionResult, QuoteError> {
    let request = OracleRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: build_extraction_prompt(combined_text),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    debug!(oracle = oracle.name(), prompt_chars = request.user.len(), "querying oracle");
    let raw = oracle.complete(&request).await?;
    parse_oracle_response(&raw)
}

/// Validates raw oracle output.
///
/// The three totals must be present as keys (null is a valid value).
/// `confidence`, `aiNotes`, and `calculationBreakdown` are best-effort.
pub fn parse_oracle_response(raw: &str) -> Result<ExtractionResult, QuoteError> {
    let value: Value = match serde_json::from_str(strip_code_fence(raw)) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "Oracle returned invalid JSON");
            return Err(QuoteError::MalformedOracleResponse {
                raw: raw.to_string(),
            });
        }
    };

    let obj = match value {
        Value::Object(obj) => obj,
        _ => {
            error!("Oracle returned JSON that is not an object");
            return Err(QuoteError::MalformedOracleResponse {
                raw: raw.to_string(),
            });
        }
    };

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .into_iter()
        .filter(|field| !obj.contains_key(*field))
        .collect();
    if !missing.is_empty() {
        error!(?missing, "Oracle response missing required fields");
        return Err(QuoteError::IncompleteOracleResponse { missing });
    }

    Ok(ExtractionResult {
        guestroom_total: amount(&obj, "guestroomTotal"),
        meeting_room_total: amount(&obj, "meetingRoomTotal"),
        food_beverage_total: amount(&obj, "foodBeverageTotal"),
        confidence: amount(&obj, "confidence").map(|c| c.clamp(0.0, 1.0)),
        ai_notes: match obj.get("aiNotes") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        },
        calculation_breakdown: match obj.get("calculationBreakdown") {
            Some(Value::Object(b)) => Some(CalculationBreakdown {
                room_rate: amount(b, "roomRate"),
                rooms_per_night: amount(b, "roomsPerNight"),
                number_of_nights: amount(b, "numberOfNights"),
                calculated_total: amount(b, "calculatedTotal"),
            }),
            _ => None,
        },
    })
}

/// Reads a numeric field, accepting numbers and strings like `"$1,500"`.
fn amount(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    match obj.get(key)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | ' '))
                .collect();
            cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
        }
        _ => None,
    }
}

/// Drops a surrounding Markdown code fence, if any.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ============ Disabled Oracle ============

/// An oracle that is never available.
pub struct DisabledOracle;

#[async_trait]
impl QuoteOracle for DisabledOracle {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _request: &OracleRequest) -> Result<String, QuoteError> {
        Err(QuoteError::OracleUnavailable {
            detail: "oracle provider is disabled".to_string(),
        })
    }
}

// ============ Static Oracle ============

/// Returns the same body for every request and records what it was asked.
pub struct StaticOracle {
    body: String,
    requests: Mutex<Vec<OracleRequest>>,
}

impl StaticOracle {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Serializes `value` as the fixed body.
    pub fn json(value: Value) -> Self {
        Self::new(value.to_string())
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl QuoteOracle for StaticOracle {
    fn name(&self) -> &str {
        "static"
    }

    async fn complete(&self, request: &OracleRequest) -> Result<String, QuoteError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        Ok(self.body.clone())
    }
}

// ============ OpenAI Oracle ============

/// Oracle backed by `POST {base_url}/chat/completions`.
///
/// Requires `OPENAI_API_KEY`. The HTTP client is built once and reused.
pub struct OpenAiOracle {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
}

impl OpenAiOracle {
    /// # Errors
    ///
    /// Returns an error if `OPENAI_API_KEY` is not set or the client cannot be built.
    pub fn new(config: &OracleConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &OracleConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create oracle HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_retries: config.max_retries,
        })
    }

    fn request_body(&self, request: &OracleRequest) -> Value {
        json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.user },
            ],
            "response_format": { "type": "json_object" },
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
        })
    }
}

#[async_trait]
impl QuoteOracle for OpenAiOracle {
    fn name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &OracleRequest) -> Result<String, QuoteError> {
        let body = self.request_body(request);
        let mut last_err = String::from("no attempts made");

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                warn!(attempt, delay_secs = delay.as_secs(), "retrying oracle call");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: Value = response.json().await.map_err(|e| {
                            QuoteError::OracleUnavailable {
                                detail: format!("unreadable completion body: {}", e),
                            }
                        })?;
                        return completion_content(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    last_err = format!("OpenAI API error {}: {}", status, body_text);

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        continue;
                    }
                    break;
                }
                Err(e) => {
                    last_err = if e.is_timeout() {
                        format!("OpenAI request timed out: {}", e)
                    } else {
                        format!("OpenAI request failed: {}", e)
                    };
                }
            }
        }

        error!(error = %last_err, "oracle call failed");
        Err(QuoteError::OracleUnavailable { detail: last_err })
    }
}

/// Pulls `choices[0].message.content` out of a chat completion.
fn completion_content(json: &Value) -> Result<String, QuoteError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or_else(|| QuoteError::OracleUnavailable {
            detail: "completion has no message content".to_string(),
        })
}

/// Create the [`QuoteOracle`] named by `config.provider`.
///
/// # Errors
///
/// Returns an error for unknown providers or if the OpenAI oracle cannot be
/// initialized.
pub fn create_oracle(config: &OracleConfig) -> Result<Arc<dyn QuoteOracle>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledOracle)),
        "openai" => Ok(Arc::new(OpenAiOracle::new(config)?)),
        other => bail!("Unknown oracle provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_response() {
        let raw = r#"{
            "guestroomTotal": 30000,
            "meetingRoomTotal": null,
            "foodBeverageTotal": 50000,
            "confidence": 0.9,
            "aiNotes": "Meeting space complimentary with F&B minimum.",
            "calculationBreakdown": {
                "roomRate": 200, "roomsPerNight": 50, "numberOfNights": 3, "calculatedTotal": 30000
            }
        }"#;
        let result = parse_oracle_response(raw).unwrap();
        assert_eq!(result.guestroom_total, Some(30000.0));
        assert_eq!(result.meeting_room_total, None);
        assert_eq!(result.food_beverage_total, Some(50000.0));
        assert_eq!(result.confidence, Some(0.9));
        let breakdown = result.calculation_breakdown.unwrap();
        assert_eq!(breakdown.room_rate, Some(200.0));
        assert_eq!(breakdown.number_of_nights, Some(3.0));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = parse_oracle_response("Sure! Here are the totals").unwrap_err();
        assert!(matches!(err, QuoteError::MalformedOracleResponse { .. }));
    }

    #[test]
    fn non_object_is_malformed() {
        let err = parse_oracle_response("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, QuoteError::MalformedOracleResponse { .. }));
    }

    #[test]
    fn missing_total_is_incomplete() {
        let err = parse_oracle_response(r#"{"guestroomTotal": 1, "foodBeverageTotal": null}"#)
            .unwrap_err();
        match err {
            QuoteError::IncompleteOracleResponse { missing } => {
                assert_eq!(missing, vec!["meetingRoomTotal"]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn optional_fields_may_be_absent() {
        let result = parse_oracle_response(
            r#"{"guestroomTotal": null, "meetingRoomTotal": null, "foodBeverageTotal": null}"#,
        )
        .unwrap();
        assert_eq!(result, ExtractionResult::default());
    }

    #[test]
    fn numeric_strings_are_cleaned() {
        let result = parse_oracle_response(
            r#"{"guestroomTotal": "$30,000", "meetingRoomTotal": "complimentary", "foodBeverageTotal": 5e4}"#,
        )
        .unwrap();
        assert_eq!(result.guestroom_total, Some(30000.0));
        assert_eq!(result.meeting_room_total, None);
        assert_eq!(result.food_beverage_total, Some(50000.0));
    }

    #[test]
    fn confidence_is_clamped() {
        let result = parse_oracle_response(
            r#"{"guestroomTotal": 1, "meetingRoomTotal": 2, "foodBeverageTotal": 3, "confidence": 7}"#,
        )
        .unwrap();
        assert_eq!(result.confidence, Some(1.0));
    }

    #[test]
    fn fenced_json_is_accepted() {
        let raw = "```json\n{\"guestroomTotal\": 1, \"meetingRoomTotal\": null, \"foodBeverageTotal\": null}\n```";
        assert_eq!(parse_oracle_response(raw).unwrap().guestroom_total, Some(1.0));
    }

    #[test]
    fn request_body_uses_json_mode() {
        let config = OracleConfig::default();
        let oracle = OpenAiOracle::with_api_key(&config, "sk-test").unwrap();
        let body = oracle.request_body(&OracleRequest {
            system: "sys".to_string(),
            user: "usr".to_string(),
            temperature: 0.1,
            max_tokens: 1500,
        });
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["max_tokens"], 1500);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
    }

    #[test]
    fn completion_content_requires_message() {
        let ok = json!({"choices": [{"message": {"content": "{}"}}]});
        assert_eq!(completion_content(&ok).unwrap(), "{}");
        let err = completion_content(&json!({"choices": []})).unwrap_err();
        assert!(matches!(err, QuoteError::OracleUnavailable { .. }));
    }

    #[tokio::test]
    async fn extract_quote_sends_prompt_with_content() {
        let oracle = StaticOracle::json(json!({
            "guestroomTotal": 100,
            "meetingRoomTotal": null,
            "foodBeverageTotal": null
        }));
        let result = extract_quote(&oracle, &OracleConfig::default(), "Rate $100")
            .await
            .unwrap();
        assert_eq!(result.guestroom_total, Some(100.0));

        let requests = oracle.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].system, SYSTEM_PROMPT);
        assert!(requests[0].user.contains("Rate $100"));
        assert_eq!(requests[0].temperature, 0.1);
    }

    #[tokio::test]
    async fn disabled_oracle_is_unavailable() {
        let err = extract_quote(&DisabledOracle, &OracleConfig::default(), "x")
            .await
            .unwrap_err();
        assert!(matches!(err, QuoteError::OracleUnavailable { .. }));
    }
}
