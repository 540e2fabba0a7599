//! Request orchestration.
//!
//! Sequences one request through every component:
//!
//! ```text
//! Received → Validating → Extracting → Aggregating → OracleQuerying
//!          → Totaling → Persisting → Responded
//! ```
//!
//! Validation, extraction, and oracle errors end the request early
//! (`Failed`). Link failures are recorded in the response. A persistence
//! failure is logged and the response is returned unchanged.
//!
//! The oracle client, link fetcher, and sink are built once and shared by
//! every request through the pipeline value.

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::aggregate::CombinedText;
use crate::config::Config;
use crate::error::QuoteError;
use crate::extract::{extract_file_text, validate_file};
use crate::fetch::LinkFetcher;
use crate::links::harvest_links;
use crate::models::{InputDocument, LinkError, QuoteResponse};
use crate::oracle::{create_oracle, extract_quote, QuoteOracle};
use crate::store::{build_record, NullQuoteStore, QuoteSink, SqliteQuoteStore};
use crate::total::calculate_total;

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validating,
    Extracting,
    Aggregating,
    OracleQuerying,
    Totaling,
    Persisting,
    Responded,
    Failed,
}

struct StageTracker {
    current: Stage,
}

impl StageTracker {
    fn new() -> Self {
        debug!(stage = ?Stage::Received, "quote request");
        Self {
            current: Stage::Received,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!(from = ?self.current, to = ?stage, "quote request stage");
        self.current = stage;
    }
}

pub struct QuotePipeline {
    config: Arc<Config>,
    fetcher: LinkFetcher,
    oracle: Arc<dyn QuoteOracle>,
    sink: Arc<dyn QuoteSink>,
}

impl QuotePipeline {
    pub fn new(
        config: Config,
        oracle: Arc<dyn QuoteOracle>,
        sink: Arc<dyn QuoteSink>,
    ) -> Result<Self> {
        let fetcher = LinkFetcher::new(&config.fetch)?;
        Ok(Self {
            config: Arc::new(config),
            fetcher,
            oracle,
            sink,
        })
    }

    /// Builds the oracle and sink named by `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let oracle = create_oracle(&config.oracle)?;
        let sink: Arc<dyn QuoteSink> = if config.persistence.enabled {
            Arc::new(SqliteQuoteStore::open(&config.db).await?)
        } else {
            Arc::new(NullQuoteStore)
        };
        info!(
            oracle = oracle.name(),
            persistence = config.persistence.enabled,
            "quote pipeline ready"
        );
        Self::new(config.clone(), oracle, sink)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Runs one request to completion.
    pub async fn process(&self, input: InputDocument) -> Result<QuoteResponse, QuoteError> {
        let mut tracker = StageTracker::new();
        match self.run(input, &mut tracker).await {
            Ok(response) => {
                tracker.enter(Stage::Responded);
                Ok(response)
            }
            Err(e) => {
                let stage = tracker.current;
                tracker.enter(Stage::Failed);
                warn!(?stage, error = %e, "quote request failed");
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        input: InputDocument,
        tracker: &mut StageTracker,
    ) -> Result<QuoteResponse, QuoteError> {
        let max_file_bytes = self.config.upload.max_file_bytes;

        tracker.enter(Stage::Validating);
        if let Some(file) = &input.uploaded_file {
            validate_file(file, max_file_bytes)?;
        }

        tracker.enter(Stage::Extracting);
        let mut combined = CombinedText::new(&input.source_text);
        let mut has_content = !input.source_text.trim().is_empty();
        if let Some(file) = &input.uploaded_file {
            let file_text = extract_file_text(file, max_file_bytes).await?;
            has_content |= !file_text.trim().is_empty();
            combined.push_file(&file_text);
        }
        if !has_content {
            return Err(QuoteError::NoContentProvided);
        }

        tracker.enter(Stage::Aggregating);
        let links = harvest_links(combined.as_str());
        let results = self.fetcher.fetch_all(&links).await;
        let mut link_errors = Vec::new();
        for result in &results {
            if !combined.push_link(result) {
                link_errors.push(LinkError {
                    url: result.url.clone(),
                    message: result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "No content returned".to_string()),
                });
            }
        }
        if !link_errors.is_empty() {
            info!(errors = ?link_errors, "Link fetch errors");
        }

        tracker.enter(Stage::OracleQuerying);
        let extraction =
            extract_quote(self.oracle.as_ref(), &self.config.oracle, combined.as_str()).await?;

        tracker.enter(Stage::Totaling);
        let total_quote = calculate_total(
            extraction.guestroom_total,
            extraction.meeting_room_total,
            extraction.food_beverage_total,
        );
        info!(
            guestroom = ?extraction.guestroom_total,
            meeting_room = ?extraction.meeting_room_total,
            food_beverage = ?extraction.food_beverage_total,
            total = ?total_quote,
            "Quote calculation"
        );

        let response = QuoteResponse {
            extraction,
            total_quote,
            processed_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            has_linked_content: !links.is_empty(),
            linked_content_fetched: combined.linked_blocks(),
            linked_content_errors: link_errors,
            content_length: combined.char_len(),
        };

        tracker.enter(Stage::Persisting);
        let record = build_record(
            &response,
            combined.as_str(),
            self.config.persistence.raw_content_limit,
        );
        if let Err(e) = self.sink.insert(&record).await {
            error!(error = %e, "Quote insert failed, continuing with parsed results");
        }

        Ok(response)
    }
}
