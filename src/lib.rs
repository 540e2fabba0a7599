//! # Quote Harness
//!
//! Extracts the total cost of a hotel group-booking quote from free text,
//! an uploaded document, and the web pages the quote links to.
//!
//! A proposal usually arrives as an email body, sometimes with a PDF or
//! HTML attachment, and often points at the hotel's own pages for meeting
//! space or catering. Quote Harness gathers all of it into one text,
//! asks a language model for the three cost categories (guest rooms,
//! meeting rooms, food & beverage), and sums them deterministically.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌───────────┐   ┌────────────┐   ┌──────────┐
//! │ Form / CLI │──▶│ Extractor │──▶│ Aggregator │──▶│  Oracle  │
//! │ text+file  │   │ PDF/HTML  │   │ + links    │   │  (LLM)   │
//! └────────────┘   └───────────┘   └─────┬──────┘   └────┬─────┘
//!                                        │               │
//!                                  ┌─────▼─────┐   ┌─────▼─────┐
//!                                  │  Fetcher  │   │  Totals   │
//!                                  │ ≤ 5 links │   │ → SQLite  │
//!                                  └───────────┘   └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! qh init                                   # create database
//! qh parse --text "Room rate \$200 x 50 rooms x 3 nights"
//! qh serve                                  # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Request error taxonomy |
//! | [`models`] | Core data types |
//! | [`extract`] | File validation and text extraction |
//! | [`html`] | HTML to plain text |
//! | [`links`] | URL harvesting |
//! | [`fetch`] | Concurrent link fetching |
//! | [`aggregate`] | Combined text assembly |
//! | [`prompts`] | Extraction prompt |
//! | [`oracle`] | Language-model extraction |
//! | [`total`] | Deterministic totals |
//! | [`pipeline`] | Request orchestration |
//! | [`store`] | Quote persistence |
//! | [`server`] | HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod html;
pub mod links;
pub mod migrate;
pub mod models;
pub mod oracle;
pub mod pipeline;
pub mod prompts;
pub mod server;
pub mod store;
pub mod total;
