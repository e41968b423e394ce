//! # Chronograph
//!
//! A retrieval-augmented generator of pseudo-historical newspaper issues.
//!
//! Chronograph builds a semantic index over a small corpus of historical
//! event records, retrieves and date-filters candidates for a target
//! date, and prompts a language model to write stylized news copy that is
//! coerced into a validated structured report, with bounded retries when
//! the model's output is malformed and graceful degradation when
//! retrieval or parsing fails.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────┐   ┌───────────────┐
//! │ CSV corpus │──▶│ SemanticIndex │──▶│ Date-windowed │
//! │  (events)  │   │ (embeddings)  │   │   retriever   │
//! └────────────┘   └──────────────┘   └──────┬────────┘
//!                                            │ context
//!                                            ▼
//!                  ┌──────────────┐   ┌───────────────┐
//!                  │ NewsReport   │◀──│ Prompt + chat │
//!                  │ (validated)  │   │ model + retry │
//!                  └──────────────┘   └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export CHRONOGRAPH_API_KEY=...
//! export CHRONOGRAPH_BASE_URL=https://api.openai.com/v1
//! chronograph generate --date "14 July 1789" --era XVIII --count 3 --window 7
//! chronograph retrieve --date "14 July 1789" --window 7
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`corpus`] | Event corpus CSV loader |
//! | [`dates`] | Target and record date parsing |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Semantic index with single-flight build |
//! | [`retriever`] | Date-windowed retrieval |
//! | [`prompt`] | Prompt composition |
//! | [`llm`] | Chat model client |
//! | [`generate`] | Structured generation and retry control |
//! | [`error`] | Error taxonomy |

pub mod config;
pub mod corpus;
pub mod dates;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod index;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod retriever;
