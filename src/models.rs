//! Core data models for the generation pipeline.
//!
//! These types represent the event records, indexed documents, and
//! generated reports that flow through retrieval and generation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GenerateError;

/// One historical fact as loaded from the corpus. Immutable after load.
#[derive(Debug, Clone)]
pub struct EventRecord {
    /// Free-form date string; may be a full date or a bare year.
    pub date: String,
    pub description: String,
    pub location: Option<String>,
    pub category: Option<String>,
}

/// A retrievable document derived from an [`EventRecord`].
///
/// `content` folds date, description, and the optional fields into one
/// text blob for embedding; the original date string and source are kept
/// as metadata for date filtering and diagnostics.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub content: String,
    pub date: String,
    pub source: String,
}

impl IndexedDocument {
    /// Fold an event record into an embeddable document.
    pub fn from_record(record: &EventRecord, source: &str) -> Self {
        let mut content = format!("Date: {}. Event: {}", record.date, record.description);
        if let Some(location) = &record.location {
            content.push_str(&format!(". Location: {location}"));
        }
        if let Some(category) = &record.category {
            content.push_str(&format!(". Category: {category}"));
        }
        IndexedDocument {
            content,
            date: record.date.clone(),
            source: source.to_string(),
        }
    }
}

/// An indexed document returned by a similarity query.
///
/// `rank` is the position in the similarity ordering (0 = nearest).
/// Transient; created per query and discarded after filtering.
#[derive(Debug, Clone)]
pub struct RetrievalCandidate {
    pub document: IndexedDocument,
    pub rank: usize,
}

/// One generated article. Every field is required; a report missing any of
/// them fails schema validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub headline: String,
    /// Category label, e.g. "Politics" or "Society".
    pub rubric: String,
    /// Free-text date/place line, e.g. "Paris, 14 July 1789".
    pub date_location: String,
    pub body: String,
    /// Generated byline.
    pub reporter: String,
}

/// An ordered sequence of articles: the sole output contract of the core.
///
/// A report with zero articles is a valid "no result" signal, distinct
/// from a failed request (see [`NewsOutcome`]).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsReport {
    pub articles: Vec<NewsArticle>,
}

impl NewsReport {
    pub fn empty() -> Self {
        NewsReport::default()
    }
}

/// Stylistic era for the generated copy. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Era {
    #[value(name = "XVII")]
    Xvii,
    #[value(name = "XVIII")]
    Xviii,
    #[value(name = "XIX")]
    Xix,
    #[value(name = "XX")]
    Xx,
}

impl Era {
    /// Century label as it appears in prompts and the CLI, e.g. `"XVIII"`.
    pub fn label(&self) -> &'static str {
        match self {
            Era::Xvii => "XVII",
            Era::Xviii => "XVIII",
            Era::Xix => "XIX",
            Era::Xx => "XX",
        }
    }
}

impl fmt::Display for Era {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Era {
    type Err = GenerateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XVII" => Ok(Era::Xvii),
            "XVIII" => Ok(Era::Xviii),
            "XIX" => Ok(Era::Xix),
            "XX" => Ok(Era::Xx),
            other => Err(GenerateError::Configuration(format!(
                "unknown era style: '{other}'. Use XVII, XVIII, XIX, or XX."
            ))),
        }
    }
}

/// Input bundle for a single generation request.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Display-format target date, e.g. `"14 July 1789"`.
    pub target_date: String,
    pub era: Era,
    /// Desired article count, 1 to 5.
    pub num_articles: usize,
    /// Maximum day-distance between a candidate's date and the target.
    /// `None` disables windowing and accepts all parseable candidates.
    pub window_days: Option<i64>,
}

/// What the boundary receives for every completed request: always a report,
/// plus a structured error descriptor when the request degraded.
///
/// Replaces the source pattern of a process-wide "last error" variable;
/// the error travels with the request it belongs to.
#[derive(Debug)]
pub struct NewsOutcome {
    pub report: NewsReport,
    /// Last error recorded before the request degraded to an empty report.
    pub error: Option<GenerateError>,
    /// User-facing message for legitimate empty results.
    pub notice: Option<String>,
}

impl NewsOutcome {
    pub fn success(report: NewsReport) -> Self {
        NewsOutcome {
            report,
            error: None,
            notice: None,
        }
    }

    pub fn degraded(error: GenerateError) -> Self {
        NewsOutcome {
            report: NewsReport::empty(),
            error: Some(error),
            notice: None,
        }
    }

    pub fn empty_with_notice(notice: impl Into<String>) -> Self {
        NewsOutcome {
            report: NewsReport::empty(),
            error: None,
            notice: Some(notice.into()),
        }
    }
}
