//! Date-windowed retrieval.
//!
//! Bridges fuzzy semantic retrieval with an exact temporal constraint:
//! over-fetches candidates from the semantic index, parses each
//! candidate's stored date with the robust parser, keeps those within the
//! requested day window of the target date, and truncates the
//! distance-ordered survivors to the requested count.
//!
//! An empty result is a legitimate "nothing nearby" outcome, not an
//! error; the caller turns it into an empty report plus a user-visible
//! notice.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::dates::{day_distance, parse_record_date, parse_target_date};
use crate::error::GenerateError;
use crate::index::SemanticIndex;
use crate::models::IndexedDocument;

/// A retrieval candidate that survived date parsing, annotated with its
/// parsed date and day-distance from the target.
#[derive(Debug, Clone)]
pub struct DatedCandidate {
    pub document: IndexedDocument,
    /// Rank in the original similarity ordering (0 = nearest).
    pub rank: usize,
    pub date: NaiveDate,
    pub distance_days: i64,
}

/// Retrieve up to `requested` candidates near a target date.
///
/// Over-fetches `max(requested * oversample_factor, min_candidates)`
/// semantic neighbors (semantic similarity does not guarantee temporal
/// proximity), drops candidates whose dates cannot be parsed, applies the
/// day window when one is given, and returns the closest `requested`
/// candidates ordered by day distance with similarity rank as tie-break.
///
/// # Errors
///
/// [`GenerateError::InvalidTargetDate`] for an unparseable target date,
/// [`GenerateError::Retrieval`] if the index query fails.
pub async fn retrieve_for_date(
    index: &SemanticIndex,
    target_date: &str,
    requested: usize,
    window_days: Option<i64>,
    config: &RetrievalConfig,
) -> Result<Vec<DatedCandidate>, GenerateError> {
    let target = parse_target_date(target_date)?;

    let k = (requested * config.oversample_factor).max(config.min_candidates);
    let query = format!("historical events around {target_date}");
    let candidates = index.retrieve(&query, k).await?;

    let mut dated: Vec<DatedCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match parse_record_date(&candidate.document.date) {
            Some(date) => dated.push(DatedCandidate {
                rank: candidate.rank,
                distance_days: day_distance(date, target),
                date,
                document: candidate.document,
            }),
            None => {
                warn!(
                    date = %candidate.document.date,
                    "skipping candidate with unparseable date"
                );
            }
        }
    }

    if let Some(window) = window_days {
        dated.retain(|c| c.distance_days <= window);
    }

    dated.sort_by(|a, b| {
        a.distance_days
            .cmp(&b.distance_days)
            .then(a.rank.cmp(&b.rank))
    });
    dated.truncate(requested);

    debug!(
        target = %target,
        window = ?window_days,
        kept = dated.len(),
        "date-windowed retrieval complete"
    );

    Ok(dated)
}
