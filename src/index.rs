//! Semantic index over the event corpus.
//!
//! [`SemanticIndex`] embeds every corpus document once at build time and
//! answers nearest-neighbor queries by brute-force cosine similarity,
//! which is plenty for a corpus of historical event rows. [`SharedIndex`]
//! adds lazy single-flight construction: the first caller pays the
//! embedding cost, concurrent first-callers await that same build, and
//! every later caller reuses the completed index read-only.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use crate::corpus;
use crate::embedding::{cosine_similarity, embed_query, EmbeddingProvider};
use crate::error::GenerateError;
use crate::models::{EventRecord, IndexedDocument, RetrievalCandidate};

/// A queryable vector index over indexed documents. Read-only after build.
pub struct SemanticIndex {
    documents: Vec<IndexedDocument>,
    vectors: Vec<Vec<f32>>,
    provider: Arc<dyn EmbeddingProvider>,
}

impl std::fmt::Debug for SemanticIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticIndex")
            .field("documents", &self.documents)
            .field("vectors", &self.vectors)
            .finish_non_exhaustive()
    }
}

impl SemanticIndex {
    /// Build the index by embedding every record's folded document text.
    ///
    /// # Errors
    ///
    /// [`GenerateError::IndexBuild`] if the embedding computation fails.
    /// Not retried at this layer.
    pub async fn build(
        records: &[EventRecord],
        source: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, GenerateError> {
        let documents: Vec<IndexedDocument> = records
            .iter()
            .map(|r| IndexedDocument::from_record(r, source))
            .collect();

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();

        info!(
            documents = documents.len(),
            model = provider.model_name(),
            "building semantic index"
        );

        let vectors = provider
            .embed(&texts)
            .await
            .map_err(|e| GenerateError::IndexBuild(e.to_string()))?;

        if vectors.len() != documents.len() {
            return Err(GenerateError::IndexBuild(format!(
                "embedding count mismatch: {} documents, {} vectors",
                documents.len(),
                vectors.len()
            )));
        }

        Ok(SemanticIndex {
            documents,
            vectors,
            provider,
        })
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Retrieve the `k` nearest documents to a free-text query.
    ///
    /// Nearest-first by cosine similarity; ties broken by corpus insertion
    /// order. `k` must be >= 1.
    ///
    /// # Errors
    ///
    /// [`GenerateError::Retrieval`] if `k` is zero or embedding the query
    /// fails.
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<RetrievalCandidate>, GenerateError> {
        if k == 0 {
            return Err(GenerateError::Retrieval(
                "neighbor count k must be >= 1".to_string(),
            ));
        }

        let query_vec = embed_query(self.provider.as_ref(), query)
            .await
            .map_err(|e| GenerateError::Retrieval(e.to_string()))?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query_vec, v)))
            .collect();

        // Stable sort keeps insertion order for equal similarities.
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .enumerate()
            .map(|(rank, (doc_idx, _))| RetrievalCandidate {
                document: self.documents[doc_idx].clone(),
                rank,
            })
            .collect())
    }
}

/// Lazily built, process-wide shared semantic index.
///
/// Wraps the build in `tokio::sync::OnceCell`: concurrent first callers
/// block on a single build instead of duplicating it. A failed build
/// leaves the cell unset, so a later request may try again; no guard is
/// leaked on the error path.
pub struct SharedIndex {
    cell: OnceCell<Arc<SemanticIndex>>,
}

impl SharedIndex {
    pub fn new() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }

    /// Get the index, building it from the corpus on first use.
    ///
    /// # Errors
    ///
    /// Corpus loading errors ([`GenerateError::CorpusNotFound`],
    /// [`GenerateError::CorpusEmpty`]) and [`GenerateError::IndexBuild`].
    pub async fn get_or_build(
        &self,
        corpus_path: &Path,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Arc<SemanticIndex>, GenerateError> {
        self.cell
            .get_or_try_init(|| async {
                let records = corpus::load_corpus(corpus_path)?;
                let source = corpus_path.display().to_string();
                let index = SemanticIndex::build(&records, &source, provider).await?;
                Ok(Arc::new(index))
            })
            .await
            .cloned()
    }
}

impl Default for SharedIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashProvider;

    fn records() -> Vec<EventRecord> {
        vec![
            EventRecord {
                date: "1789-07-14".to_string(),
                description: "Storming of the Bastille fortress in Paris".to_string(),
                location: Some("Paris".to_string()),
                category: None,
            },
            EventRecord {
                date: "1812-09-07".to_string(),
                description: "Battle of Borodino near Moscow".to_string(),
                location: Some("Borodino".to_string()),
                category: None,
            },
            EventRecord {
                date: "1815-06-18".to_string(),
                description: "Battle of Waterloo ends the Hundred Days".to_string(),
                location: Some("Waterloo".to_string()),
                category: None,
            },
        ]
    }

    #[tokio::test]
    async fn test_build_and_retrieve_nearest_first() {
        let provider = Arc::new(HashProvider::new(256));
        let index = SemanticIndex::build(&records(), "test.csv", provider)
            .await
            .unwrap();
        assert_eq!(index.len(), 3);

        let results = index
            .retrieve("Bastille fortress stormed in Paris", 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
        assert!(results[0].document.content.contains("Bastille"));
        assert_eq!(results[0].rank, 0);
        assert_eq!(results[2].rank, 2);
    }

    #[tokio::test]
    async fn test_retrieve_k_zero_rejected() {
        let provider = Arc::new(HashProvider::new(64));
        let index = SemanticIndex::build(&records(), "test.csv", provider)
            .await
            .unwrap();
        assert!(matches!(
            index.retrieve("anything", 0).await,
            Err(GenerateError::Retrieval(_))
        ));
    }

    #[tokio::test]
    async fn test_retrieve_k_larger_than_corpus() {
        let provider = Arc::new(HashProvider::new(64));
        let index = SemanticIndex::build(&records(), "test.csv", provider)
            .await
            .unwrap();
        let results = index.retrieve("battle", 50).await.unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_shared_index_builds_once_across_concurrent_callers() {
        use std::io::Write;

        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "date,event_description").unwrap();
        writeln!(f, "1789-07-14,Storming of the Bastille").unwrap();
        writeln!(f, "1815-06-18,Battle of Waterloo").unwrap();

        let provider = Arc::new(HashProvider::new(64));
        let shared = Arc::new(SharedIndex::new());

        let mut handles = Vec::new();
        for _ in 0..8 {
            let shared = Arc::clone(&shared);
            let provider: Arc<dyn EmbeddingProvider> = provider.clone();
            let path = f.path().to_path_buf();
            handles.push(tokio::spawn(async move {
                shared.get_or_build(&path, provider).await.unwrap().len()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), 2);
        }

        // One corpus embed pass, no query embeds yet.
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_shared_index_missing_corpus_can_retry() {
        let shared = SharedIndex::new();
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(HashProvider::new(64));

        let err = shared
            .get_or_build(Path::new("/nonexistent/events.csv"), Arc::clone(&provider))
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::CorpusNotFound(_)));

        // The failed build leaves the cell unset; a corpus that now exists
        // is picked up by the next call.
        use std::io::Write;
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "date,event_description").unwrap();
        writeln!(f, "1789-07-14,Storming of the Bastille").unwrap();

        let index = shared.get_or_build(f.path(), provider).await.unwrap();
        assert_eq!(index.len(), 1);
    }
}
