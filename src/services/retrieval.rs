use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    index::VectorIndex,
    models::{Candidate, ProfileParse, SearchHit, SearchResult},
    services::{providers::EmbeddingProvider, query::query_for},
};

/// Checks a caller-supplied result count
pub fn validate_k(k: i64) -> AppResult<usize> {
    if k <= 0 {
        return Err(AppError::InvalidInput(format!(
            "k must be a positive integer, got {}",
            k
        )));
    }
    usize::try_from(k).map_err(|_| AppError::InvalidInput(format!("k is too large: {}", k)))
}

/// Keeps the first, and therefore closest, hit for each title
pub fn dedup_by_title(hits: Vec<SearchHit>) -> Vec<SearchHit> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.title().to_string()))
        .collect()
}

/// Nearest unique titles for an already formatted query
#[tracing::instrument(skip(index, provider), fields(provider = provider.name()))]
pub async fn retrieve_for_query(
    index: &Arc<VectorIndex>,
    provider: &dyn EmbeddingProvider,
    query: &str,
    k: usize,
) -> AppResult<Vec<Candidate>> {
    if k == 0 {
        return Err(AppError::InvalidInput("k must be at least 1".to_string()));
    }

    let hits = index.search(provider, query, k).await?;
    let total = hits.len();
    let candidates: Vec<Candidate> = dedup_by_title(hits).into_iter().map(Candidate::from).collect();

    tracing::info!(
        k,
        hits = total,
        candidates = candidates.len(),
        "Retrieved candidates"
    );

    Ok(candidates)
}

/// Turns a preference profile into at most `k` ranked, title-unique candidates
///
/// Candidates come back in ascending distance order. An index with no
/// matches yields an empty list.
#[tracing::instrument(skip(index, provider, profile), fields(provider = provider.name()))]
pub async fn retrieve(
    index: &Arc<VectorIndex>,
    provider: &dyn EmbeddingProvider,
    profile: &ProfileParse,
    k: usize,
) -> AppResult<Vec<Candidate>> {
    if let ProfileParse::Parsed(p) = profile {
        if p.is_empty() {
            tracing::debug!("Profile carries no preferences");
        }
    }
    let query = query_for(profile);
    tracing::debug!(query = %query, "Formatted retrieval query");
    retrieve_for_query(index, provider, &query, k).await
}

/// Raw semantic search over the index, without title deduplication
#[tracing::instrument(skip(index, provider), fields(provider = provider.name()))]
pub async fn search_text(
    index: &Arc<VectorIndex>,
    provider: &dyn EmbeddingProvider,
    text: &str,
    k: usize,
) -> AppResult<Vec<SearchResult>> {
    if text.trim().is_empty() {
        return Err(AppError::InvalidInput("search text is empty".to_string()));
    }
    if k == 0 {
        return Err(AppError::InvalidInput("k must be at least 1".to_string()));
    }

    let hits = index.search(provider, text, k).await?;
    Ok(hits.into_iter().map(SearchResult::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BuildOptions;
    use crate::models::{DocumentMetadata, EmbeddingDocument};
    use crate::services::providers::MockEmbeddingProvider;
    use tempfile::TempDir;

    fn hit(title: Option<&str>, distance: f32) -> SearchHit {
        SearchHit {
            document: EmbeddingDocument {
                page_content: String::new(),
                metadata: DocumentMetadata {
                    title: title.map(str::to_string),
                    ..Default::default()
                },
            },
            distance,
        }
    }

    #[test]
    fn test_validate_k() {
        assert_eq!(validate_k(5).unwrap(), 5);
        assert!(matches!(validate_k(0), Err(AppError::InvalidInput(_))));
        assert!(matches!(validate_k(-3), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_dedup_keeps_earlier_occurrence() {
        let hits = vec![
            hit(Some("Hamlet"), 0.1),
            hit(Some("Heat"), 0.2),
            hit(Some("Hamlet"), 0.3),
        ];
        let unique = dedup_by_title(hits);

        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].title(), "Hamlet");
        assert_eq!(unique[0].distance, 0.1);
        assert_eq!(unique[1].title(), "Heat");
    }

    #[test]
    fn test_missing_titles_collapse_to_unknown() {
        let unique = dedup_by_title(vec![hit(None, 0.1), hit(None, 0.2)]);
        assert_eq!(unique.len(), 1);
        assert_eq!(Candidate::from(unique[0].clone()).title, "Unknown");
    }

    async fn small_index(dir: &TempDir) -> Arc<VectorIndex> {
        let mut provider = MockEmbeddingProvider::new();
        provider
            .expect_embed_batch()
            .returning(|texts| Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect()));
        provider.expect_name().return_const("mock");
        provider.expect_model().returning(|| "mock-model".to_string());

        let documents = vec![EmbeddingDocument {
            page_content: "Title: Heat".to_string(),
            metadata: DocumentMetadata {
                title: Some("Heat".to_string()),
                ..Default::default()
            },
        }];
        let index = VectorIndex::build(&provider, &documents, dir.path(), BuildOptions::default())
            .await
            .unwrap();
        Arc::new(index)
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_once_then_surfaces_as_retrieval() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir).await;

        let mut provider = MockEmbeddingProvider::new();
        provider
            .expect_embed_batch()
            .times(2)
            .returning(|_| Err(AppError::Embedding("upstream 503".to_string())));
        provider.expect_name().return_const("mock");

        let err = retrieve_for_query(&index, &provider, "heist thriller", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_rejected_query_surfaces_as_retrieval() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir).await;

        let mut provider = MockEmbeddingProvider::new();
        provider.expect_embed_batch().times(1).returning(|_| {
            Err(AppError::Initialization(
                "Embedding API rejected the request with status 400".to_string(),
            ))
        });
        provider.expect_name().return_const("mock");

        let err = retrieve_for_query(&index, &provider, "heist thriller", 3)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Retrieval(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_search_text_runs_against_shared_index() {
        let dir = TempDir::new().unwrap();
        let index = small_index(&dir).await;

        let mut provider = MockEmbeddingProvider::new();
        provider
            .expect_embed_batch()
            .returning(|_| Ok(vec![vec![1.0, 0.0]]));
        provider.expect_name().return_const("mock");

        let results = search_text(&index, &provider, "heat", 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title, "Heat");
    }
}
