use serde::{Deserialize, Serialize};

use super::movie::{round_to, EmbeddingDocument};

const UNKNOWN_TITLE: &str = "Unknown";

/// A single nearest-neighbor match, closest first when returned in a list
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub document: EmbeddingDocument,
    /// Vector distance to the query; smaller is closer
    pub distance: f32,
}

/// A ranked, deduplicated retrieval result handed to downstream curation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    /// Weighted rating, two decimals
    pub rating: f64,
    /// Distance to the query, three decimals
    pub score: f64,
}

impl SearchHit {
    /// Title used for deduplication, `"Unknown"` when the metadata has none
    pub fn title(&self) -> &str {
        self.document
            .metadata
            .title
            .as_deref()
            .unwrap_or(UNKNOWN_TITLE)
    }
}

impl From<SearchHit> for Candidate {
    fn from(hit: SearchHit) -> Self {
        let title = hit.title().to_string();
        let metadata = hit.document.metadata;

        Candidate {
            title,
            year: metadata.year,
            genres: metadata.genres,
            director: metadata.director,
            rating: round_to(metadata.rating.unwrap_or(0.0), 2),
            score: round_to(hit.distance as f64, 3),
        }
    }
}

/// A raw search hit as shown by the search endpoint and CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub director: Option<String>,
    pub rating: Option<f64>,
    pub score: f64,
    pub snippet: String,
}

const SNIPPET_CHARS: usize = 250;

impl From<SearchHit> for SearchResult {
    fn from(hit: SearchHit) -> Self {
        let title = hit.title().to_string();
        let EmbeddingDocument {
            page_content,
            metadata,
        } = hit.document;
        let snippet = page_content.chars().take(SNIPPET_CHARS).collect();

        SearchResult {
            title,
            year: metadata.year,
            genres: metadata.genres,
            director: metadata.director,
            rating: metadata.rating,
            score: round_to(hit.distance as f64, 3),
            snippet,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn hit(metadata: DocumentMetadata, distance: f32) -> SearchHit {
        SearchHit {
            document: EmbeddingDocument {
                page_content: "Title: Amélie (2001)".to_string(),
                metadata,
            },
            distance,
        }
    }

    #[test]
    fn test_candidate_rounds_rating_and_score() {
        let candidate = Candidate::from(hit(
            DocumentMetadata {
                title: Some("Amélie".to_string()),
                year: Some(2001),
                genres: vec!["Comedy".to_string(), "Romance".to_string()],
                director: Some("Jean-Pierre Jeunet".to_string()),
                rating: Some(7.6789),
                vote_count: Some(3403.0),
            },
            0.41237,
        ));

        assert_eq!(candidate.title, "Amélie");
        assert_eq!(candidate.rating, 7.68);
        assert_eq!(candidate.score, 0.412);
        assert_eq!(candidate.year, Some(2001));
    }

    #[test]
    fn test_candidate_defaults_for_missing_metadata() {
        let candidate = Candidate::from(hit(DocumentMetadata::default(), 1.0));
        assert_eq!(candidate.title, "Unknown");
        assert_eq!(candidate.rating, 0.0);
        assert_eq!(candidate.year, None);
        assert!(candidate.genres.is_empty());
    }

    #[test]
    fn test_search_result_snippet() {
        let result = SearchResult::from(hit(DocumentMetadata::default(), 0.5));
        assert_eq!(result.snippet, "Title: Amélie (2001)");
        assert_eq!(result.rating, None);
    }
}
