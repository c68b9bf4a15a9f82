use serde::{Deserialize, Deserializer, Serialize};

/// One row of the master dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRecord {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub cast_top: Vec<String>,
    pub director: Option<String>,
    pub keywords: Vec<String>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub user_rating_mean: Option<f64>,
    pub user_rating_median: Option<f64>,
    pub user_rating_count: Option<u64>,
    pub user_rating_std: Option<f64>,
    pub weighted_rating: f64,
}

/// Display and ranking fields carried alongside each embedded document
///
/// Every field is optional on the way in so that a document written by an
/// older build still loads; gaps surface as defaults on the candidate.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_year")]
    pub year: Option<i32>,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub director: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<f64>,
}

/// A rendered movie document, one line of the embedding corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingDocument {
    pub page_content: String,
    pub metadata: DocumentMetadata,
}

/// Accepts years written as integers or as floats (`1995.0`)
fn lenient_year<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|y| y.is_finite()).map(|y| y as i32))
}

impl MovieRecord {
    /// Renders the fixed-layout text block that gets embedded for this movie
    pub fn render_page_content(&self) -> String {
        let year = self
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        format!(
            "Title: {} ({})\nGenres: {}\nDirector: {}\nCast: {}\nKeywords: {}\nRating: {}\nOverview: {}",
            self.title,
            year,
            self.genres.join(", "),
            self.director.as_deref().unwrap_or("Unknown"),
            self.cast_top.join(", "),
            self.keywords.join(", "),
            round_to(self.weighted_rating, 2),
            self.overview,
        )
    }

    pub fn to_document(&self) -> EmbeddingDocument {
        EmbeddingDocument {
            page_content: self.render_page_content(),
            metadata: DocumentMetadata {
                title: Some(self.title.clone()),
                year: self.year,
                genres: self.genres.clone(),
                director: self.director.clone(),
                rating: Some(self.weighted_rating),
                vote_count: self.vote_count,
            },
        }
    }
}

/// Rounds half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn heat() -> MovieRecord {
        MovieRecord {
            id: 949,
            title: "Heat".to_string(),
            overview: "Obsessive master thief Neil McCauley leads a crew.".to_string(),
            year: Some(1995),
            genres: vec!["Action".to_string(), "Crime".to_string()],
            cast_top: vec!["Al Pacino".to_string(), "Robert De Niro".to_string()],
            director: Some("Michael Mann".to_string()),
            keywords: vec!["robbery".to_string()],
            vote_average: Some(7.7),
            vote_count: Some(1886.0),
            user_rating_mean: None,
            user_rating_median: None,
            user_rating_count: None,
            user_rating_std: None,
            weighted_rating: 7.5412,
        }
    }

    #[test]
    fn test_render_page_content_layout() {
        let text = heat().render_page_content();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Title: Heat (1995)");
        assert_eq!(lines[1], "Genres: Action, Crime");
        assert_eq!(lines[2], "Director: Michael Mann");
        assert_eq!(lines[3], "Cast: Al Pacino, Robert De Niro");
        assert_eq!(lines[4], "Keywords: robbery");
        assert_eq!(lines[5], "Rating: 7.54");
        assert!(lines[6].starts_with("Overview: Obsessive"));
    }

    #[test]
    fn test_render_page_content_missing_fields() {
        let mut movie = heat();
        movie.year = None;
        movie.director = None;
        movie.genres.clear();
        let text = movie.render_page_content();
        assert!(text.starts_with("Title: Heat (Unknown)\nGenres: \nDirector: Unknown\n"));
    }

    #[test]
    fn test_to_document_metadata() {
        let doc = heat().to_document();
        assert_eq!(doc.metadata.title.as_deref(), Some("Heat"));
        assert_eq!(doc.metadata.year, Some(1995));
        assert_eq!(doc.metadata.rating, Some(7.5412));
        assert_eq!(doc.metadata.vote_count, Some(1886.0));
    }

    #[test]
    fn test_metadata_accepts_float_year_and_missing_fields() {
        let meta: DocumentMetadata =
            serde_json::from_str(r#"{"title": "Heat", "year": 1995.0}"#).unwrap();
        assert_eq!(meta.year, Some(1995));
        assert!(meta.genres.is_empty());
        assert_eq!(meta.rating, None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(7.546, 2), 7.55);
        assert_eq!(round_to(0.12345, 3), 0.123);
    }
}
