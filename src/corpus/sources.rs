//! Readers for the four raw CSV inputs.
//!
//! Rows that cannot be decoded at all are skipped and counted; cells inside a
//! decoded row are kept as text and interpreted later.

use chrono::{Datelike, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use super::parse::{extract_cast, extract_director, parse_named_list};
use crate::error::{AppError, AppResult};

/// Movie metadata row as read from `movies_metadata.csv`
#[derive(Debug, Clone, Deserialize)]
pub struct RawMovie {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<String>,
    #[serde(default)]
    pub vote_count: Option<String>,
    #[serde(default)]
    pub genres: Option<String>,
}

/// Movie row after id coercion and cell parsing
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMovie {
    pub id: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub year: Option<i32>,
    pub vote_average: Option<f64>,
    pub vote_count: Option<f64>,
    pub genres: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawRating {
    #[serde(rename = "movieId")]
    movie_id: i64,
    rating: f64,
}

#[derive(Debug, Deserialize)]
struct RawCredits {
    #[serde(default)]
    cast: Option<String>,
    #[serde(default)]
    crew: Option<String>,
    id: i64,
}

#[derive(Debug, Deserialize)]
struct RawKeywords {
    id: i64,
    #[serde(default)]
    keywords: Option<String>,
}

/// Cast and director for one movie
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Credits {
    pub cast_top: Vec<String>,
    pub director: Option<String>,
}

/// Fails fast when a required input is absent
pub fn require_file(path: &Path) -> AppResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(AppError::Initialization(format!(
            "Required source file not found: {}",
            path.display()
        )))
    }
}

/// Reads every decodable row of a CSV file, logging how many were skipped
fn read_rows<T: DeserializeOwned>(path: &Path) -> AppResult<Vec<T>> {
    require_file(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in reader.deserialize::<T>() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                tracing::debug!(error = %e, file = %path.display(), "Skipping undecodable row");
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(
            file = %path.display(),
            skipped,
            kept = rows.len(),
            "Some rows could not be decoded"
        );
    }

    Ok(rows)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_number(value: Option<&str>) -> Option<f64> {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Release year from an ISO date, falling back to a leading four-digit year
pub fn parse_year(release_date: &str) -> Option<i32> {
    let trimmed = release_date.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.year());
    }
    trimmed
        .get(..4)
        .filter(|prefix| prefix.chars().all(|c| c.is_ascii_digit()))
        .and_then(|prefix| prefix.parse().ok())
}

impl RawMovie {
    /// Coerces the id to an integer; rows without a numeric id are dropped
    pub fn into_source(self) -> Option<SourceMovie> {
        let id = self.id.as_deref()?.trim().parse::<i64>().ok()?;

        Some(SourceMovie {
            id,
            year: self.release_date.as_deref().and_then(parse_year),
            vote_average: parse_number(self.vote_average.as_deref()),
            vote_count: parse_number(self.vote_count.as_deref()),
            genres: self
                .genres
                .as_deref()
                .map(parse_named_list)
                .unwrap_or_default(),
            title: non_empty(self.title),
            overview: non_empty(self.overview),
        })
    }
}

pub fn load_movies(path: &Path) -> AppResult<Vec<SourceMovie>> {
    let raw: Vec<RawMovie> = read_rows(path)?;
    let total = raw.len();
    let movies: Vec<SourceMovie> = raw.into_iter().filter_map(RawMovie::into_source).collect();

    tracing::info!(
        rows = total,
        valid_ids = movies.len(),
        "Loaded movie metadata"
    );

    Ok(movies)
}

pub fn load_ratings(path: &Path) -> AppResult<Vec<(i64, f64)>> {
    let rows: Vec<RawRating> = read_rows(path)?;
    tracing::info!(rows = rows.len(), "Loaded ratings");
    Ok(rows.into_iter().map(|r| (r.movie_id, r.rating)).collect())
}

/// Credits keyed by movie id; the first row for an id wins
pub fn load_credits(path: &Path) -> AppResult<HashMap<i64, Credits>> {
    let rows: Vec<RawCredits> = read_rows(path)?;
    tracing::info!(rows = rows.len(), "Loaded credits");

    let mut credits = HashMap::with_capacity(rows.len());
    for row in rows {
        credits.entry(row.id).or_insert_with(|| Credits {
            cast_top: row.cast.as_deref().map(extract_cast).unwrap_or_default(),
            director: row.crew.as_deref().and_then(extract_director),
        });
    }
    Ok(credits)
}

/// Keywords keyed by movie id; the first row for an id wins
pub fn load_keywords(path: &Path) -> AppResult<HashMap<i64, Vec<String>>> {
    let rows: Vec<RawKeywords> = read_rows(path)?;
    tracing::info!(rows = rows.len(), "Loaded keywords");

    let mut keywords = HashMap::with_capacity(rows.len());
    for row in rows {
        keywords
            .entry(row.id)
            .or_insert_with(|| row.keywords.as_deref().map(parse_named_list).unwrap_or_default());
    }
    Ok(keywords)
}
