//! Sanity checks over a built master dataset and its embedding corpus.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use super::{artifacts, CORPUS_FILE, MASTER_FILE};
use crate::error::AppResult;
use crate::models::MovieRecord;

/// Count, mean and range of one numeric column, ignoring missing values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
}

impl ColumnSummary {
    fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for value in values.into_iter().filter(|v| v.is_finite()) {
            count += 1;
            sum += value;
            min = min.min(value);
            max = max.max(value);
        }
        (count > 0).then(|| Self {
            count,
            mean: sum / count as f64,
            min,
            max,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub rows: usize,
    pub duplicate_ids: usize,
    pub duplicate_titles: usize,
    pub missing_year: usize,
    pub missing_overview: usize,
    pub missing_director: usize,
    pub missing_user_ratings: usize,
    /// Mean number of genres per movie
    pub mean_genres: f64,
    /// Share of movies with a director, in `[0, 1]`
    pub director_coverage: f64,
    pub vote_average: Option<ColumnSummary>,
    pub vote_count: Option<ColumnSummary>,
    pub weighted_rating: Option<ColumnSummary>,
    pub user_rating_mean: Option<ColumnSummary>,
    pub corpus_lines: usize,
}

impl ValidationReport {
    pub fn from_records(movies: &[MovieRecord], corpus_lines: usize) -> Self {
        let rows = movies.len();

        let mut ids = HashSet::new();
        let mut titles = HashSet::new();
        let duplicate_ids = movies.iter().filter(|m| !ids.insert(m.id)).count();
        let duplicate_titles = movies
            .iter()
            .filter(|m| !titles.insert(m.title.as_str()))
            .count();

        let missing_director = movies.iter().filter(|m| m.director.is_none()).count();
        let ratio = |part: usize| if rows == 0 { 0.0 } else { part as f64 / rows as f64 };
        let genre_total: usize = movies.iter().map(|m| m.genres.len()).sum();

        Self {
            rows,
            duplicate_ids,
            duplicate_titles,
            missing_year: movies.iter().filter(|m| m.year.is_none()).count(),
            missing_overview: movies
                .iter()
                .filter(|m| m.overview.trim().is_empty())
                .count(),
            missing_director,
            missing_user_ratings: movies
                .iter()
                .filter(|m| m.user_rating_mean.is_none())
                .count(),
            mean_genres: ratio(genre_total),
            director_coverage: 1.0 - ratio(missing_director),
            vote_average: ColumnSummary::from_values(movies.iter().filter_map(|m| m.vote_average)),
            vote_count: ColumnSummary::from_values(movies.iter().filter_map(|m| m.vote_count)),
            weighted_rating: ColumnSummary::from_values(movies.iter().map(|m| m.weighted_rating)),
            user_rating_mean: ColumnSummary::from_values(
                movies.iter().filter_map(|m| m.user_rating_mean),
            ),
            corpus_lines,
        }
    }

    /// Whether the corpus holds exactly one document per master row
    pub fn is_aligned(&self) -> bool {
        self.corpus_lines == self.rows
    }
}

/// Loads both artifacts from `data_dir` and reports on them
///
/// A corpus/master size mismatch is logged as a warning; only unreadable
/// artifacts are errors.
pub fn validate_dataset(data_dir: &Path) -> AppResult<ValidationReport> {
    let movies = artifacts::read_master(&data_dir.join(MASTER_FILE))?;
    let corpus_lines = artifacts::count_corpus_lines(&data_dir.join(CORPUS_FILE))?;
    let report = ValidationReport::from_records(&movies, corpus_lines);

    if report.is_aligned() {
        tracing::info!(records = report.rows, "Embedding corpus aligned with master dataset");
    } else {
        tracing::warn!(
            corpus_lines = report.corpus_lines,
            master_rows = report.rows,
            "Corpus size mismatch"
        );
    }
    if report.duplicate_ids > 0 {
        tracing::warn!(duplicate_ids = report.duplicate_ids, "Master dataset has duplicate ids");
    }

    Ok(report)
}

fn write_summary(f: &mut fmt::Formatter<'_>, name: &str, summary: &Option<ColumnSummary>) -> fmt::Result {
    match summary {
        Some(s) => writeln!(
            f,
            "  {:<18} count={:<6} mean={:<8.2} min={:<8.2} max={:.2}",
            name, s.count, s.mean, s.min, s.max
        ),
        None => writeln!(f, "  {:<18} no values", name),
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Master dataset: {} rows", self.rows)?;
        writeln!(f, "Duplicate movie ids: {}", self.duplicate_ids)?;
        writeln!(f, "Duplicate movie titles: {}", self.duplicate_titles)?;
        writeln!(
            f,
            "Missing values: year={} overview={} director={} user_ratings={}",
            self.missing_year, self.missing_overview, self.missing_director, self.missing_user_ratings
        )?;
        writeln!(f, "Rating distribution:")?;
        write_summary(f, "vote_average", &self.vote_average)?;
        write_summary(f, "vote_count", &self.vote_count)?;
        write_summary(f, "weighted_rating", &self.weighted_rating)?;
        write_summary(f, "user_rating_mean", &self.user_rating_mean)?;
        writeln!(f, "Average genres per movie: {:.2}", self.mean_genres)?;
        writeln!(f, "Director coverage: {:.1}%", self.director_coverage * 100.0)?;
        if self.is_aligned() {
            write!(f, "Corpus alignment OK: {} records", self.corpus_lines)
        } else {
            write!(
                f,
                "Corpus size mismatch: {} lines vs {} rows",
                self.corpus_lines, self.rows
            )
        }
    }
}
