use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::sources::{self, Credits, SourceMovie};
use super::stats::{aggregate_ratings, RatingPrior, RatingStats};
use super::{artifacts, CORPUS_FILE, CREDITS_FILE, KEYWORDS_FILE, MASTER_FILE, MOVIES_FILE, RATINGS_FILE};
use crate::error::AppResult;
use crate::models::MovieRecord;

/// Result of a full corpus build
#[derive(Debug, Clone)]
pub struct CorpusBuild {
    pub movies: Vec<MovieRecord>,
    pub prior: RatingPrior,
    pub master_path: PathBuf,
    pub corpus_path: PathBuf,
}

/// Joins the raw sources in `data_dir` and writes the master dataset and
/// embedding corpus next to them
pub fn build_corpus(data_dir: &Path) -> AppResult<CorpusBuild> {
    let start = Instant::now();

    let movies_path = data_dir.join(MOVIES_FILE);
    let ratings_path = data_dir.join(RATINGS_FILE);
    let credits_path = data_dir.join(CREDITS_FILE);
    let keywords_path = data_dir.join(KEYWORDS_FILE);

    // All inputs must exist before any work starts
    for path in [&movies_path, &ratings_path, &credits_path, &keywords_path] {
        sources::require_file(path)?;
    }

    let movies = sources::load_movies(&movies_path)?;
    let ratings = aggregate_ratings(sources::load_ratings(&ratings_path)?);
    let credits = sources::load_credits(&credits_path)?;
    let keywords = sources::load_keywords(&keywords_path)?;

    let (records, prior) = join_sources(movies, &ratings, &credits, &keywords);

    tracing::info!(
        movies = records.len(),
        mean_vote = prior.mean_vote,
        min_votes = prior.min_votes,
        "Cleaned dataset"
    );

    let master_path = data_dir.join(MASTER_FILE);
    artifacts::write_master(&master_path, &records)?;

    let corpus_path = data_dir.join(CORPUS_FILE);
    let documents: Vec<_> = records.iter().map(MovieRecord::to_document).collect();
    artifacts::write_corpus(&corpus_path, &documents)?;

    tracing::info!(
        master = %master_path.display(),
        corpus = %corpus_path.display(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Corpus build completed"
    );

    Ok(CorpusBuild {
        movies: records,
        prior,
        master_path,
        corpus_path,
    })
}

/// Left-joins ratings, credits and keywords onto the movie rows, scores every
/// row, then keeps the first row per id that has both a title and an overview
///
/// The rating prior is computed over all joined rows before deduplication and
/// stays fixed for this build.
pub fn join_sources(
    movies: Vec<SourceMovie>,
    ratings: &HashMap<i64, RatingStats>,
    credits: &HashMap<i64, Credits>,
    keywords: &HashMap<i64, Vec<String>>,
) -> (Vec<MovieRecord>, RatingPrior) {
    let vote_averages: Vec<f64> = movies.iter().filter_map(|m| m.vote_average).collect();
    let vote_counts: Vec<f64> = movies.iter().filter_map(|m| m.vote_count).collect();
    let prior = RatingPrior::from_votes(&vote_averages, &vote_counts);

    let mut seen_ids = HashSet::new();
    let mut records = Vec::with_capacity(movies.len());
    let mut dropped_duplicates = 0usize;
    let mut dropped_incomplete = 0usize;

    for movie in movies {
        if !seen_ids.insert(movie.id) {
            dropped_duplicates += 1;
            continue;
        }

        let (Some(title), Some(overview)) = (movie.title, movie.overview) else {
            dropped_incomplete += 1;
            continue;
        };

        let stats = ratings.get(&movie.id);
        let movie_credits = credits.get(&movie.id).cloned().unwrap_or_default();
        let weighted_rating = prior.weighted_rating(
            movie.vote_count.unwrap_or(0.0),
            movie.vote_average.unwrap_or(prior.mean_vote),
        );

        records.push(MovieRecord {
            id: movie.id,
            title,
            overview,
            year: movie.year,
            genres: movie.genres,
            cast_top: movie_credits.cast_top,
            director: movie_credits.director,
            keywords: keywords.get(&movie.id).cloned().unwrap_or_default(),
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            user_rating_mean: stats.map(|s| s.mean),
            user_rating_median: stats.map(|s| s.median),
            user_rating_count: stats.map(|s| s.count),
            user_rating_std: stats.and_then(|s| s.std),
            weighted_rating,
        });
    }

    tracing::info!(
        kept = records.len(),
        dropped_duplicates,
        dropped_incomplete,
        "Deduplicated movie rows"
    );

    (records, prior)
}
