//! Persisted build outputs: the master dataset table and the JSONL corpus.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{AppError, AppResult};
use crate::models::{EmbeddingDocument, MovieRecord};

/// One master dataset row; list columns hold JSON arrays
#[derive(Debug, Serialize, Deserialize)]
struct MasterRow {
    id: i64,
    title: String,
    overview: String,
    year: Option<i32>,
    genres: String,
    cast_top: String,
    director: Option<String>,
    keywords: String,
    vote_average: Option<f64>,
    vote_count: Option<f64>,
    user_rating_mean: Option<f64>,
    user_rating_median: Option<f64>,
    user_rating_count: Option<u64>,
    user_rating_std: Option<f64>,
    weighted_rating: f64,
}

impl TryFrom<&MovieRecord> for MasterRow {
    type Error = AppError;

    fn try_from(movie: &MovieRecord) -> AppResult<Self> {
        Ok(Self {
            id: movie.id,
            title: movie.title.clone(),
            overview: movie.overview.clone(),
            year: movie.year,
            genres: serde_json::to_string(&movie.genres)?,
            cast_top: serde_json::to_string(&movie.cast_top)?,
            director: movie.director.clone(),
            keywords: serde_json::to_string(&movie.keywords)?,
            vote_average: movie.vote_average,
            vote_count: movie.vote_count,
            user_rating_mean: movie.user_rating_mean,
            user_rating_median: movie.user_rating_median,
            user_rating_count: movie.user_rating_count,
            user_rating_std: movie.user_rating_std,
            weighted_rating: movie.weighted_rating,
        })
    }
}

fn decode_list(cell: &str) -> Vec<String> {
    serde_json::from_str(cell).unwrap_or_default()
}

impl From<MasterRow> for MovieRecord {
    fn from(row: MasterRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            overview: row.overview,
            year: row.year,
            genres: decode_list(&row.genres),
            cast_top: decode_list(&row.cast_top),
            director: row.director,
            keywords: decode_list(&row.keywords),
            vote_average: row.vote_average,
            vote_count: row.vote_count,
            user_rating_mean: row.user_rating_mean,
            user_rating_median: row.user_rating_median,
            user_rating_count: row.user_rating_count,
            user_rating_std: row.user_rating_std,
            weighted_rating: row.weighted_rating,
        }
    }
}

pub fn write_master(path: &Path, movies: &[MovieRecord]) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for movie in movies {
        writer.serialize(MasterRow::try_from(movie)?)?;
    }
    writer.flush()?;

    tracing::info!(rows = movies.len(), path = %path.display(), "Saved master dataset");
    Ok(())
}

pub fn read_master(path: &Path) -> AppResult<Vec<MovieRecord>> {
    if !path.is_file() {
        return Err(AppError::Initialization(format!(
            "Master dataset not found: {}",
            path.display()
        )));
    }

    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<MasterRow>()
        .map(|row| Ok(MovieRecord::from(row?)))
        .collect()
}

pub fn write_corpus(path: &Path, documents: &[EmbeddingDocument]) -> AppResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for document in documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    tracing::info!(documents = documents.len(), path = %path.display(), "Saved embedding corpus");
    Ok(())
}

/// Reads the corpus in file order; a corrupt line is reported with its number
pub fn read_corpus(path: &Path) -> AppResult<Vec<EmbeddingDocument>> {
    if !path.is_file() {
        return Err(AppError::Initialization(format!(
            "Embedding corpus not found: {}",
            path.display()
        )));
    }

    let reader = BufReader::new(File::open(path)?);
    let mut documents = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document = serde_json::from_str(&line).map_err(|e| {
            AppError::Initialization(format!(
                "{}:{}: invalid corpus record: {}",
                path.display(),
                index + 1,
                e
            ))
        })?;
        documents.push(document);
    }

    tracing::info!(documents = documents.len(), "Loaded embedding corpus");
    Ok(documents)
}

/// Number of non-empty lines in the corpus file
pub fn count_corpus_lines(path: &Path) -> AppResult<usize> {
    let reader = BufReader::new(File::open(path)?);
    let mut count = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: i64, title: &str) -> MovieRecord {
        MovieRecord {
            id,
            title: title.to_string(),
            overview: "Line one, with a comma\nand a \"quote\".".to_string(),
            year: None,
            genres: vec!["Drama".to_string(), "History".to_string()],
            cast_top: vec![],
            director: None,
            keywords: vec!["1940s".to_string()],
            vote_average: Some(7.9),
            vote_count: Some(4436.0),
            user_rating_mean: Some(4.1),
            user_rating_median: Some(4.0),
            user_rating_count: Some(12),
            user_rating_std: None,
            weighted_rating: 7.71,
        }
    }

    #[test]
    fn test_master_dataset_survives_csv_quoting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("movies_master.csv");
        let movies = vec![record(424, "Schindler's List"), record(13, "Forrest Gump")];

        write_master(&path, &movies).unwrap();
        assert_eq!(read_master(&path).unwrap(), movies);
    }

    #[test]
    fn test_corpus_lines_match_documents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings_corpus.jsonl");
        let documents: Vec<_> = [record(1, "A"), record(2, "B"), record(3, "C")]
            .iter()
            .map(MovieRecord::to_document)
            .collect();

        write_corpus(&path, &documents).unwrap();

        assert_eq!(count_corpus_lines(&path).unwrap(), 3);
        assert_eq!(read_corpus(&path).unwrap(), documents);
    }

    #[test]
    fn test_read_corpus_reports_bad_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("embeddings_corpus.jsonl");
        std::fs::write(&path, "{\"page_content\": \"ok\", \"metadata\": {}}\n{broken\n").unwrap();

        let err = read_corpus(&path).unwrap_err();
        assert!(err.to_string().contains(":2:"));
    }
}
