//! On-disk layout of a persisted index directory:
//!
//! - `manifest.json`: format, model, dimension, count, metric, version
//! - `docstore.jsonl`: one document per line, in insertion order
//! - `index.bin`: `count * dimension` little-endian `f32` values
//!
//! The manifest is written last, so a directory without one is an
//! interrupted build.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use uuid::Uuid;

use super::{DistanceMetric, VectorIndex};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::EmbeddingDocument;
use crate::services::providers::{embed_with_retry, EmbeddingProvider};

pub(super) const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
const DOCSTORE_FILE: &str = "docstore.jsonl";
pub(super) const VECTORS_FILE: &str = "index.bin";
const PARTIAL_SUFFIX: &str = "partial";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub provider: String,
    pub model: String,
    pub dimension: usize,
    pub count: usize,
    pub metric: DistanceMetric,
    pub built_at: DateTime<Utc>,
    pub index_version: Uuid,
}

/// Tuning for an index build
#[derive(Debug, Clone, Copy)]
pub struct BuildOptions {
    pub batch_size: usize,
    pub concurrency: usize,
    pub metric: DistanceMetric,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: 256,
            concurrency: 4,
            metric: DistanceMetric::L2,
        }
    }
}

impl From<&Config> for BuildOptions {
    fn from(config: &Config) -> Self {
        Self {
            batch_size: config.embedding_batch_size,
            concurrency: config.embedding_concurrency,
            metric: config.distance_metric,
        }
    }
}

fn partial_path(path: &Path) -> PathBuf {
    path.with_extension(format!(
        "{}.{}",
        path.extension().and_then(|e| e.to_str()).unwrap_or_default(),
        PARTIAL_SUFFIX
    ))
}

/// Moves the finished `.partial` files into place under a fresh manifest
///
/// The previous manifest goes first, so a directory caught between the
/// renames never pairs new data with old metadata.
fn publish(dir: &Path, manifest: &IndexManifest) -> AppResult<()> {
    let manifest_path = dir.join(MANIFEST_FILE);
    if manifest_path.exists() {
        fs::remove_file(&manifest_path)?;
    }

    for name in [VECTORS_FILE, DOCSTORE_FILE] {
        let path = dir.join(name);
        fs::rename(partial_path(&path), &path)?;
    }

    fs::write(&manifest_path, serde_json::to_vec_pretty(manifest)?)?;
    Ok(())
}

fn index_error(path: &Path, detail: impl std::fmt::Display) -> AppError {
    AppError::Index(format!("{}: {}", path.display(), detail))
}

impl VectorIndex {
    /// Embeds every document and persists the index to `dir`
    ///
    /// Batches are embedded concurrently but written in input order, each
    /// straight to disk, then the finished directory is loaded back. Any
    /// batch that still fails after its retry aborts the build and leaves the
    /// previous index, if any, untouched.
    pub async fn build(
        provider: &dyn EmbeddingProvider,
        documents: &[EmbeddingDocument],
        dir: &Path,
        options: BuildOptions,
    ) -> AppResult<VectorIndex> {
        if documents.is_empty() {
            return Err(AppError::InvalidInput(
                "cannot build an index from an empty corpus".to_string(),
            ));
        }

        let start = Instant::now();
        let batch_size = options.batch_size.max(1);
        let total_batches = documents.len().div_ceil(batch_size);
        fs::create_dir_all(dir)?;

        tracing::info!(
            documents = documents.len(),
            batches = total_batches,
            batch_size,
            concurrency = options.concurrency,
            provider = provider.name(),
            "Building vector index"
        );

        let vectors_partial = partial_path(&dir.join(VECTORS_FILE));
        let mut writer = BufWriter::new(File::create(&vectors_partial)?);

        let mut batches = stream::iter(documents.chunks(batch_size))
            .map(|chunk| async move {
                let texts: Vec<String> = chunk.iter().map(|d| d.page_content.clone()).collect();
                embed_with_retry(provider, &texts).await
            })
            .buffered(options.concurrency.max(1));

        let mut dimension: Option<usize> = None;
        let mut written = 0usize;
        let mut batch_number = 0usize;

        while let Some(result) = batches.next().await {
            batch_number += 1;
            let vectors = result.map_err(|e| {
                tracing::error!(batch = batch_number, error = %e, "Embedding batch failed");
                e
            })?;

            for vector in &vectors {
                let expected = *dimension.get_or_insert(vector.len());
                if expected == 0 || vector.len() != expected {
                    return Err(AppError::Embedding(format!(
                        "batch {} returned a vector of dimension {}, expected {}",
                        batch_number,
                        vector.len(),
                        expected
                    )));
                }
                for value in vector {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }
            written += vectors.len();

            tracing::info!(
                batch = batch_number,
                of = total_batches,
                embedded = written,
                "Embedded batch"
            );
        }
        writer.flush()?;
        drop(writer);

        write_docstore(&partial_path(&dir.join(DOCSTORE_FILE)), documents)?;

        let manifest = IndexManifest {
            format_version: FORMAT_VERSION,
            provider: provider.name().to_string(),
            model: provider.model(),
            dimension: dimension.unwrap_or_default(),
            count: written,
            metric: options.metric,
            built_at: Utc::now(),
            index_version: Uuid::new_v4(),
        };

        publish(dir, &manifest)?;

        tracing::info!(
            documents = manifest.count,
            dimension = manifest.dimension,
            index_version = %manifest.index_version,
            elapsed_ms = start.elapsed().as_millis() as u64,
            path = %dir.display(),
            "Vector index saved"
        );

        Self::load(dir)
    }

    /// Loads a persisted index, failing on anything but a complete artifact
    pub fn load(dir: &Path) -> AppResult<VectorIndex> {
        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.is_file() {
            return Err(index_error(dir, "no index manifest found"));
        }

        let manifest: IndexManifest = serde_json::from_slice(&fs::read(&manifest_path)?)
            .map_err(|e| index_error(&manifest_path, e))?;

        if manifest.format_version != FORMAT_VERSION {
            return Err(index_error(
                &manifest_path,
                format!("unsupported format version {}", manifest.format_version),
            ));
        }
        if manifest.count == 0 || manifest.dimension == 0 {
            return Err(index_error(&manifest_path, "index is empty"));
        }

        let documents = read_docstore(&dir.join(DOCSTORE_FILE))?;
        if documents.len() != manifest.count {
            return Err(index_error(
                dir,
                format!(
                    "docstore holds {} documents, manifest declares {}",
                    documents.len(),
                    manifest.count
                ),
            ));
        }

        let vectors_path = dir.join(VECTORS_FILE);
        let bytes = fs::read(&vectors_path).map_err(|e| index_error(&vectors_path, e))?;
        let expected_bytes = manifest.count * manifest.dimension * std::mem::size_of::<f32>();
        if bytes.len() != expected_bytes {
            return Err(index_error(
                &vectors_path,
                format!("expected {} bytes, found {}", expected_bytes, bytes.len()),
            ));
        }

        let vectors: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();

        tracing::info!(
            documents = manifest.count,
            dimension = manifest.dimension,
            metric = ?manifest.metric,
            model = %manifest.model,
            index_version = %manifest.index_version,
            "Vector index loaded"
        );

        Ok(VectorIndex {
            manifest,
            documents,
            vectors,
        })
    }
}

fn write_docstore(path: &Path, documents: &[EmbeddingDocument]) -> AppResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for document in documents {
        serde_json::to_writer(&mut writer, document)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn read_docstore(path: &Path) -> AppResult<Vec<EmbeddingDocument>> {
    let file = File::open(path).map_err(|e| index_error(path, e))?;
    let mut documents = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let document = serde_json::from_str(&line)
            .map_err(|e| index_error(path, format!("line {}: {}", index + 1, e)))?;
        documents.push(document);
    }
    Ok(documents)
}
