//! Startup fetch of a packaged index archive.

use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use super::store::VECTORS_FILE;
use crate::error::{AppError, AppResult};

/// File whose presence marks an index directory as populated
pub const INDEX_GATE_FILE: &str = VECTORS_FILE;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// Makes sure `index_dir` holds an index, downloading and extracting the
/// archive at `archive_url` when it does not
///
/// A no-op when the gate file is already present. The fetch is attempted
/// twice; any remaining failure is fatal.
pub async fn ensure_index_present(index_dir: &Path, archive_url: Option<&str>) -> AppResult<()> {
    let gate = index_dir.join(INDEX_GATE_FILE);
    if gate.is_file() {
        tracing::debug!(path = %index_dir.display(), "Vector index present");
        return Ok(());
    }

    let url = archive_url.ok_or_else(|| {
        AppError::Initialization(format!(
            "no vector index at {} and INDEX_ARCHIVE_URL is not set",
            index_dir.display()
        ))
    })?;

    tracing::warn!(path = %index_dir.display(), url, "Vector index missing, downloading archive");

    let client = reqwest::Client::builder().timeout(DOWNLOAD_TIMEOUT).build()?;

    if let Err(e) = fetch_and_extract(&client, url, index_dir).await {
        tracing::warn!(error = %e, "Index download failed, retrying once");
        fetch_and_extract(&client, url, index_dir)
            .await
            .map_err(|e| AppError::Initialization(format!("failed to download vector index: {}", e)))?;
    }

    if !gate.is_file() {
        return Err(AppError::Initialization(format!(
            "index archive did not contain {}",
            INDEX_GATE_FILE
        )));
    }

    tracing::info!(path = %index_dir.display(), "Vector index downloaded and extracted");
    Ok(())
}

async fn fetch_and_extract(client: &reqwest::Client, url: &str, index_dir: &Path) -> AppResult<()> {
    let response = client.get(url).send().await?.error_for_status()?;
    let bytes = response.bytes().await?;

    tracing::info!(bytes = bytes.len(), "Downloaded index archive");

    let dir = index_dir.to_path_buf();
    tokio::task::spawn_blocking(move || -> AppResult<()> {
        std::fs::create_dir_all(&dir)?;
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
        archive.extract(&dir)?;
        Ok(())
    })
    .await
    .map_err(|e| AppError::Internal(format!("archive extraction task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn archive_bytes() -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("index.bin", SimpleFileOptions::default()).unwrap();
        writer.write_all(&1.0f32.to_le_bytes()).unwrap();
        writer.start_file("manifest.json", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"{}").unwrap();
        writer.finish().unwrap().into_inner()
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_present_index_skips_download() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(INDEX_GATE_FILE), b"").unwrap();

        ensure_index_present(dir.path(), None).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_index_without_url_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = ensure_index_present(dir.path(), None).await.unwrap_err();
        assert!(matches!(err, AppError::Initialization(_)));
    }

    #[tokio::test]
    async fn test_download_retries_once_then_extracts() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let bytes = archive_bytes();
        let router = Router::new().route(
            "/index.zip",
            get(move || {
                let counter = counter.clone();
                let bytes = bytes.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (StatusCode::SERVICE_UNAVAILABLE, Vec::new())
                    } else {
                        (StatusCode::OK, bytes)
                    }
                }
            }),
        );
        let url = format!("{}/index.zip", serve(router).await);

        let dir = TempDir::new().unwrap();
        let index_dir = dir.path().join("vector_index");
        ensure_index_present(&index_dir, Some(&url)).await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(index_dir.join(INDEX_GATE_FILE).is_file());
        assert!(index_dir.join("manifest.json").is_file());
    }

    #[tokio::test]
    async fn test_download_fails_after_retry() {
        let router = Router::new().route(
            "/index.zip",
            get(|| async { StatusCode::NOT_FOUND }),
        );
        let url = format!("{}/index.zip", serve(router).await);

        let dir = TempDir::new().unwrap();
        let err = ensure_index_present(dir.path(), Some(&url)).await.unwrap_err();
        assert!(err.to_string().contains("failed to download vector index"));
    }

    #[tokio::test]
    async fn test_archive_without_gate_file_is_fatal() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer.start_file("readme.txt", SimpleFileOptions::default()).unwrap();
        writer.write_all(b"nothing here").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let router = Router::new().route("/index.zip", get(move || async move { bytes }));
        let url = format!("{}/index.zip", serve(router).await);

        let dir = TempDir::new().unwrap();
        let err = ensure_index_present(dir.path(), Some(&url)).await.unwrap_err();
        assert!(err.to_string().contains("did not contain index.bin"));
    }
}
