use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::{AppError, AppResult};

/// Keys of cached values; every key is scoped to the index that produced it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Retrieval {
        index_version: String,
        k: usize,
        query: String,
    },
    Search {
        index_version: String,
        k: usize,
        text: String,
    },
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Retrieval {
                index_version,
                k,
                query,
            } => write!(f, "cinemind:retrieve:{}:{}:{}", index_version, k, query.trim()),
            CacheKey::Search {
                index_version,
                k,
                text,
            } => write!(f, "cinemind:search:{}:{}:{}", index_version, k, text.trim()),
        }
    }
}

struct CacheWrite {
    key: String,
    value: String,
    ttl: u64,
}

/// Redis-backed cache; reads are awaited, writes go through a background task
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
    write_tx: mpsc::UnboundedSender<CacheWrite>,
}

/// Stops the background writer after it has drained queued writes
pub struct CacheWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl CacheWriterHandle {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
    }
}

/// Connects to Redis and starts the background writer
pub async fn connect(redis_url: &str) -> AppResult<(Cache, CacheWriterHandle)> {
    let client = redis::Client::open(redis_url)?;
    let conn = ConnectionManager::new(client).await?;

    let (write_tx, write_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

    tokio::spawn(writer_task(conn.clone(), write_rx, shutdown_rx));

    tracing::info!("Connected to Redis result cache");

    Ok((Cache { conn, write_tx }, CacheWriterHandle { shutdown_tx }))
}

async fn writer_task(
    mut conn: ConnectionManager,
    mut write_rx: mpsc::UnboundedReceiver<CacheWrite>,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    loop {
        tokio::select! {
            Some(write) = write_rx.recv() => {
                if let Err(e) = write_one(&mut conn, write).await {
                    tracing::error!(error = %e, "Failed to write to Redis cache");
                }
            }
            _ = shutdown_rx.recv() => {
                write_rx.close();
                let mut flushed = 0usize;
                while let Some(write) = write_rx.recv().await {
                    if let Err(e) = write_one(&mut conn, write).await {
                        tracing::error!(error = %e, "Failed to flush cache write during shutdown");
                    }
                    flushed += 1;
                }
                tracing::info!(flushed, "Cache writer stopped");
                break;
            }
        }
    }
}

async fn write_one(conn: &mut ConnectionManager, write: CacheWrite) -> AppResult<()> {
    let _: () = conn.set_ex(write.key, write.value, write.ttl).await?;
    Ok(())
}

impl Cache {
    /// Looks up and decodes a cached value
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> AppResult<Option<T>> {
        let mut conn = self.conn.clone();
        let cached: Option<String> = conn.get(key.to_string()).await?;

        cached
            .map(|json| {
                serde_json::from_str(&json).map_err(|e| {
                    AppError::Internal(format!("Cache deserialization error: {}", e))
                })
            })
            .transpose()
    }

    /// Queues a value for writing without waiting on Redis
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let value = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let write = CacheWrite {
            key: key.to_string(),
            value,
            ttl,
        };

        if self.write_tx.send(write).is_err() {
            tracing::warn!("Cache writer has stopped, dropping write");
        }
    }
}
