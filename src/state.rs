use std::sync::Arc;

use crate::{
    cache::{self, Cache, CacheWriterHandle},
    config::Config,
    error::{AppError, AppResult},
    index::{ensure_index_present, VectorIndex},
    services::providers::{EmbeddingProvider, OpenAiEmbeddings},
};

/// Shared application state, built once before the server starts
///
/// The index is immutable after load, so handlers share it without locking.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub index: Arc<VectorIndex>,
    pub provider: Arc<dyn EmbeddingProvider>,
    pub cache: Option<Cache>,
}

impl AppState {
    pub fn new(
        config: Config,
        index: VectorIndex,
        provider: Arc<dyn EmbeddingProvider>,
        cache: Option<Cache>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            index: Arc::new(index),
            provider,
            cache,
        }
    }

    /// Fetches the index if needed, loads it, and connects the provider and cache
    ///
    /// Any failure here is fatal for the service. An unreachable Redis only
    /// disables caching.
    pub async fn initialize(config: Config) -> AppResult<(Self, Option<CacheWriterHandle>)> {
        let provider: Arc<dyn EmbeddingProvider> = Arc::new(OpenAiEmbeddings::from_config(&config)?);

        ensure_index_present(&config.index_dir, config.index_archive_url.as_deref()).await?;

        let index_dir = config.index_dir.clone();
        let index = tokio::task::spawn_blocking(move || VectorIndex::load(&index_dir))
            .await
            .map_err(|e| AppError::Internal(format!("index load task failed: {}", e)))??;

        check_model(&index, provider.as_ref())?;

        let (cache, writer) = match config.redis_url.as_deref() {
            Some(url) => match cache::connect(url).await {
                Ok((cache, writer)) => (Some(cache), Some(writer)),
                Err(e) => {
                    tracing::warn!(error = %e, "Redis unavailable, result caching disabled");
                    (None, None)
                }
            },
            None => (None, None),
        };

        Ok((Self::new(config, index, provider, cache), writer))
    }
}

/// Query vectors only make sense against an index embedded by the same model
fn check_model(index: &VectorIndex, provider: &dyn EmbeddingProvider) -> AppResult<()> {
    let index_model = &index.manifest().model;
    let provider_model = provider.model();
    if *index_model != provider_model {
        tracing::error!(
            index_model = %index_model,
            provider_model = %provider_model,
            "Index was built with a different embedding model"
        );
        return Err(AppError::Initialization(format!(
            "index was built with model {}, but the provider is configured for {}",
            index_model, provider_model
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::BuildOptions;
    use crate::models::{DocumentMetadata, EmbeddingDocument};
    use crate::services::providers::MockEmbeddingProvider;
    use tempfile::TempDir;

    fn provider_for(model: &'static str) -> MockEmbeddingProvider {
        let mut provider = MockEmbeddingProvider::new();
        provider
            .expect_embed_batch()
            .returning(|texts| Ok(texts.iter().map(|_| vec![0.5, 0.5]).collect()));
        provider.expect_name().return_const("mock");
        provider.expect_model().returning(move || model.to_string());
        provider
    }

    async fn index_built_with(dir: &TempDir, model: &'static str) -> VectorIndex {
        let documents = vec![EmbeddingDocument {
            page_content: "Title: Alien".to_string(),
            metadata: DocumentMetadata::default(),
        }];
        VectorIndex::build(&provider_for(model), &documents, dir.path(), BuildOptions::default())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_matching_model_is_accepted() {
        let dir = TempDir::new().unwrap();
        let index = index_built_with(&dir, "text-embedding-3-large").await;

        assert!(check_model(&index, &provider_for("text-embedding-3-large")).is_ok());
    }

    #[tokio::test]
    async fn test_model_mismatch_is_fatal() {
        let dir = TempDir::new().unwrap();
        let index = index_built_with(&dir, "text-embedding-3-large").await;

        let err = check_model(&index, &provider_for("text-embedding-3-small")).unwrap_err();
        assert!(matches!(err, AppError::Initialization(_)));
        assert!(err.to_string().contains("text-embedding-3-small"));
    }
}
