/// Text embedding provider abstraction
///
/// The index and the retrieval path only ever talk to this trait, so the
/// hosted embedding API can be swapped for a local model or a test double.
use crate::error::{AppError, AppResult};

pub mod openai;

pub use openai::OpenAiEmbeddings;

/// Trait for text embedding providers
///
/// Implementations must return exactly one vector per input text, in input
/// order, all of the same dimension.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Embedding model identifier, recorded in the index manifest
    fn model(&self) -> String;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

async fn embed_once(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> AppResult<Vec<Vec<f32>>> {
    let vectors = provider.embed_batch(texts).await?;
    if vectors.len() != texts.len() {
        return Err(AppError::Embedding(format!(
            "{} returned {} vectors for {} texts",
            provider.name(),
            vectors.len(),
            texts.len()
        )));
    }
    Ok(vectors)
}

/// Embeds `texts`, repeating the call once if the first attempt fails with a
/// transient error
pub async fn embed_with_retry(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> AppResult<Vec<Vec<f32>>> {
    match embed_once(provider, texts).await {
        Ok(vectors) => Ok(vectors),
        Err(e) if e.is_transient() => {
            tracing::warn!(
                provider = provider.name(),
                error = %e,
                batch = texts.len(),
                "Embedding call failed, retrying once"
            );
            embed_once(provider, texts).await
        }
        Err(e) => Err(e),
    }
}
