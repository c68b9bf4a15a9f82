use crate::{
    cache::CacheKey,
    cached,
    error::AppResult,
    models::{Candidate, ProfileParse, SearchResult},
    services::{query::query_for, retrieval},
    state::AppState,
};

/// Ranked candidates for a profile, served from the result cache when possible
///
/// Cached entries are keyed by the index version, `k` and the formatted query,
/// so a rebuilt index never serves stale candidates.
pub async fn get_recommendations(
    state: &AppState,
    profile: &ProfileParse,
    k: usize,
) -> AppResult<Vec<Candidate>> {
    let query = query_for(profile);
    let provider = state.provider.as_ref();

    let Some(cache) = &state.cache else {
        return retrieval::retrieve_for_query(&state.index, provider, &query, k).await;
    };

    let key = CacheKey::Retrieval {
        index_version: state.index.version(),
        k,
        query: query.clone(),
    };

    cached!(cache, key, state.config.retrieval_cache_ttl, async {
        retrieval::retrieve_for_query(&state.index, provider, &query, k).await
    })
}

/// Raw nearest-neighbor search with the same caching policy
pub async fn search(state: &AppState, text: &str, k: usize) -> AppResult<Vec<SearchResult>> {
    let provider = state.provider.as_ref();

    let Some(cache) = &state.cache else {
        return retrieval::search_text(&state.index, provider, text, k).await;
    };

    let key = CacheKey::Search {
        index_version: state.index.version(),
        k,
        text: text.to_string(),
    };

    cached!(cache, key, state.config.retrieval_cache_ttl, async {
        retrieval::search_text(&state.index, provider, text, k).await
    })
}
