use axum::{
    extract::{Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::SearchResult,
    services::{recommendations, retrieval::validate_k},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    q: String,
    k: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
}

/// Handler for raw semantic search
pub async fn search(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<SearchResponse>> {
    let k = validate_k(params.k.unwrap_or(state.config.default_k as i64))?;

    tracing::info!(request_id = %request_id, k, "Processing search request");

    let results = recommendations::search(&state, &params.q, k).await?;

    Ok(Json(SearchResponse {
        query: params.q,
        results,
    }))
}
