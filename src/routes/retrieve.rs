use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{Candidate, PreferenceProfile, ProfileParse, FALLBACK_QUERY},
    services::{query::query_for, recommendations, retrieval::validate_k},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    /// Profile object, or profiler output text holding one
    #[serde(default)]
    pub profile: Value,
    #[serde(default)]
    pub k: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RetrieveResponse {
    pub query: String,
    /// True when the profile could not be interpreted
    pub fallback: bool,
    pub candidates: Vec<Candidate>,
}

fn interpret_profile(profile: Value) -> ProfileParse {
    match profile {
        Value::String(raw) => PreferenceProfile::parse(&raw),
        Value::Null => ProfileParse::Fallback(FALLBACK_QUERY),
        other => PreferenceProfile::from_value(other),
    }
}

/// Handler for the retrieval endpoint
pub async fn retrieve(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RetrieveRequest>,
) -> AppResult<Json<RetrieveResponse>> {
    let k = validate_k(request.k.unwrap_or(state.config.default_k as i64))?;
    let profile = interpret_profile(request.profile);
    let query = query_for(&profile);

    tracing::info!(
        request_id = %request_id,
        k,
        fallback = matches!(profile, ProfileParse::Fallback(_)),
        "Processing retrieval request"
    );

    let candidates = recommendations::get_recommendations(&state, &profile, k).await?;

    Ok(Json(RetrieveResponse {
        query,
        fallback: matches!(profile, ProfileParse::Fallback(_)),
        candidates,
    }))
}
