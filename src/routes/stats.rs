use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entry_count: u64,
}

#[allow(clippy::unused_async)]
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(CacheStats {
        entry_count: state.pokemon.cache().entry_count(),
    })
}
