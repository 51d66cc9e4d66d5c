use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use crate::{
    entities::{AbilityDetails, MoveDetails, PokemonDetails, PokemonSummary},
    error::AppError,
    util::int_or,
    AppState,
};

const DEFAULT_LIMIT: i64 = 150;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub offset: Option<String>,
    pub limit: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Arc<Vec<PokemonSummary>>>, AppError> {
    let offset = int_or(query.offset.as_deref(), 0);
    let limit = int_or(query.limit.as_deref(), DEFAULT_LIMIT);

    Ok(Json(state.pokemon.get_pokemon_page(offset, limit).await?))
}

/// Only a plain run of ASCII digits is an id; `+4` or `4.0` are names.
fn numeric_id(segment: &str) -> Option<u32> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

/// `/pokemon/25` looks up by id, `/pokemon/pikachu` by name.
pub async fn details(
    State(state): State<AppState>,
    Path(name_or_id): Path<String>,
) -> Result<Json<Arc<PokemonDetails>>, AppError> {
    let details = match numeric_id(&name_or_id) {
        Some(id) => state.pokemon.get_details_by_id(id).await?,
        None => state.pokemon.get_details_by_name(&name_or_id).await?,
    };

    Ok(Json(details))
}

pub async fn move_details(
    State(state): State<AppState>,
    Path(move_name): Path<String>,
) -> Result<Json<Arc<MoveDetails>>, AppError> {
    Ok(Json(state.pokemon.get_move_details(&move_name).await?))
}

pub async fn ability_details(
    State(state): State<AppState>,
    Path(ability_name): Path<String>,
) -> Result<Json<Arc<AbilityDetails>>, AppError> {
    Ok(Json(state.pokemon.get_ability_details(&ability_name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_digit_segments_are_ids() {
        assert_eq!(numeric_id("25"), Some(25));
        assert_eq!(numeric_id("007"), Some(7));
        assert_eq!(numeric_id("+4"), None);
        assert_eq!(numeric_id("-4"), None);
        assert_eq!(numeric_id(" 4"), None);
        assert_eq!(numeric_id("pikachu"), None);
        assert_eq!(numeric_id(""), None);
        assert_eq!(numeric_id("99999999999"), None);
    }
}
