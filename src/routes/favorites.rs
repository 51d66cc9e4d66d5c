use axum::{extract::State, Json};
use serde::Deserialize;
use validator::Validate;

use crate::{
    auth::CurrentUser, entities::FavoritePokemon, error::AppError, routes::{PathParam, ValidatedJson},
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddFavoritesRequest {
    #[serde(rename = "pokemonIds")]
    #[validate(length(min = 1, message = "pokemonIds must contain at least one id"))]
    pub pokemon_ids: Vec<i64>,
}

pub async fn add(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(payload): ValidatedJson<AddFavoritesRequest>,
) -> Result<Json<FavoritePokemon>, AppError> {
    Ok(Json(
        state
            .pokemon
            .add_favorites(user.id, &payload.pokemon_ids)
            .await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    PathParam(pokemon_id): PathParam<i64>,
) -> Result<Json<FavoritePokemon>, AppError> {
    Ok(Json(state.pokemon.remove_favorite(user.id, pokemon_id).await?))
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<FavoritePokemon>, AppError> {
    Ok(Json(state.pokemon.list_favorites(user.id).await?))
}
