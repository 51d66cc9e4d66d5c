use axum::{
    async_trait,
    body::HttpBody,
    extract::{FromRequest, FromRequestParts, Path},
    http::{request::Parts, Request},
    middleware,
    routing::{delete, get, post},
    BoxError, Json, Router,
};
use serde::de::DeserializeOwned;
use tower_http::trace::TraceLayer;
use validator::Validate;

use crate::{auth::deserialize_user, error::AppError, AppState};

pub mod auth;
pub mod favorites;
pub mod pokemon;
pub mod stats;

/// JSON body that has passed its `validator` rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S, B> FromRequest<S, B> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
    B: HttpBody + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    type Rejection = AppError;

    async fn from_request(req: Request<B>, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

/// Path parameters whose rejection is reported like every other bad request.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathParam<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        Ok(Self(value))
    }
}

pub fn router(state: AppState) -> Router {
    let v1 = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/pokemon", get(pokemon::list))
        .route(
            "/pokemon/favorites",
            get(favorites::list).post(favorites::add),
        )
        .route("/pokemon/favorites/:pokemon_id", delete(favorites::remove))
        .route("/pokemon/move/:move_name", get(pokemon::move_details))
        .route("/pokemon/ability/:ability_name", get(pokemon::ability_details))
        .route("/pokemon/:name_or_id", get(pokemon::details))
        .route("/cache/stats", get(stats::cache_stats));

    Router::new()
        .nest("/v1", v1)
        .layer(middleware::from_fn_with_state(state.clone(), deserialize_user))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
