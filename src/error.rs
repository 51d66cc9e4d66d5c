use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;
use validator::ValidationErrors;

use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),
    #[error("invalid request body: {0}")]
    Validation(#[from] ValidationErrors),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Auth(String),
    #[error("User not found")]
    UserNotFound,
    #[error("failed to write favorites: {0}")]
    FavoriteWrite(#[source] sqlx::Error),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] color_eyre::eyre::Report),
}

impl AppError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) | Self::UserNotFound => {
                StatusCode::BAD_REQUEST
            }
            Self::Auth(_) => StatusCode::FORBIDDEN,
            Self::Upstream(_) | Self::FavoriteWrite(_) | Self::Database(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn field_messages(errors: &ValidationErrors) -> BTreeMap<&'static str, Vec<String>> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let messages = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map_or_else(|| format!("{field} is invalid ({})", e.code), ToString::to_string)
                })
                .collect();
            (field, messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body: Value = match &self {
            Self::Upstream(_) => json!({ "error": true, "msg": "Failed to fetch Pokémon data" }),
            Self::Validation(errors) => {
                let errors = field_messages(errors);
                let msg = errors
                    .values()
                    .flatten()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(",");
                json!({ "error": true, "msg": msg, "errors": errors })
            }
            Self::BadRequest(msg) => json!({ "error": true, "msg": msg }),
            Self::Auth(msg) => json!({ "error": true, "errorMsg": msg }),
            Self::UserNotFound => json!({ "error": true, "errorMsg": self.to_string() }),
            Self::FavoriteWrite(err) => {
                tracing::error!(error = %err, "favorite write failed");
                json!({ "error": true, "msg": "Failed to update favorite Pokémon" })
            }
            Self::Database(err) => {
                tracing::error!(error = %err, "database error");
                json!({ "error": true, "msg": "Something went wrong" })
            }
            Self::Internal(err) => {
                tracing::error!(error = ?err, "internal error");
                json!({ "error": true, "msg": "Something went wrong" })
            }
        };

        (status, Json(body)).into_response()
    }
}
