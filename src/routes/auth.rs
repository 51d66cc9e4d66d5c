use axum::{extract::State, Json};
use color_eyre::eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::{Validate, ValidationError};

use crate::{
    auth::{hash_password, verify_password},
    entities::{NewUser, PublicUser},
    error::AppError,
    routes::ValidatedJson,
    AppState,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(
        length(min = 8, message = "password must be at least 8 characters"),
        custom = "letters_and_digits"
    )]
    pub password: String,
    pub mobile: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub data: PublicUser,
    pub error: bool,
    pub access_token: String,
    pub msg: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub data: PublicUser,
    pub access_token: String,
    pub error: bool,
}

fn letters_and_digits(password: &str) -> Result<(), ValidationError> {
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if has_letter && has_digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_strength");
        err.message = Some("password must contain at least one letter and one number".into());
        Err(err)
    }
}

// SQLITE_CONSTRAINT_UNIQUE
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("2067"))
}

pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, AppError> {
    let already_used = state
        .users
        .exists(&payload.email, payload.mobile.as_deref())
        .await?;
    if already_used {
        return Err(AppError::BadRequest("Email or Mobile is already used".into()));
    }

    let password_hash = hash_password(&payload.password).map_err(|err| eyre!("{err}"))?;
    let user = state
        .users
        .create(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            mobile: payload.mobile,
        })
        .await
        .map_err(|err| {
            // Lost a race with a concurrent registration for the same email.
            if is_unique_violation(&err) {
                AppError::BadRequest("Email or Mobile is already used".into())
            } else {
                AppError::Database(err)
            }
        })?;

    let data = user.public();
    let access_token = state.tokens.sign(&data).map_err(|err| eyre!(err))?;
    info!(user_id = data.id, "user registered");

    Ok(Json(RegisterResponse {
        data,
        error: false,
        access_token,
        msg: "User registered successfully",
    }))
}

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state
        .users
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| AppError::BadRequest("Email ID is incorrect".into()))?;

    if !verify_password(&user.password, &payload.password) {
        return Err(AppError::BadRequest("Password is incorrect".into()));
    }

    let data = user.public();
    let access_token = state.tokens.sign(&data).map_err(|err| eyre!(err))?;

    Ok(Json(LoginResponse {
        data,
        access_token,
        error: false,
    }))
}
