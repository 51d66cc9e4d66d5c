use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PHCError, PasswordHash, PasswordHasher, PasswordVerifier,
        SaltString,
    },
    Argon2,
};
use axum::{
    async_trait,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{Duration, Utc};
use color_eyre::eyre::eyre;
use jsonwebtoken::{errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{entities::PublicUser, error::AppError, AppState};

pub fn hash_password(password: &str) -> Result<String, PHCError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash).map_or(false, |parsed| {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    })
}

/// Token payload: the user's public profile plus the standard timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(flatten)]
    pub user: PublicUser,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("jwt expired")]
    Expired,
    #[error("{0}")]
    Invalid(String),
}

#[derive(Clone)]
pub struct Tokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry: Duration,
}

impl Tokens {
    /// Fails when `expiry` cannot be added to the current time.
    pub fn new(secret: &str, expiry: std::time::Duration) -> color_eyre::Result<Self> {
        let expiry = Duration::from_std(expiry)
            .ok()
            .filter(|expiry| Utc::now().checked_add_signed(*expiry).is_some())
            .ok_or_else(|| eyre!("token expiry of {expiry:?} is out of range"))?;

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry,
        })
    }

    pub fn sign(&self, user: &PublicUser) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            user: user.clone(),
            iat: now.timestamp(),
            exp: (now + self.expiry).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(err.to_string()),
            })
    }
}

/// Reads the `Authorization` header, with or without the `Bearer ` prefix.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Attaches verified [`Claims`] to the request. Requests without a token pass
/// through untouched; a bad or expired token is refused.
pub async fn deserialize_user<B>(
    State(state): State<AppState>,
    mut request: Request<B>,
    next: Next<B>,
) -> Response {
    let verified = bearer_token(request.headers()).map(|token| state.tokens.verify(token));

    match verified {
        None => next.run(request).await,
        Some(Ok(claims)) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Some(Err(err)) => {
            tracing::debug!(error = %err, "token verification failed");
            AppError::Auth(err.to_string()).into_response()
        }
    }
}

/// The authenticated caller, re-loaded from the store.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = parts
            .extensions
            .get::<Claims>()
            .ok_or_else(|| AppError::Auth("Auth token user not found".into()))?;

        let user = state
            .users
            .find_by_id(claims.user.id)
            .await?
            .ok_or(AppError::UserNotFound)?;

        Ok(Self(user.public()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn misty() -> PublicUser {
        let now = Utc::now();
        PublicUser {
            id: 2,
            name: "Misty".into(),
            email: "misty@cerulean.city".into(),
            mobile: None,
            status: 1,
            role: 2,
            created_at: now,
            last_updated: now,
        }
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("pw123456").unwrap();
        assert_ne!(hash, "pw123456");
        assert!(verify_password(&hash, "pw123456"));
        assert!(!verify_password(&hash, "pw1234567"));
        assert!(!verify_password("not a phc string", "pw123456"));
    }

    #[test]
    fn signed_token_carries_public_profile() {
        let tokens = Tokens::new("secret", std::time::Duration::from_secs(3600)).unwrap();
        let user = misty();
        let token = tokens.sign(&user).unwrap();
        let claims = tokens.verify(&token).unwrap();

        assert_eq!(claims.user, user);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let tokens = Tokens::new("secret", std::time::Duration::from_secs(3600)).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user: misty(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert_eq!(tokens.verify(&token).unwrap_err(), TokenError::Expired);
        assert_eq!(TokenError::Expired.to_string(), "jwt expired");
    }

    #[test]
    fn token_from_another_secret_is_invalid() {
        let token = Tokens::new("other", std::time::Duration::from_secs(60))
            .unwrap()
            .sign(&misty())
            .unwrap();
        let err = Tokens::new("secret", std::time::Duration::from_secs(60))
            .unwrap()
            .verify(&token)
            .unwrap_err();

        assert!(matches!(err, TokenError::Invalid(_)));
    }

    #[test]
    fn unrepresentable_expiry_is_refused() {
        assert!(Tokens::new("secret", std::time::Duration::from_secs(u64::MAX)).is_err());
        let far_future = std::time::Duration::from_secs(3600 * 24 * 365 * 400_000);
        assert!(Tokens::new("secret", far_future).is_err());
    }

    #[test]
    fn bearer_prefix_is_optional() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc.def"));
        assert_eq!(bearer_token(&headers), Some("abc.def"));

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
