use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::AppState;

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn create_token(
    user_id: &str,
    jwt_secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret.as_bytes()))
}

pub fn validate_token(
    token: &str,
    jwt_secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims.sub)
}

/// Lets the request through only with a valid `Authorization: Bearer <jwt>`.
pub async fn authenticate(
    State(state): State<AppState>,
    headers: HeaderMap,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;
    let token = auth_header
        .to_str()
        .ok()
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header format".to_string()))?;
    let user_id = validate_token(token, &state.config.jwt_secret).map_err(|e| {
        log::debug!("Rejected token: {}", e);
        AppError::Unauthorized("Invalid or expired token".to_string())
    })?;
    log::info!("Authenticated admin request from {}", user_id);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_subject() {
        let token = create_token("admin", "secret").unwrap();
        assert_eq!(validate_token(&token, "secret").unwrap(), "admin");
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = create_token("admin", "secret").unwrap();
        assert!(validate_token(&token, "another-secret").is_err());
        assert!(validate_token("not-a-jwt", "secret").is_err());
    }
}
