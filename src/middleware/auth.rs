use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

pub const ADMIN_ROLE: &str = "admin";

/// Caller identity decoded from a `Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden("insufficient permissions".into()));
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, ADMIN_ROLE)
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("invalid subject in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("invalid Authorization scheme".into()))?;

        decode_token(token, &state.config.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(role: &str, secret: &str, ttl: Duration) -> String {
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            role: role.to_string(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn admin_token_is_accepted() {
        let user = decode_token(&token(ADMIN_ROLE, "secret", Duration::hours(1)), "secret").unwrap();
        assert!(ensure_admin(&user).is_ok());
    }

    #[test]
    fn other_roles_are_forbidden() {
        let user = decode_token(&token("viewer", "secret", Duration::hours(1)), "secret").unwrap();
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn bad_or_expired_tokens_are_unauthorized() {
        let wrong_secret = token(ADMIN_ROLE, "other", Duration::hours(1));
        assert!(matches!(
            decode_token(&wrong_secret, "secret"),
            Err(AppError::Unauthorized(_))
        ));

        let expired = token(ADMIN_ROLE, "secret", Duration::hours(-2));
        assert!(matches!(
            decode_token(&expired, "secret"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
