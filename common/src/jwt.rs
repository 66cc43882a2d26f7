use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    env_config::JwtConfig,
    error::{AppError, Res},
};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JwtClaims {
    pub user_id: Uuid,
    pub email: String,
    #[serde(default)]
    pub is_admin: bool,
    pub exp: usize,
}

impl JwtClaims {
    /// Fails with `Forbidden` unless the token carries the admin flag.
    pub fn require_admin(&self) -> Res<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "administrator permissions required".to_string(),
            ))
        }
    }
}

pub struct ClaimsSpec {
    pub user_id: Uuid,
    pub email: String,
    pub is_admin: bool,
}

/// Generates JWT token based on user object and JWT configuration options
pub fn generate_jwt(spec: ClaimsSpec, config: &JwtConfig) -> Res<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.expiration_hours))
        .ok_or_else(|| AppError::Internal("token expiration out of range".to_string()))?
        .timestamp();

    let claims = JwtClaims {
        user_id: spec.user_id,
        email: spec.email,
        is_admin: spec.is_admin,
        exp: expiration as usize,
    };

    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(AppError::from)
}

/// Extracts claims object from JWT token.
/// Requires JWT secret.
pub fn validate_jwt(token: &str, secret: &str) -> Res<JwtClaims> {
    let token_data = jsonwebtoken::decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Pulls the token out of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            expiration_hours: 1,
        }
    }

    #[test]
    fn issued_token_validates_with_same_secret() {
        let user_id = Uuid::new_v4();
        let token = generate_jwt(
            ClaimsSpec {
                user_id,
                email: "ana@example.com".to_string(),
                is_admin: true,
            },
            &config(),
        )
        .expect("token should be issued");

        let claims = validate_jwt(&token, "test-secret").expect("token should validate");
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.email, "ana@example.com");
        assert!(claims.require_admin().is_ok());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = generate_jwt(
            ClaimsSpec {
                user_id: Uuid::new_v4(),
                email: "ana@example.com".to_string(),
                is_admin: false,
            },
            &config(),
        )
        .unwrap();

        assert!(matches!(
            validate_jwt(&token, "another-secret"),
            Err(AppError::JWT(_))
        ));
    }

    #[test]
    fn non_admin_claims_are_forbidden() {
        let claims = JwtClaims {
            user_id: Uuid::new_v4(),
            email: "ana@example.com".to_string(),
            is_admin: false,
            exp: 0,
        };
        assert!(matches!(claims.require_admin(), Err(AppError::Forbidden(_))));
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
    }
}
