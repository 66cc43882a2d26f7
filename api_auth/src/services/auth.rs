use argon2::{
    Argon2,
    password_hash::{
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use common::{
    env_config::JwtConfig,
    error::{AppError, Res},
    jwt::{self, ClaimsSpec},
};
use db::models::user::User;
use sqlx::PgPool;

use crate::dtos::auth::LoginRequest;

const INVALID_CREDENTIALS: &str = "invalid credentials";

pub fn hash_password(password: &str) -> Res<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password. {}", e)))
}

/// False for a wrong password and for a hash that cannot be parsed.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Signs a token for `user`, carrying the admin flag stored with the user.
pub fn issue_token(user: &User, config: &JwtConfig) -> Res<String> {
    jwt::generate_jwt(
        ClaimsSpec {
            user_id: user.id,
            email: user.email.clone(),
            is_admin: user.is_admin,
        },
        config,
    )
}

/// Authenticates an existing user.
/// Unknown emails and wrong passwords are both reported as 401.
pub async fn authenticate_user(pool: &PgPool, login_data: &LoginRequest) -> Res<User> {
    let (user, credentials) =
        match db::user::get_user_with_password_hash(pool, login_data.email.trim()).await {
            Ok(found) => found,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
            Err(err) => return Err(err),
        };

    if verify_password(&login_data.password, &credentials.password_hash) {
        Ok(user)
    } else {
        Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()))
    }
}
