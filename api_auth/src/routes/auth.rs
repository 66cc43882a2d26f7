use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{env_config::Config, error::Res, http::Success};
use sqlx::PgPool;

use crate::{
    dtos::auth::{AuthResponse, LoginRequest, RegisterRequest},
    services,
};

/// Registers a user with email and password and signs them in.
///
/// Returns 201 with a token, 400 for an incomplete request and 409 when the
/// email is already registered.
#[post("/register")]
pub async fn post_register(
    req: web::Json<RegisterRequest>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let req = req.into_inner();
    req.validate()?;
    let pg_pool: &PgPool = &pool;
    let user = services::user::create_user_with_credentials(pg_pool, &req).await?;
    let token = services::auth::issue_token(&user, &config.jwt_config)?;
    Success::created(AuthResponse { token, user })
}

/// Exchanges email and password for a bearer token.
#[post("/login")]
pub async fn post_login(
    login_data: web::Json<LoginRequest>,
    pool: web::Data<Arc<PgPool>>,
    config: web::Data<Arc<Config>>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let user = services::auth::authenticate_user(pg_pool, &login_data.into_inner()).await?;
    let token = services::auth::issue_token(&user, &config.jwt_config)?;
    Success::ok(AuthResponse { token, user })
}
