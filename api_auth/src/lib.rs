use std::sync::Arc;

use actix_web::web;
use common::env_config::Config;
use middleware::auth::AuthMiddleware;

pub mod middleware {
    pub mod auth;
}
pub mod routes {
    pub mod auth;
    pub mod user;
}
mod services {
    pub(crate) mod auth;
    pub(crate) mod user;
}
mod dtos {
    pub(crate) mod auth;
}

/// Bearer-token middleware for the secured scope.
pub fn auth_middleware(config: Arc<Config>) -> AuthMiddleware {
    AuthMiddleware::new(config.jwt_config.secret.clone())
}

/// Registration and login, mounted outside the secured scope.
pub fn mount_auth() -> actix_web::Scope {
    web::scope("/auth")
        .service(routes::auth::post_register)
        .service(routes::auth::post_login)
}

pub fn mount_user() -> actix_web::Scope {
    web::scope("/user").service(routes::user::get_me)
}
