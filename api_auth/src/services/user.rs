use common::error::{Res, ResExt};
use db::models::user::{AuthCredentials, User};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{dtos::auth::RegisterRequest, services::auth::hash_password};

pub async fn get_user_by_id(pool: &PgPool, user_id: Uuid) -> Res<User> {
    db::user::get_user_by_id(pool, user_id)
        .await
        .context("loading user")
}

/// Inserts the user and its password hash in one transaction.
pub async fn create_user_with_credentials(pool: &PgPool, req: &RegisterRequest) -> Res<User> {
    let password_hash = hash_password(&req.password)?;

    let mut tx = pool.begin().await?;

    let user = db::user::insert_user(&mut *tx, req.email.trim(), req.name.trim()).await?;
    db::user::insert_user_credentials(
        &mut *tx,
        AuthCredentials {
            user_id: user.id,
            password_hash,
        },
    )
    .await?;

    tx.commit().await?;
    log::info!("Registered user {}", user.id);
    Ok(user)
}
