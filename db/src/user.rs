use common::error::Res;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    map_read_error, map_write_error,
    models::user::{AuthCredentials, User, UserWithCredentials},
};

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<User> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(executor)
        .await
        .map_err(|err| map_read_error(err, "user"))
}

pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
    name: &str,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name)
        VALUES ($1, $2)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(name)
    .fetch_one(executor)
    .await
    .map_err(|err| map_write_error(err, "email already registered"))
}

pub async fn insert_user_credentials<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: AuthCredentials,
) -> Res<()> {
    sqlx::query(
        r#"
        INSERT INTO auth_credentials (user_id, password_hash)
        VALUES ($1, $2)
        "#,
    )
    .bind(data.user_id)
    .bind(data.password_hash)
    .execute(executor)
    .await
    .map_err(|err| map_write_error(err, "user already has credentials"))?;
    Ok(())
}

/// Loads a user together with the stored password hash. Users without
/// credentials are reported as missing.
pub async fn get_user_with_password_hash<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    email: &str,
) -> Res<(User, AuthCredentials)> {
    let row = sqlx::query_as::<_, UserWithCredentials>(
        r#"
        SELECT u.*, ac.password_hash
        FROM users u
        JOIN auth_credentials ac ON u.id = ac.user_id
        WHERE u.email = $1
        "#,
    )
    .bind(email)
    .fetch_one(executor)
    .await
    .map_err(|err| map_read_error(err, "user"))?;

    let credentials = AuthCredentials {
        user_id: row.user.id,
        password_hash: row.password_hash,
    };
    Ok((row.user, credentials))
}
