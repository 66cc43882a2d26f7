use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    /// Granted directly in the database; carried into issued tokens.
    pub is_admin: bool,
}

#[derive(Debug, Clone)]
pub struct AuthCredentials {
    pub user_id: Uuid,
    pub password_hash: String,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserWithCredentials {
    #[sqlx(flatten)]
    pub user: User,
    pub password_hash: String,
}
