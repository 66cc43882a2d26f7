use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct Currency {
    pub id: Uuid,
    /// ISO 4217 code, e.g. `USD`.
    pub code: String,
    pub name: String,
    pub symbol: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
