use std::collections::HashMap;

use chrono::NaiveDateTime;
use sqlx::types::Json;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserSubscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub renewal_date: Option<NaiveDateTime>,
    pub cancellation_date: Option<NaiveDateTime>,
    pub last_payment_date: Option<NaiveDateTime>,
    pub next_payment_attempt: Option<NaiveDateTime>,
    pub payment_method_id: Option<String>,
    pub metadata: Json<HashMap<String, String>>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
