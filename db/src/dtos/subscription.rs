use std::collections::HashMap;

use chrono::NaiveDateTime;
use uuid::Uuid;

/// Column values written by both insert and full update.
pub struct SubscriptionWriteRequest {
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
    pub metadata: HashMap<String, String>,
}

pub struct CancellationRequest {
    pub subscription_id: Uuid,
    pub cancelled_at: NaiveDateTime,
    pub reason: String,
}
