use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SubscriptionCreateRequest {
    pub plan_id: Uuid,
    /// Defaults to now.
    pub start_date: Option<NaiveDateTime>,
    /// Defaults to one month after the start date.
    pub end_date: Option<NaiveDateTime>,
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan_id: Uuid,
    pub payment_method_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodRequest {
    pub payment_method_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RenewRequest {
    pub end_date: NaiveDateTime,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}
