use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::models::plan::PlanFeature;

/// Column values written by both insert and update.
pub struct PlanWriteRequest {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub currency_id: Uuid,
    pub billing_interval: String,
    pub features: Vec<PlanFeature>,
    pub is_active: bool,
    pub is_public: bool,
    pub sort_order: i32,
}
