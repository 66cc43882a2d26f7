use bigdecimal::BigDecimal;
use common::error::Res;
use db::models::plan::PlanFeature;
use serde::Deserialize;
use uuid::Uuid;

use crate::models::plan::{PlanDraft, PlanInterval};

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    pub description: String,
    pub price: BigDecimal,
    pub currency_id: Uuid,
    pub interval: String,
    #[serde(default)]
    pub features: Vec<PlanFeature>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub is_public: bool,
    #[serde(default)]
    pub sort_order: i32,
}

impl PlanRequest {
    pub fn into_draft(self) -> Res<PlanDraft> {
        Ok(PlanDraft {
            interval: PlanInterval::parse(&self.interval)?,
            name: self.name,
            description: self.description,
            price: self.price,
            currency_id: self.currency_id,
            features: self.features,
            is_active: self.is_active,
            is_public: self.is_public,
            sort_order: self.sort_order,
        })
    }
}
