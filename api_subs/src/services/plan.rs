use std::sync::Arc;

use bigdecimal::BigDecimal;
use common::error::{AppError, Res, ResExt};
use uuid::Uuid;

use crate::{
    models::plan::{Plan, PlanDraft},
    ports::{CurrencyLookup, PlanStore},
};

/// Plan catalogue maintained by administrators and browsed by everyone.
#[derive(Clone)]
pub struct PlanService {
    plans: Arc<dyn PlanStore>,
    currencies: Arc<dyn CurrencyLookup>,
}

impl PlanService {
    pub fn new(plans: Arc<dyn PlanStore>, currencies: Arc<dyn CurrencyLookup>) -> Self {
        Self { plans, currencies }
    }

    async fn check_draft(&self, draft: &PlanDraft) -> Res<()> {
        if draft.name.trim().is_empty() {
            return Err(AppError::InvalidArgument("plan name is required".to_string()));
        }
        if draft.description.trim().is_empty() {
            return Err(AppError::InvalidArgument(
                "plan description is required".to_string(),
            ));
        }
        if draft.price < BigDecimal::from(0) {
            return Err(AppError::InvalidArgument(
                "plan price cannot be negative".to_string(),
            ));
        }
        // prices are stored as NUMERIC(12, 2)
        let (_, scale) = draft.price.normalized().as_bigint_and_exponent();
        if scale > 2 {
            return Err(AppError::InvalidArgument(
                "plan price cannot have more than two decimal places".to_string(),
            ));
        }
        if draft.price >= BigDecimal::from(10_000_000_000_i64) {
            return Err(AppError::InvalidArgument(
                "plan price cannot exceed 9999999999.99".to_string(),
            ));
        }

        let currency = self
            .currencies
            .get_by_id(draft.currency_id)
            .await
            .context("loading currency")?;
        if !currency.is_active {
            return Err(AppError::InvalidArgument(format!(
                "currency {} is not active",
                currency.code
            )));
        }
        Ok(())
    }

    pub async fn create_plan(&self, draft: PlanDraft) -> Res<Plan> {
        self.check_draft(&draft).await?;
        let plan = self.plans.create(draft).await.context("creating plan")?;
        log::info!("Created plan {} ({})", plan.id, plan.name);
        Ok(plan)
    }

    pub async fn update_plan(&self, plan_id: Uuid, draft: PlanDraft) -> Res<Plan> {
        self.check_draft(&draft).await?;
        let plan = self
            .plans
            .update(plan_id, draft)
            .await
            .context("updating plan")?;
        log::info!("Updated plan {} ({})", plan.id, plan.name);
        Ok(plan)
    }

    pub async fn get_plan(&self, plan_id: Uuid) -> Res<Plan> {
        self.plans.get_by_id(plan_id).await.context("loading plan")
    }

    pub async fn list_plans(&self) -> Res<Vec<Plan>> {
        self.plans.get_all().await.context("listing plans")
    }

    pub async fn list_public_plans(&self) -> Res<Vec<Plan>> {
        self.plans
            .get_all_public()
            .await
            .context("listing public plans")
    }

    pub async fn list_active_plans(&self) -> Res<Vec<Plan>> {
        self.plans
            .get_all_active()
            .await
            .context("listing active plans")
    }

    pub async fn delete_plan(&self, plan_id: Uuid) -> Res<()> {
        self.plans.delete(plan_id).await.context("deleting plan")?;
        log::info!("Deleted plan {}", plan_id);
        Ok(())
    }
}
