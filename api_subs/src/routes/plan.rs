use std::sync::Arc;

use actix_web::{
    Responder, get,
    web::{self},
};
use common::{
    error::{AppError, Res},
    http::Success,
};
use uuid::Uuid;

use crate::services::plan::PlanService;

/// Lists the public, active plans in catalogue order.
#[get("")]
pub async fn get_plans(plans: web::Data<Arc<PlanService>>) -> Res<impl Responder> {
    Success::ok(plans.list_public_plans().await?)
}

/// Shows one plan. Hidden and retired plans are reported as missing.
#[get("/{id}")]
pub async fn get_plan(
    plans: web::Data<Arc<PlanService>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let plan = plans.get_plan(path.into_inner()).await?;
    if !plan.is_public || !plan.is_active {
        return Err(AppError::NotFound("plan".to_string()));
    }
    Success::ok(plan)
}
