use std::sync::Arc;

use actix_web::{
    Responder, delete, get, post, put,
    web::{self},
};
use common::{env_config::Config, error::Res, http::Success, jwt::JwtClaims};
use uuid::Uuid;

use crate::{
    dtos::{
        currency::CurrencyRequest,
        plan::PlanRequest,
        sub::{StatusQuery, StatusUpdateRequest, WindowQuery},
    },
    routes::sub::summaries,
    services::{currency::CurrencyService, plan::PlanService, sub::SubscriptionLifecycle},
};

/// Lists subscriptions by status (`active` when omitted).
#[get("/subscriptions")]
pub async fn get_subscriptions(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    query: web::Query<StatusQuery>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let status = query.status.as_deref().unwrap_or("active");
    Success::ok(summaries(lifecycle.list_by_status(status).await?))
}

#[get("/subscriptions/expiring")]
pub async fn get_expiring(
    claims: web::ReqData<JwtClaims>,
    config: web::Data<Arc<Config>>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    query: web::Query<WindowQuery>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let days = query.days.unwrap_or(config.renewal_window_days);
    Success::ok(summaries(lifecycle.list_expiring(days).await?))
}

#[get("/subscriptions/pending-renewals")]
pub async fn get_pending_renewals(
    claims: web::ReqData<JwtClaims>,
    config: web::Data<Arc<Config>>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    query: web::Query<WindowQuery>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let days = query.days.unwrap_or(config.renewal_window_days);
    Success::ok(summaries(lifecycle.list_pending_renewals(days).await?))
}

#[put("/subscriptions/{id}/status")]
pub async fn put_status(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
    req: web::Json<StatusUpdateRequest>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let subscription = lifecycle
        .update_status(path.into_inner(), &req.status)
        .await?;
    Success::ok(subscription.summary(chrono::Utc::now().naive_utc()))
}

#[delete("/subscriptions/{id}")]
pub async fn delete_subscription(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    lifecycle.delete_subscription(path.into_inner()).await?;
    Success::no_content()
}

/// Lists the whole catalogue, hidden and retired plans included.
#[get("/plans")]
pub async fn get_plans(
    claims: web::ReqData<JwtClaims>,
    plans: web::Data<Arc<PlanService>>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    Success::ok(plans.list_plans().await?)
}

#[get("/plans/active")]
pub async fn get_active_plans(
    claims: web::ReqData<JwtClaims>,
    plans: web::Data<Arc<PlanService>>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    Success::ok(plans.list_active_plans().await?)
}

#[post("/plans")]
pub async fn post_plan(
    claims: web::ReqData<JwtClaims>,
    plans: web::Data<Arc<PlanService>>,
    req: web::Json<PlanRequest>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let plan = plans.create_plan(req.into_inner().into_draft()?).await?;
    Success::created(plan)
}

#[put("/plans/{id}")]
pub async fn put_plan(
    claims: web::ReqData<JwtClaims>,
    plans: web::Data<Arc<PlanService>>,
    path: web::Path<Uuid>,
    req: web::Json<PlanRequest>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let plan = plans
        .update_plan(path.into_inner(), req.into_inner().into_draft()?)
        .await?;
    Success::ok(plan)
}

#[delete("/plans/{id}")]
pub async fn delete_plan(
    claims: web::ReqData<JwtClaims>,
    plans: web::Data<Arc<PlanService>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    plans.delete_plan(path.into_inner()).await?;
    Success::no_content()
}

#[post("/currencies")]
pub async fn post_currency(
    claims: web::ReqData<JwtClaims>,
    currencies: web::Data<Arc<CurrencyService>>,
    req: web::Json<CurrencyRequest>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let currency = currencies.create_currency(req.into_inner().into()).await?;
    Success::created(currency)
}

#[put("/currencies/{id}")]
pub async fn put_currency(
    claims: web::ReqData<JwtClaims>,
    currencies: web::Data<Arc<CurrencyService>>,
    path: web::Path<Uuid>,
    req: web::Json<CurrencyRequest>,
) -> Res<impl Responder> {
    claims.require_admin()?;
    let currency = currencies
        .update_currency(path.into_inner(), req.into_inner().into())
        .await?;
    Success::ok(currency)
}
