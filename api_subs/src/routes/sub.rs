use std::sync::Arc;

use actix_web::{
    Responder, get, post, put,
    web::{self},
};
use chrono::{Months, Utc};
use common::{
    error::{AppError, Res},
    http::Success,
    jwt::JwtClaims,
};
use uuid::Uuid;

use crate::{
    dtos::sub::{
        CancelRequest, ChangePlanRequest, PaymentMethodRequest, RenewRequest,
        SubscriptionCreateRequest,
    },
    models::sub::{Subscription, SubscriptionSummary},
    services::sub::{NewSubscription, SubscriptionLifecycle},
};

const DEFAULT_CANCEL_REASON: &str = "cancelled by user request";

pub(crate) fn summaries(subscriptions: Vec<Subscription>) -> Vec<SubscriptionSummary> {
    let now = Utc::now().naive_utc();
    subscriptions.iter().map(|sub| sub.summary(now)).collect()
}

fn summary(subscription: Subscription) -> SubscriptionSummary {
    subscription.summary(Utc::now().naive_utc())
}

/// Loads a subscription and checks that the caller owns it (or is an admin).
async fn owned_subscription(
    lifecycle: &SubscriptionLifecycle,
    claims: &JwtClaims,
    subscription_id: Uuid,
) -> Res<Subscription> {
    let subscription = lifecycle.get_subscription(subscription_id).await?;
    if subscription.user_id != claims.user_id && !claims.is_admin {
        return Err(AppError::Forbidden(
            "subscription belongs to another user".to_string(),
        ));
    }
    Ok(subscription)
}

/// Lists every subscription of the authenticated user, newest first.
#[get("")]
pub async fn get_subscriptions(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
) -> Res<impl Responder> {
    let subscriptions = lifecycle.list_user_subscriptions(claims.user_id).await?;
    Success::ok(summaries(subscriptions))
}

/// Subscribes the authenticated user to a plan, replacing any active
/// subscription.
#[post("")]
pub async fn post_subscription(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    req: web::Json<SubscriptionCreateRequest>,
) -> Res<impl Responder> {
    let req = req.into_inner();
    let start_date = req.start_date.unwrap_or_else(|| Utc::now().naive_utc());
    let end_date = match req.end_date {
        Some(end_date) => end_date,
        None => start_date
            .checked_add_months(Months::new(1))
            .ok_or_else(|| AppError::InvalidArgument("start date out of range".to_string()))?,
    };

    let subscription = lifecycle
        .create_subscription(NewSubscription {
            user_id: claims.user_id,
            plan_id: req.plan_id,
            start_date,
            end_date,
            payment_method_id: req.payment_method_id,
            metadata: req.metadata,
        })
        .await?;
    Success::created(summary(subscription))
}

#[get("/active")]
pub async fn get_active_subscription(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
) -> Res<impl Responder> {
    let subscription = lifecycle
        .get_active_subscription(claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("active subscription".to_string()))?;
    Success::ok(summary(subscription))
}

#[get("/{id}")]
pub async fn get_subscription(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
) -> Res<impl Responder> {
    let subscription = owned_subscription(&lifecycle, &claims, path.into_inner()).await?;
    Success::ok(summary(subscription))
}

/// Cancels a subscription. The body is optional; without a reason the
/// default one is recorded.
#[put("/{id}/cancel")]
pub async fn put_cancel(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
    req: Option<web::Json<CancelRequest>>,
) -> Res<impl Responder> {
    let subscription_id = path.into_inner();
    owned_subscription(&lifecycle, &claims, subscription_id).await?;

    let reason = req
        .map(|req| req.into_inner())
        .unwrap_or_default()
        .reason
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());

    lifecycle.cancel_subscription(subscription_id, &reason).await?;
    let subscription = lifecycle.get_subscription(subscription_id).await?;
    Success::ok(summary(subscription))
}

#[put("/{id}/plan")]
pub async fn put_plan(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
    req: web::Json<ChangePlanRequest>,
) -> Res<impl Responder> {
    let subscription_id = path.into_inner();
    owned_subscription(&lifecycle, &claims, subscription_id).await?;

    let req = req.into_inner();
    let subscription = lifecycle
        .change_plan(subscription_id, req.plan_id, req.payment_method_id)
        .await?;
    Success::ok(summary(subscription))
}

#[put("/{id}/payment-method")]
pub async fn put_payment_method(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
    req: web::Json<PaymentMethodRequest>,
) -> Res<impl Responder> {
    let subscription_id = path.into_inner();
    owned_subscription(&lifecycle, &claims, subscription_id).await?;

    let subscription = lifecycle
        .update_payment_method(subscription_id, &req.payment_method_id)
        .await?;
    Success::ok(summary(subscription))
}

#[put("/{id}/renew")]
pub async fn put_renew(
    claims: web::ReqData<JwtClaims>,
    lifecycle: web::Data<Arc<SubscriptionLifecycle>>,
    path: web::Path<Uuid>,
    req: web::Json<RenewRequest>,
) -> Res<impl Responder> {
    let subscription_id = path.into_inner();
    owned_subscription(&lifecycle, &claims, subscription_id).await?;

    let subscription = lifecycle
        .renew_subscription(subscription_id, req.end_date)
        .await?;
    Success::ok(summary(subscription))
}
