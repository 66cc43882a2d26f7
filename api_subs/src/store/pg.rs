use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::error::Res;
use db::{
    dtos::{currency::CurrencyWriteRequest, subscription::CancellationRequest},
    models::{currency::Currency, user::User},
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    models::{
        plan::{Plan, PlanDraft},
        sub::{Subscription, SubscriptionStatus},
    },
    ports::{
        Cancellation, CurrencyLookup, CurrencyStore, PlanLookup, PlanStore, SubscriptionStore,
        UserLookup,
    },
};

fn into_subscriptions(rows: Vec<db::models::subscription::UserSubscription>) -> Res<Vec<Subscription>> {
    rows.into_iter().map(Subscription::try_from).collect()
}

fn into_plans(rows: Vec<db::models::plan::Plan>) -> Vec<Plan> {
    rows.into_iter().map(Plan::from).collect()
}

fn cancellation_request(cancellation: Cancellation) -> CancellationRequest {
    CancellationRequest {
        subscription_id: cancellation.subscription_id,
        cancelled_at: cancellation.cancelled_at,
        reason: cancellation.reason,
    }
}

pub struct PgUserStore {
    pool: Arc<PgPool>,
}

impl PgUserStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserLookup for PgUserStore {
    async fn get_by_id(&self, user_id: Uuid) -> Res<User> {
        db::user::get_user_by_id(&*self.pool, user_id).await
    }
}

pub struct PgCurrencyStore {
    pool: Arc<PgPool>,
}

impl PgCurrencyStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CurrencyLookup for PgCurrencyStore {
    async fn get_by_id(&self, currency_id: Uuid) -> Res<Currency> {
        db::currency::get_currency_by_id(&*self.pool, currency_id).await
    }
}

#[async_trait]
impl CurrencyStore for PgCurrencyStore {
    async fn get_all_active(&self) -> Res<Vec<Currency>> {
        db::currency::list_active_currencies(&*self.pool).await
    }

    async fn create(&self, draft: CurrencyWriteRequest) -> Res<Currency> {
        db::currency::insert_currency(&*self.pool, draft).await
    }

    async fn update(&self, currency_id: Uuid, draft: CurrencyWriteRequest) -> Res<Currency> {
        db::currency::update_currency(&*self.pool, currency_id, draft).await
    }
}

pub struct PgPlanStore {
    pool: Arc<PgPool>,
}

impl PgPlanStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanLookup for PgPlanStore {
    async fn get_by_id(&self, plan_id: Uuid) -> Res<Plan> {
        db::plan::get_plan_by_id(&*self.pool, plan_id)
            .await
            .map(Plan::from)
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn create(&self, draft: PlanDraft) -> Res<Plan> {
        db::plan::insert_plan(&*self.pool, draft.into_write_request())
            .await
            .map(Plan::from)
    }

    async fn get_all(&self) -> Res<Vec<Plan>> {
        db::plan::list_plans(&*self.pool).await.map(into_plans)
    }

    async fn get_all_public(&self) -> Res<Vec<Plan>> {
        db::plan::list_public_plans(&*self.pool).await.map(into_plans)
    }

    async fn get_all_active(&self) -> Res<Vec<Plan>> {
        db::plan::list_active_plans(&*self.pool).await.map(into_plans)
    }

    async fn update(&self, plan_id: Uuid, draft: PlanDraft) -> Res<Plan> {
        db::plan::update_plan(&*self.pool, plan_id, draft.into_write_request())
            .await
            .map(Plan::from)
    }

    async fn delete(&self, plan_id: Uuid) -> Res<()> {
        db::plan::delete_plan(&*self.pool, plan_id).await
    }
}

pub struct PgSubscriptionStore {
    pool: Arc<PgPool>,
}

impl PgSubscriptionStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn create(
        &self,
        subscription: Subscription,
        replacing: Option<Cancellation>,
        now: NaiveDateTime,
    ) -> Res<Subscription> {
        let mut tx = self.pool.begin().await?;

        let expired =
            db::subscription::expire_lapsed_subscriptions(&mut *tx, subscription.user_id, now)
                .await?;
        if expired > 0 {
            log::info!(
                "Expired {} lapsed subscription(s) of user {}",
                expired,
                subscription.user_id
            );
        }

        if let Some(cancellation) = replacing {
            db::subscription::cancel_subscription(&mut *tx, cancellation_request(cancellation))
                .await?;
        }

        let row =
            db::subscription::insert_subscription(&mut *tx, subscription.to_write_request())
                .await?;

        tx.commit().await?;
        Subscription::try_from(row)
    }

    async fn get_by_id(&self, subscription_id: Uuid) -> Res<Subscription> {
        let row = db::subscription::get_subscription_by_id(&*self.pool, subscription_id).await?;
        Subscription::try_from(row)
    }

    async fn get_active_by_user_id(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> Res<Option<Subscription>> {
        db::subscription::get_active_subscription_by_user(&*self.pool, user_id, now)
            .await?
            .map(Subscription::try_from)
            .transpose()
    }

    async fn get_all_by_user_id(&self, user_id: Uuid) -> Res<Vec<Subscription>> {
        into_subscriptions(
            db::subscription::list_subscriptions_by_user(&*self.pool, user_id).await?,
        )
    }

    async fn get_by_status(&self, status: SubscriptionStatus) -> Res<Vec<Subscription>> {
        into_subscriptions(
            db::subscription::list_subscriptions_by_status(&*self.pool, status.as_str()).await?,
        )
    }

    async fn get_expiring_before(
        &self,
        before: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Res<Vec<Subscription>> {
        into_subscriptions(db::subscription::list_expiring_before(&*self.pool, before, now).await?)
    }

    async fn get_pending_renewal_before(&self, before: NaiveDateTime) -> Res<Vec<Subscription>> {
        into_subscriptions(
            db::subscription::list_pending_renewal_before(&*self.pool, before).await?,
        )
    }

    async fn update(&self, subscription: &Subscription) -> Res<Subscription> {
        let row = db::subscription::update_subscription(
            &*self.pool,
            subscription.id,
            subscription.to_write_request(),
        )
        .await?;
        Subscription::try_from(row)
    }

    async fn update_status(
        &self,
        subscription_id: Uuid,
        status: SubscriptionStatus,
    ) -> Res<Subscription> {
        let row = db::subscription::update_subscription_status(
            &*self.pool,
            subscription_id,
            status.as_str(),
        )
        .await?;
        Subscription::try_from(row)
    }

    async fn cancel(&self, cancellation: Cancellation) -> Res<Subscription> {
        let row =
            db::subscription::cancel_subscription(&*self.pool, cancellation_request(cancellation))
                .await?;
        Subscription::try_from(row)
    }

    async fn delete(&self, subscription_id: Uuid) -> Res<()> {
        db::subscription::delete_subscription(&*self.pool, subscription_id).await
    }
}
