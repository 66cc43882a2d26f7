use async_trait::async_trait;
use chrono::NaiveDateTime;
use common::error::Res;
use db::{
    dtos::currency::CurrencyWriteRequest,
    models::{currency::Currency, user::User},
};
use uuid::Uuid;

use crate::models::{
    plan::{Plan, PlanDraft},
    sub::{Subscription, SubscriptionStatus},
};

#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_by_id(&self, user_id: Uuid) -> Res<User>;
}

#[async_trait]
pub trait CurrencyLookup: Send + Sync {
    async fn get_by_id(&self, currency_id: Uuid) -> Res<Currency>;
}

#[async_trait]
pub trait CurrencyStore: CurrencyLookup {
    async fn get_all_active(&self) -> Res<Vec<Currency>>;
    async fn create(&self, draft: CurrencyWriteRequest) -> Res<Currency>;
    async fn update(&self, currency_id: Uuid, draft: CurrencyWriteRequest) -> Res<Currency>;
}

#[async_trait]
pub trait PlanLookup: Send + Sync {
    async fn get_by_id(&self, plan_id: Uuid) -> Res<Plan>;

    fn is_free(&self, plan: &Plan) -> bool {
        plan.is_free()
    }
}

#[async_trait]
pub trait PlanStore: PlanLookup {
    async fn create(&self, draft: PlanDraft) -> Res<Plan>;
    async fn get_all(&self) -> Res<Vec<Plan>>;
    async fn get_all_public(&self) -> Res<Vec<Plan>>;
    async fn get_all_active(&self) -> Res<Vec<Plan>>;
    async fn update(&self, plan_id: Uuid, draft: PlanDraft) -> Res<Plan>;
    async fn delete(&self, plan_id: Uuid) -> Res<()>;
}

/// Cancellation of one subscription, with the reason kept in its metadata.
#[derive(Debug, Clone)]
pub struct Cancellation {
    pub subscription_id: Uuid,
    pub cancelled_at: NaiveDateTime,
    pub reason: String,
}

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Inserts `subscription` atomically with its side effects: the user's
    /// lapsed `active` rows (end date at or before `now`) become `expired`
    /// and `replacing`, when given, is cancelled. Nothing is written if the
    /// insert fails.
    ///
    /// Writing `expired` here is the only stored transition to that status.
    /// Elsewhere expiry is derived from the end date; these rows are rewritten
    /// only so the one-active-per-user unique index admits the new row.
    async fn create(
        &self,
        subscription: Subscription,
        replacing: Option<Cancellation>,
        now: NaiveDateTime,
    ) -> Res<Subscription>;
    async fn get_by_id(&self, subscription_id: Uuid) -> Res<Subscription>;
    async fn get_active_by_user_id(
        &self,
        user_id: Uuid,
        now: NaiveDateTime,
    ) -> Res<Option<Subscription>>;
    async fn get_all_by_user_id(&self, user_id: Uuid) -> Res<Vec<Subscription>>;
    async fn get_by_status(&self, status: SubscriptionStatus) -> Res<Vec<Subscription>>;
    async fn get_expiring_before(
        &self,
        before: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Res<Vec<Subscription>>;
    async fn get_pending_renewal_before(&self, before: NaiveDateTime) -> Res<Vec<Subscription>>;
    async fn update(&self, subscription: &Subscription) -> Res<Subscription>;
    async fn update_status(
        &self,
        subscription_id: Uuid,
        status: SubscriptionStatus,
    ) -> Res<Subscription>;
    async fn cancel(&self, cancellation: Cancellation) -> Res<Subscription>;
    async fn delete(&self, subscription_id: Uuid) -> Res<()>;
}
