//! Mutex-guarded in-process stores with the same constraints as the
//! Postgres schema: at most one `active` subscription per user, and plans
//! cannot be deleted while a subscription points at them.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use common::error::{AppError, Res};
use db::{
    dtos::currency::CurrencyWriteRequest,
    models::{currency::Currency, user::User},
};
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

const CANCELLATION_REASON_KEY: &str = "cancellation_reason";

fn lock<T>(mutex: &Mutex<T>) -> Res<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, email: &str, name: &str) -> Res<User> {
        let created = now();
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: created,
            updated_at: created,
            is_admin: false,
        };
        lock(&self.users)?.insert(user.id, user.clone());
        Ok(user)
    }
}

#[async_trait]
impl UserLookup for MemoryUserStore {
    async fn get_by_id(&self, user_id: Uuid) -> Res<User> {
        lock(&self.users)?
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("user".to_string()))
    }
}

#[derive(Default)]
pub struct MemoryCurrencyStore {
    currencies: Mutex<HashMap<Uuid, Currency>>,
}

impl MemoryCurrencyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, code: &str, is_active: bool) -> Res<Currency> {
        let created = now();
        let currency = Currency {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            symbol: code.to_string(),
            is_active,
            created_at: created,
            updated_at: created,
        };
        lock(&self.currencies)?.insert(currency.id, currency.clone());
        Ok(currency)
    }
}

#[async_trait]
impl CurrencyLookup for MemoryCurrencyStore {
    async fn get_by_id(&self, currency_id: Uuid) -> Res<Currency> {
        lock(&self.currencies)?
            .get(&currency_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("currency".to_string()))
    }
}

fn ensure_unique_code(
    currencies: &HashMap<Uuid, Currency>,
    code: &str,
    ignoring: Option<Uuid>,
) -> Res<()> {
    let taken = currencies
        .values()
        .any(|other| other.code == code && Some(other.id) != ignoring);
    if taken {
        return Err(AppError::InvalidState(
            "currency code already exists".to_string(),
        ));
    }
    Ok(())
}

#[async_trait]
impl CurrencyStore for MemoryCurrencyStore {
    async fn get_all_active(&self) -> Res<Vec<Currency>> {
        let mut currencies: Vec<Currency> = lock(&self.currencies)?
            .values()
            .filter(|currency| currency.is_active)
            .cloned()
            .collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(currencies)
    }

    async fn create(&self, draft: CurrencyWriteRequest) -> Res<Currency> {
        let mut currencies = lock(&self.currencies)?;
        ensure_unique_code(&currencies, &draft.code, None)?;

        let created = now();
        let currency = Currency {
            id: Uuid::new_v4(),
            code: draft.code,
            name: draft.name,
            symbol: draft.symbol,
            is_active: draft.is_active,
            created_at: created,
            updated_at: created,
        };
        currencies.insert(currency.id, currency.clone());
        Ok(currency)
    }

    async fn update(&self, currency_id: Uuid, draft: CurrencyWriteRequest) -> Res<Currency> {
        let mut currencies = lock(&self.currencies)?;
        if !currencies.contains_key(&currency_id) {
            return Err(AppError::NotFound("currency".to_string()));
        }
        ensure_unique_code(&currencies, &draft.code, Some(currency_id))?;

        let currency = currencies
            .get_mut(&currency_id)
            .ok_or_else(|| AppError::NotFound("currency".to_string()))?;
        currency.code = draft.code;
        currency.name = draft.name;
        currency.symbol = draft.symbol;
        currency.is_active = draft.is_active;
        currency.updated_at = now();
        Ok(currency.clone())
    }
}

#[derive(Default)]
pub struct MemoryPlanStore {
    plans: Mutex<HashMap<Uuid, Plan>>,
    subscriptions: Option<Arc<MemorySubscriptionStore>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan store whose deletes are restricted by the subscriptions kept in
    /// `subscriptions`.
    pub fn referenced_by(subscriptions: Arc<MemorySubscriptionStore>) -> Self {
        Self {
            plans: Mutex::default(),
            subscriptions: Some(subscriptions),
        }
    }

    fn sorted(&self, keep: impl Fn(&Plan) -> bool) -> Res<Vec<Plan>> {
        let mut plans: Vec<Plan> = lock(&self.plans)?
            .values()
            .filter(|plan| keep(plan))
            .cloned()
            .collect();
        plans.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(plans)
    }
}

#[async_trait]
impl PlanLookup for MemoryPlanStore {
    async fn get_by_id(&self, plan_id: Uuid) -> Res<Plan> {
        lock(&self.plans)?
            .get(&plan_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("plan".to_string()))
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn create(&self, draft: PlanDraft) -> Res<Plan> {
        let created = now();
        let plan = Plan {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            price: draft.price,
            currency_id: draft.currency_id,
            interval: draft.interval,
            features: draft.features,
            is_active: draft.is_active,
            is_public: draft.is_public,
            sort_order: draft.sort_order,
            created_at: created,
            updated_at: created,
        };
        lock(&self.plans)?.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn get_all(&self) -> Res<Vec<Plan>> {
        self.sorted(|_| true)
    }

    async fn get_all_public(&self) -> Res<Vec<Plan>> {
        self.sorted(|plan| plan.is_public && plan.is_active)
    }

    async fn get_all_active(&self) -> Res<Vec<Plan>> {
        self.sorted(|plan| plan.is_active)
    }

    async fn update(&self, plan_id: Uuid, draft: PlanDraft) -> Res<Plan> {
        let mut plans = lock(&self.plans)?;
        let plan = plans
            .get_mut(&plan_id)
            .ok_or_else(|| AppError::NotFound("plan".to_string()))?;
        plan.name = draft.name;
        plan.description = draft.description;
        plan.price = draft.price;
        plan.currency_id = draft.currency_id;
        plan.interval = draft.interval;
        plan.features = draft.features;
        plan.is_active = draft.is_active;
        plan.is_public = draft.is_public;
        plan.sort_order = draft.sort_order;
        plan.updated_at = now();
        Ok(plan.clone())
    }

    async fn delete(&self, plan_id: Uuid) -> Res<()> {
        let mut plans = lock(&self.plans)?;
        if !plans.contains_key(&plan_id) {
            return Err(AppError::NotFound("plan".to_string()));
        }
        if let Some(subscriptions) = &self.subscriptions {
            if subscriptions.references_plan(plan_id)? {
                return Err(AppError::InvalidState(
                    "plan still has subscriptions".to_string(),
                ));
            }
        }
        plans.remove(&plan_id);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemorySubscriptionStore {
    subscriptions: Mutex<HashMap<Uuid, Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn references_plan(&self, plan_id: Uuid) -> Res<bool> {
        Ok(lock(&self.subscriptions)?
            .values()
            .any(|sub| sub.plan_id == plan_id))
    }

    fn filtered(
        &self,
        keep: impl Fn(&Subscription) -> bool,
        key: impl Fn(&Subscription) -> NaiveDateTime,
    ) -> Res<Vec<Subscription>> {
        let mut subscriptions: Vec<Subscription> = lock(&self.subscriptions)?
            .values()
            .filter(|sub| keep(sub))
            .cloned()
            .collect();
        subscriptions.sort_by_key(|sub| key(sub));
        Ok(subscriptions)
    }
}

/// Fails when making `candidate` active would leave the user with two
/// `active` rows, ignoring the rows listed in `ignoring`.
fn ensure_single_active(
    subscriptions: &HashMap<Uuid, Subscription>,
    candidate: &Subscription,
    ignoring: &[Uuid],
) -> Res<()> {
    if candidate.status != SubscriptionStatus::Active {
        return Ok(());
    }
    let conflict = subscriptions.values().any(|other| {
        other.user_id == candidate.user_id
            && other.status == SubscriptionStatus::Active
            && other.id != candidate.id
            && !ignoring.contains(&other.id)
    });
    if conflict {
        return Err(AppError::InvalidState(
            "user already has an active subscription".to_string(),
        ));
    }
    Ok(())
}

fn apply_cancellation(subscription: &mut Subscription, cancellation: Cancellation) {
    subscription.status = SubscriptionStatus::Cancelled;
    subscription.cancellation_date = Some(cancellation.cancelled_at);
    subscription
        .metadata
        .insert(CANCELLATION_REASON_KEY.to_string(), cancellation.reason);
    subscription.updated_at = now();
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn create(
        &self,
        mut subscription: Subscription,
        replacing: Option<Cancellation>,
        now_at: NaiveDateTime,
    ) -> Res<Subscription> {
        let mut subscriptions = lock(&self.subscriptions)?;

        if let Some(cancellation) = &replacing {
            if !subscriptions.contains_key(&cancellation.subscription_id) {
                return Err(AppError::NotFound("subscription".to_string()));
            }
        }

        let lapsed: Vec<Uuid> = subscriptions
            .values()
            .filter(|sub| {
                sub.user_id == subscription.user_id
                    && sub.status == SubscriptionStatus::Active
                    && sub.end_date <= now_at
            })
            .map(|sub| sub.id)
            .collect();

        let mut released = lapsed.clone();
        if let Some(cancellation) = &replacing {
            released.push(cancellation.subscription_id);
        }

        let created = now();
        subscription.id = Uuid::new_v4();
        subscription.created_at = created;
        subscription.updated_at = created;
        ensure_single_active(&subscriptions, &subscription, &released)?;

        for id in lapsed {
            if let Some(sub) = subscriptions.get_mut(&id) {
                sub.status = SubscriptionStatus::Expired;
                sub.updated_at = created;
            }
        }
        if let Some(cancellation) = replacing {
            if let Some(sub) = subscriptions.get_mut(&cancellation.subscription_id) {
                apply_cancellation(sub, cancellation);
            }
        }

        subscriptions.insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn get_by_id(&self, subscription_id: Uuid) -> Res<Subscription> {
        lock(&self.subscriptions)?
            .get(&subscription_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("subscription".to_string()))
    }

    async fn get_active_by_user_id(
        &self,
        user_id: Uuid,
        now_at: NaiveDateTime,
    ) -> Res<Option<Subscription>> {
        Ok(lock(&self.subscriptions)?
            .values()
            .find(|sub| {
                sub.user_id == user_id
                    && sub.status == SubscriptionStatus::Active
                    && sub.end_date > now_at
            })
            .cloned())
    }

    async fn get_all_by_user_id(&self, user_id: Uuid) -> Res<Vec<Subscription>> {
        let mut subscriptions = self.filtered(|sub| sub.user_id == user_id, |sub| sub.created_at)?;
        subscriptions.reverse();
        Ok(subscriptions)
    }

    async fn get_by_status(&self, status: SubscriptionStatus) -> Res<Vec<Subscription>> {
        self.filtered(|sub| sub.status == status, |sub| sub.end_date)
    }

    async fn get_expiring_before(
        &self,
        before: NaiveDateTime,
        now_at: NaiveDateTime,
    ) -> Res<Vec<Subscription>> {
        self.filtered(
            |sub| {
                sub.status == SubscriptionStatus::Active
                    && sub.end_date <= before
                    && sub.end_date > now_at
            },
            |sub| sub.end_date,
        )
    }

    async fn get_pending_renewal_before(&self, before: NaiveDateTime) -> Res<Vec<Subscription>> {
        self.filtered(
            |sub| {
                sub.status == SubscriptionStatus::Active
                    && sub.renewal_date.is_some_and(|renewal| renewal <= before)
            },
            |sub| sub.renewal_date.unwrap_or(sub.end_date),
        )
    }

    async fn update(&self, subscription: &Subscription) -> Res<Subscription> {
        let mut subscriptions = lock(&self.subscriptions)?;
        if !subscriptions.contains_key(&subscription.id) {
            return Err(AppError::NotFound("subscription".to_string()));
        }
        ensure_single_active(&subscriptions, subscription, &[])?;

        let mut updated = subscription.clone();
        updated.updated_at = now();
        subscriptions.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn update_status(
        &self,
        subscription_id: Uuid,
        status: SubscriptionStatus,
    ) -> Res<Subscription> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let mut updated = subscriptions
            .get(&subscription_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("subscription".to_string()))?;
        updated.status = status;
        ensure_single_active(&subscriptions, &updated, &[])?;

        updated.updated_at = now();
        subscriptions.insert(updated.id, updated.clone());
        Ok(updated)
    }

    async fn cancel(&self, cancellation: Cancellation) -> Res<Subscription> {
        let mut subscriptions = lock(&self.subscriptions)?;
        let subscription = subscriptions
            .get_mut(&cancellation.subscription_id)
            .ok_or_else(|| AppError::NotFound("subscription".to_string()))?;
        apply_cancellation(subscription, cancellation);
        Ok(subscription.clone())
    }

    async fn delete(&self, subscription_id: Uuid) -> Res<()> {
        lock(&self.subscriptions)?
            .remove(&subscription_id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("subscription".to_string()))
    }
}
