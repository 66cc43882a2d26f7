use std::{collections::HashMap, sync::Arc};

use chrono::{Duration, Months, NaiveDateTime, SubsecRound, Utc};
use common::error::{AppError, ResExt, Res};
use uuid::Uuid;

use crate::{
    models::{
        plan::PlanInterval,
        sub::{Subscription, SubscriptionStatus, renewal_date},
    },
    ports::{Cancellation, PlanLookup, SubscriptionStore, UserLookup},
};

const REPLACED_REASON: &str = "replaced by new subscription";

/// Input of [`SubscriptionLifecycle::create_subscription`].
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub payment_method_id: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Creates, renews, cancels and re-plans user subscriptions.
///
/// Collaborators are injected as trait objects so the same rules run on
/// Postgres in production and on the in-memory stores in tests. Dropping a
/// returned future abandons the operation; creation is the only multi-write
/// step and the store runs it atomically.
#[derive(Clone)]
pub struct SubscriptionLifecycle {
    subscriptions: Arc<dyn SubscriptionStore>,
    plans: Arc<dyn PlanLookup>,
    users: Arc<dyn UserLookup>,
}

/// Drops sub-microsecond digits, which a Postgres `TIMESTAMP` cannot hold.
fn stored(at: NaiveDateTime) -> NaiveDateTime {
    at.trunc_subsecs(6)
}

fn now() -> NaiveDateTime {
    stored(Utc::now().naive_utc())
}

/// Treats blank payment method ids as absent.
fn supplied(payment_method_id: Option<String>) -> Option<String> {
    payment_method_id.filter(|pm| !pm.trim().is_empty())
}

fn window_end(now: NaiveDateTime, days: i64) -> Res<NaiveDateTime> {
    if days < 0 {
        return Err(AppError::InvalidArgument(
            "day window cannot be negative".to_string(),
        ));
    }
    Duration::try_days(days)
        .and_then(|window| now.checked_add_signed(window))
        .ok_or_else(|| AppError::InvalidArgument("day window out of range".to_string()))
}

impl SubscriptionLifecycle {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionStore>,
        plans: Arc<dyn PlanLookup>,
        users: Arc<dyn UserLookup>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            users,
        }
    }

    /// Subscribes a user to a plan, cancelling the user's current active
    /// subscription in the same write.
    pub async fn create_subscription(&self, req: NewSubscription) -> Res<Subscription> {
        self.users
            .get_by_id(req.user_id)
            .await
            .context("loading user")?;
        let plan = self
            .plans
            .get_by_id(req.plan_id)
            .await
            .context("loading plan")?;

        let now = now();
        let current = self
            .subscriptions
            .get_active_by_user_id(req.user_id, now)
            .await
            .context("loading active subscription")?;

        let payment_method_id = if self.plans.is_free(&plan) {
            None
        } else {
            Some(supplied(req.payment_method_id).ok_or_else(|| {
                AppError::InvalidArgument("payment method required for non-free plans".to_string())
            })?)
        };

        let start_date = stored(req.start_date);
        let end_date = stored(req.end_date);
        let subscription = Subscription {
            id: Uuid::nil(), // assigned by the store
            user_id: req.user_id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            start_date,
            end_date,
            renewal_date: renewal_date(&plan.interval, start_date, end_date),
            cancellation_date: None,
            last_payment_date: None,
            next_payment_attempt: None,
            payment_method_id,
            metadata: req.metadata,
            created_at: now,
            updated_at: now,
        };
        subscription.validate(&plan)?;

        let replacing = current.as_ref().map(|old| Cancellation {
            subscription_id: old.id,
            cancelled_at: old.cancellation_point(now),
            reason: REPLACED_REASON.to_string(),
        });

        let created = self
            .subscriptions
            .create(subscription, replacing, now)
            .await
            .context("creating subscription")?;

        if let Some(old) = current {
            log::info!(
                "Subscription {} of user {} replaced by {}",
                old.id,
                created.user_id,
                created.id
            );
        }
        log::info!(
            "Created subscription {} for user {} on plan {}",
            created.id,
            created.user_id,
            created.plan_id
        );
        Ok(created)
    }

    /// Extends an active subscription to `new_end_date` and records a payment.
    pub async fn renew_subscription(
        &self,
        subscription_id: Uuid,
        new_end_date: NaiveDateTime,
    ) -> Res<Subscription> {
        let mut subscription = self.get_subscription(subscription_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot renew a {} subscription",
                subscription.status
            )));
        }
        let plan = self
            .plans
            .get_by_id(subscription.plan_id)
            .await
            .context("loading plan")?;

        let now = now();
        let new_end_date = stored(new_end_date);
        subscription.end_date = new_end_date;
        subscription.renewal_date =
            renewal_date(&plan.interval, subscription.start_date, new_end_date);
        subscription.last_payment_date = Some(now);
        subscription.next_payment_attempt = None;
        subscription.validate(&plan)?;

        let renewed = self
            .subscriptions
            .update(&subscription)
            .await
            .context("renewing subscription")?;
        log::info!(
            "Renewed subscription {} until {}",
            renewed.id,
            renewed.end_date
        );
        Ok(renewed)
    }

    pub async fn cancel_subscription(&self, subscription_id: Uuid, reason: &str) -> Res<()> {
        let subscription = self.get_subscription(subscription_id).await?;
        if subscription.is_cancelled() {
            return Err(AppError::InvalidState(
                "subscription is already cancelled".to_string(),
            ));
        }

        self.subscriptions
            .cancel(Cancellation {
                subscription_id,
                cancelled_at: subscription.cancellation_point(now()),
                reason: reason.to_string(),
            })
            .await
            .context("cancelling subscription")?;
        log::info!("Cancelled subscription {}: {}", subscription_id, reason);
        Ok(())
    }

    /// Moves an active subscription to another plan.
    ///
    /// Same interval keeps the remaining time; a different interval starts a
    /// fresh period from now. `payment_method_id` is adopted when the new
    /// plan is paid and ignored when it is free.
    pub async fn change_plan(
        &self,
        subscription_id: Uuid,
        new_plan_id: Uuid,
        payment_method_id: Option<String>,
    ) -> Res<Subscription> {
        let mut subscription = self.get_subscription(subscription_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot change plan of a {} subscription",
                subscription.status
            )));
        }
        let old_plan = self
            .plans
            .get_by_id(subscription.plan_id)
            .await
            .context("loading current plan")?;
        let new_plan = self
            .plans
            .get_by_id(new_plan_id)
            .await
            .context("loading new plan")?;

        if self.plans.is_free(&new_plan) {
            subscription.payment_method_id = None;
        } else {
            if let Some(pm) = supplied(payment_method_id) {
                subscription.payment_method_id = Some(pm);
            }
            if subscription.payment_method_id.is_none() {
                return Err(AppError::InvalidArgument(
                    "payment method required for non-free plans".to_string(),
                ));
            }
        }

        let now = now();
        subscription.end_date = if old_plan.interval == new_plan.interval {
            now + (subscription.end_date - now)
        } else {
            let period = match new_plan.interval {
                PlanInterval::Yearly => Months::new(12),
                PlanInterval::Monthly | PlanInterval::Other(_) => Months::new(1),
            };
            now.checked_add_months(period)
                .ok_or_else(|| AppError::Internal("plan period out of range".to_string()))?
        };
        subscription.plan_id = new_plan.id;
        subscription.renewal_date = renewal_date(
            &new_plan.interval,
            subscription.start_date,
            subscription.end_date,
        );
        subscription.last_payment_date = Some(now);
        subscription.validate(&new_plan)?;

        let changed = self
            .subscriptions
            .update(&subscription)
            .await
            .context("changing subscription plan")?;
        log::info!(
            "Subscription {} moved from plan {} to {}",
            changed.id,
            old_plan.id,
            new_plan.id
        );
        Ok(changed)
    }

    pub async fn update_payment_method(
        &self,
        subscription_id: Uuid,
        payment_method_id: &str,
    ) -> Res<Subscription> {
        let mut subscription = self.get_subscription(subscription_id).await?;
        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidState(format!(
                "cannot update payment method of a {} subscription",
                subscription.status
            )));
        }
        let plan = self
            .plans
            .get_by_id(subscription.plan_id)
            .await
            .context("loading plan")?;
        if self.plans.is_free(&plan) {
            return Err(AppError::InvalidArgument(
                "free plans cannot carry a payment method".to_string(),
            ));
        }

        subscription.payment_method_id = Some(
            supplied(Some(payment_method_id.to_string())).ok_or_else(|| {
                AppError::InvalidArgument("payment method cannot be empty".to_string())
            })?,
        );
        subscription.validate(&plan)?;

        let updated = self
            .subscriptions
            .update(&subscription)
            .await
            .context("updating payment method")?;
        log::info!("Updated payment method of subscription {}", updated.id);
        Ok(updated)
    }

    /// Overwrites the status. Cancellation must go through
    /// [`Self::cancel_subscription`].
    pub async fn update_status(&self, subscription_id: Uuid, status: &str) -> Res<Subscription> {
        let status: SubscriptionStatus = status.parse()?;
        if status == SubscriptionStatus::Cancelled {
            return Err(AppError::InvalidArgument(
                "use cancel to cancel a subscription".to_string(),
            ));
        }

        let updated = self
            .subscriptions
            .update_status(subscription_id, status)
            .await
            .context("updating subscription status")?;
        log::info!("Subscription {} is now {}", updated.id, updated.status);
        Ok(updated)
    }

    pub async fn delete_subscription(&self, subscription_id: Uuid) -> Res<()> {
        self.subscriptions
            .delete(subscription_id)
            .await
            .context("deleting subscription")?;
        log::info!("Deleted subscription {}", subscription_id);
        Ok(())
    }

    pub async fn get_subscription(&self, subscription_id: Uuid) -> Res<Subscription> {
        log::debug!("Loading subscription {}", subscription_id);
        self.subscriptions
            .get_by_id(subscription_id)
            .await
            .context("loading subscription")
    }

    pub async fn get_active_subscription(&self, user_id: Uuid) -> Res<Option<Subscription>> {
        log::debug!("Loading active subscription of user {}", user_id);
        self.subscriptions
            .get_active_by_user_id(user_id, now())
            .await
            .context("loading active subscription")
    }

    pub async fn list_user_subscriptions(&self, user_id: Uuid) -> Res<Vec<Subscription>> {
        log::debug!("Listing subscriptions of user {}", user_id);
        self.subscriptions
            .get_all_by_user_id(user_id)
            .await
            .context("listing user subscriptions")
    }

    pub async fn list_by_status(&self, status: &str) -> Res<Vec<Subscription>> {
        let status: SubscriptionStatus = status.parse()?;
        log::debug!("Listing {} subscriptions", status);
        self.subscriptions
            .get_by_status(status)
            .await
            .context("listing subscriptions by status")
    }

    /// Active subscriptions ending within the next `days` days.
    pub async fn list_expiring(&self, days: i64) -> Res<Vec<Subscription>> {
        let now = now();
        let before = window_end(now, days)?;
        log::debug!("Listing subscriptions expiring before {}", before);
        self.subscriptions
            .get_expiring_before(before, now)
            .await
            .context("listing expiring subscriptions")
    }

    /// Active subscriptions whose renewal date falls within the next `days` days.
    pub async fn list_pending_renewals(&self, days: i64) -> Res<Vec<Subscription>> {
        let before = window_end(now(), days)?;
        log::debug!("Listing subscriptions pending renewal before {}", before);
        self.subscriptions
            .get_pending_renewal_before(before)
            .await
            .context("listing pending renewals")
    }
}
