mod support;

use std::collections::HashMap;

use api_subs::{
    models::{plan::PlanInterval, sub::SubscriptionStatus},
    ports::SubscriptionStore,
};
use chrono::{Duration, Months, Timelike};
use common::error::AppError;
use support::{Fixture, missing_id, new_subscription, now};

#[tokio::test]
async fn created_subscription_satisfies_invariants() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let plan = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;

    for days in [1, 15, 31, 90, 365, 800] {
        let sub = fx
            .lifecycle
            .create_subscription(new_subscription(&user, &plan, days, Some("pm-1")))
            .await
            .unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert!(sub.end_date > sub.start_date);
        let renewal = sub.renewal_date.expect("monthly plans get a renewal date");
        assert!(renewal >= sub.start_date);
        assert!(renewal <= sub.end_date);
        assert!(sub.validate(&plan).is_ok());
    }
}

#[tokio::test]
async fn end_not_after_start_fails_validation() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let plan = fx.plan("Basic", "0", PlanInterval::Monthly).await;

    let mut req = new_subscription(&user, &plan, 30, None);
    req.end_date = req.start_date;
    assert!(matches!(
        fx.lifecycle.create_subscription(req.clone()).await,
        Err(AppError::ValidationFailed(_))
    ));

    req.end_date = req.start_date - Duration::days(1);
    assert!(matches!(
        fx.lifecycle.create_subscription(req).await,
        Err(AppError::ValidationFailed(_))
    ));
}

#[tokio::test]
async fn unknown_user_or_plan_is_not_found() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let plan = fx.plan("Basic", "0", PlanInterval::Monthly).await;

    let mut req = new_subscription(&user, &plan, 30, None);
    req.user_id = missing_id();
    assert!(matches!(
        fx.lifecycle.create_subscription(req).await,
        Err(AppError::NotFound(_))
    ));

    let mut req = new_subscription(&user, &plan, 30, None);
    req.plan_id = missing_id();
    assert!(matches!(
        fx.lifecycle.create_subscription(req).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn new_subscription_replaces_active_one() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;

    let first = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();
    let second = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &pro, 30, Some("pm-1")))
        .await
        .unwrap();

    let old = fx.lifecycle.get_subscription(first.id).await.unwrap();
    assert_eq!(old.status, SubscriptionStatus::Cancelled);
    assert!(old.cancellation_date.is_some());
    assert_eq!(
        old.metadata.get("cancellation_reason").map(String::as_str),
        Some("replaced by new subscription")
    );

    let active = fx
        .lifecycle
        .get_active_subscription(user.id)
        .await
        .unwrap()
        .expect("user should have an active subscription");
    assert_eq!(active.id, second.id);

    let actives = fx.lifecycle.list_by_status("active").await.unwrap();
    assert_eq!(actives.len(), 1);
}

#[tokio::test]
async fn failed_creation_leaves_current_subscription_untouched() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;

    let first = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();
    let result = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &pro, 30, None))
        .await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));

    let current = fx.lifecycle.get_subscription(first.id).await.unwrap();
    assert_eq!(current.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn lapsed_active_subscription_is_expired_on_create() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;

    let mut past = new_subscription(&user, &basic, 30, None);
    past.start_date = now() - Duration::days(60);
    past.end_date = now() - Duration::days(30);
    let lapsed = fx.lifecycle.create_subscription(past).await.unwrap();
    assert!(fx.lifecycle.get_active_subscription(user.id).await.unwrap().is_none());

    let fresh = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();

    let lapsed = fx.lifecycle.get_subscription(lapsed.id).await.unwrap();
    assert_eq!(lapsed.status, SubscriptionStatus::Expired);
    assert!(lapsed.has_expired(now()));
    assert_eq!(
        fx.lifecycle
            .get_active_subscription(user.id)
            .await
            .unwrap()
            .map(|sub| sub.id),
        Some(fresh.id)
    );
}

#[tokio::test]
async fn store_rejects_a_second_active_subscription() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;

    let first = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();

    // a concurrent creator that did not see `first`
    let mut duplicate = first.clone();
    duplicate.created_at = now();
    let result = fx.subscriptions.create(duplicate, None, now()).await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn free_plan_drops_supplied_payment_method() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0.00", PlanInterval::Monthly).await;

    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, Some("pm-1")))
        .await
        .unwrap();
    assert_eq!(sub.payment_method_id, None);

    let stored = fx.lifecycle.get_subscription(sub.id).await.unwrap();
    assert_eq!(stored.payment_method_id, None);
}

#[tokio::test]
async fn paid_plan_requires_payment_method() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;

    for payment_method in [None, Some("  ")] {
        let result = fx
            .lifecycle
            .create_subscription(new_subscription(&user, &pro, 30, payment_method))
            .await;
        assert!(matches!(result, Err(AppError::InvalidArgument(_))));
    }
    assert!(fx.lifecycle.list_user_subscriptions(user.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_is_one_way() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();

    fx.lifecycle
        .cancel_subscription(sub.id, "too expensive")
        .await
        .unwrap();

    let cancelled = fx.lifecycle.get_subscription(sub.id).await.unwrap();
    assert!(cancelled.is_cancelled());
    assert!(!cancelled.is_active(now()));
    let when = cancelled.cancellation_date.expect("cancellation date set");
    assert!(when >= cancelled.start_date && when <= cancelled.end_date);
    assert_eq!(
        cancelled.metadata.get("cancellation_reason").map(String::as_str),
        Some("too expensive")
    );

    assert!(matches!(
        fx.lifecycle.cancel_subscription(sub.id, "again").await,
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        fx.lifecycle.cancel_subscription(missing_id(), "none").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn renew_extends_active_subscription() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Yearly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &pro, 30, Some("pm-1")))
        .await
        .unwrap();

    let new_end = sub.end_date + Duration::days(365);
    let renewed = fx.lifecycle.renew_subscription(sub.id, new_end).await.unwrap();

    assert_eq!(renewed.end_date, new_end);
    assert_eq!(
        renewed.renewal_date,
        new_end.checked_sub_months(Months::new(1))
    );
    assert!(renewed.last_payment_date.is_some());
    assert_eq!(renewed.next_payment_attempt, None);
}

#[tokio::test]
async fn renew_rejects_cancelled_subscription() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();
    fx.lifecycle.cancel_subscription(sub.id, "bye").await.unwrap();

    let result = fx
        .lifecycle
        .renew_subscription(sub.id, sub.end_date + Duration::days(30))
        .await;
    assert!(matches!(result, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn renew_to_an_end_before_start_fails_validation() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();

    let result = fx
        .lifecycle
        .renew_subscription(sub.id, sub.start_date - Duration::days(1))
        .await;
    assert!(matches!(result, Err(AppError::ValidationFailed(_))));
}

#[tokio::test]
async fn same_interval_plan_change_preserves_remaining_time() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 10, None))
        .await
        .unwrap();

    let t = now();
    let changed = fx
        .lifecycle
        .change_plan(sub.id, pro.id, Some("pm-1".to_string()))
        .await
        .unwrap();

    let expected = t + Duration::days(10);
    let drift = (changed.end_date - expected).num_seconds().abs();
    assert!(drift <= 5, "end date drifted by {}s", drift);
    assert_eq!(changed.plan_id, pro.id);
    assert!(changed.last_payment_date.is_some());
}

#[tokio::test]
async fn different_interval_plan_change_starts_fresh_period() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let monthly = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;
    let yearly = fx.plan("Pro Annual", "99.00", PlanInterval::Yearly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &monthly, 10, Some("pm-1")))
        .await
        .unwrap();

    let t = now();
    let changed = fx.lifecycle.change_plan(sub.id, yearly.id, None).await.unwrap();

    let expected = t.checked_add_months(Months::new(12)).unwrap();
    let drift = (changed.end_date - expected).num_seconds().abs();
    assert!(drift <= 5, "end date drifted by {}s", drift);
    assert_eq!(changed.payment_method_id.as_deref(), Some("pm-1"));
    assert_eq!(
        changed.renewal_date,
        changed.end_date.checked_sub_months(Months::new(1))
    );
}

#[tokio::test]
async fn plan_change_to_free_clears_payment_method() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &pro, 30, Some("pm-1")))
        .await
        .unwrap();

    let changed = fx
        .lifecycle
        .change_plan(sub.id, basic.id, Some("pm-2".to_string()))
        .await
        .unwrap();
    assert_eq!(changed.payment_method_id, None);
}

#[tokio::test]
async fn plan_change_requires_active_subscription() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let other = fx.plan("Other", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();
    fx.lifecycle.cancel_subscription(sub.id, "bye").await.unwrap();

    assert!(matches!(
        fx.lifecycle.change_plan(sub.id, other.id, None).await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn payment_method_updates_only_on_paid_active_plans() {
    let fx = Fixture::new();
    let ana = fx.user("Ana");
    let bo = fx.user("Bo");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;

    let paid = fx
        .lifecycle
        .create_subscription(new_subscription(&ana, &pro, 30, Some("pm-1")))
        .await
        .unwrap();
    let updated = fx
        .lifecycle
        .update_payment_method(paid.id, "pm-2")
        .await
        .unwrap();
    assert_eq!(updated.payment_method_id.as_deref(), Some("pm-2"));
    assert!(matches!(
        fx.lifecycle.update_payment_method(paid.id, "").await,
        Err(AppError::InvalidArgument(_))
    ));

    let free = fx
        .lifecycle
        .create_subscription(new_subscription(&bo, &basic, 30, None))
        .await
        .unwrap();
    assert!(matches!(
        fx.lifecycle.update_payment_method(free.id, "pm-3").await,
        Err(AppError::InvalidArgument(_))
    ));

    fx.lifecycle.cancel_subscription(paid.id, "bye").await.unwrap();
    assert!(matches!(
        fx.lifecycle.update_payment_method(paid.id, "pm-4").await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
async fn status_update_never_cancels() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();

    let pending = fx.lifecycle.update_status(sub.id, "pending").await.unwrap();
    assert_eq!(pending.status, SubscriptionStatus::Pending);

    for id in [sub.id, missing_id()] {
        assert!(matches!(
            fx.lifecycle.update_status(id, "cancelled").await,
            Err(AppError::InvalidArgument(_))
        ));
    }
    assert!(matches!(
        fx.lifecycle.update_status(sub.id, "paused").await,
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.lifecycle.update_status(missing_id(), "failed").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn create_then_get_round_trips() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;

    let mut req = support::new_subscription(&user, &pro, 45, Some("pm-1"));
    req.metadata = HashMap::from([("source".to_string(), "web".to_string())]);
    let created = fx.lifecycle.create_subscription(req.clone()).await.unwrap();
    let fetched = fx.lifecycle.get_subscription(created.id).await.unwrap();

    assert_eq!(fetched, created);
    assert_eq!(fetched.user_id, req.user_id);
    assert_eq!(fetched.plan_id, req.plan_id);
    assert_eq!(fetched.start_date, req.start_date);
    assert_eq!(fetched.end_date, req.end_date);
    assert_eq!(fetched.payment_method_id.as_deref(), Some("pm-1"));
    assert_eq!(fetched.metadata, req.metadata);
}

#[tokio::test]
async fn dates_are_kept_at_microsecond_precision() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;

    let mut req = new_subscription(&user, &pro, 30, Some("pm-1"));
    req.start_date = req.start_date.with_nanosecond(123_456_789).unwrap();
    req.end_date = req.end_date.with_nanosecond(987_654_321).unwrap();
    let created = fx.lifecycle.create_subscription(req).await.unwrap();

    assert_eq!(created.start_date.nanosecond(), 123_456_000);
    assert_eq!(created.end_date.nanosecond(), 987_654_000);
    assert_eq!(
        fx.lifecycle.get_subscription(created.id).await.unwrap(),
        created
    );

    let renewed = fx
        .lifecycle
        .renew_subscription(
            created.id,
            (created.end_date + Duration::days(30))
                .with_nanosecond(1_999)
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(renewed.end_date.nanosecond(), 1_000);
    assert!(renewed.last_payment_date.is_some_and(|paid| paid.nanosecond() % 1_000 == 0));
}

#[tokio::test]
async fn window_queries_pick_subscriptions_due_soon() {
    let fx = Fixture::new();
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;

    let soon = fx
        .lifecycle
        .create_subscription(new_subscription(&fx.user("Ana"), &basic, 5, None))
        .await
        .unwrap();
    let later = fx
        .lifecycle
        .create_subscription(new_subscription(&fx.user("Bo"), &basic, 60, None))
        .await
        .unwrap();

    let expiring = fx.lifecycle.list_expiring(7).await.unwrap();
    assert_eq!(
        expiring.iter().map(|sub| sub.id).collect::<Vec<_>>(),
        vec![soon.id]
    );

    // renewal for the 5-day subscription is clamped to its start
    let pending = fx.lifecycle.list_pending_renewals(0).await.unwrap();
    assert_eq!(
        pending.iter().map(|sub| sub.id).collect::<Vec<_>>(),
        vec![soon.id]
    );
    let pending = fx.lifecycle.list_pending_renewals(40).await.unwrap();
    assert_eq!(pending.len(), 2);
    assert!(pending.iter().any(|sub| sub.id == later.id));

    assert!(matches!(
        fx.lifecycle.list_expiring(-1).await,
        Err(AppError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn delete_removes_subscription() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let basic = fx.plan("Basic", "0", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &basic, 30, None))
        .await
        .unwrap();

    fx.lifecycle.delete_subscription(sub.id).await.unwrap();
    assert!(matches!(
        fx.lifecycle.get_subscription(sub.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        fx.lifecycle.delete_subscription(sub.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn free_to_paid_upgrade_scenario() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let plan_a = fx.plan("A", "0", PlanInterval::Monthly).await;
    let plan_b = fx.plan("B", "9.99", PlanInterval::Monthly).await;

    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &plan_a, 30, None))
        .await
        .unwrap();
    assert_eq!(sub.payment_method_id, None);

    assert!(matches!(
        fx.lifecycle.change_plan(sub.id, plan_b.id, None).await,
        Err(AppError::InvalidArgument(_))
    ));

    fx.lifecycle
        .change_plan(sub.id, plan_b.id, Some("pm-1".to_string()))
        .await
        .unwrap();

    let active = fx
        .lifecycle
        .get_active_subscription(user.id)
        .await
        .unwrap()
        .expect("user should have an active subscription");
    assert_eq!(active.plan_id, plan_b.id);
    assert_eq!(active.payment_method_id.as_deref(), Some("pm-1"));
}
