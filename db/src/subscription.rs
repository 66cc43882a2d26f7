use chrono::NaiveDateTime;
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, types::Json};
use uuid::Uuid;

use crate::{
    dtos::subscription::{CancellationRequest, SubscriptionWriteRequest},
    map_read_error, map_write_error,
    models::subscription::UserSubscription,
};

const ACTIVE_CONFLICT: &str = "user already has an active subscription";

pub async fn insert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: SubscriptionWriteRequest,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        INSERT INTO user_subscriptions (
            user_id, plan_id, status, start_date, end_date, renewal_date,
            cancellation_date, last_payment_date, next_payment_attempt,
            payment_method_id, metadata
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(data.plan_id)
    .bind(data.status)
    .bind(data.start_date)
    .bind(data.end_date)
    .bind(data.renewal_date)
    .bind(data.cancellation_date)
    .bind(data.last_payment_date)
    .bind(data.next_payment_attempt)
    .bind(data.payment_method_id)
    .bind(Json(data.metadata))
    .fetch_one(executor)
    .await
    .map_err(|err| map_write_error(err, ACTIVE_CONFLICT))
}

pub async fn get_subscription_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>("SELECT * FROM user_subscriptions WHERE id = $1")
        .bind(subscription_id)
        .fetch_one(executor)
        .await
        .map_err(|err| map_read_error(err, "subscription"))
}

/// The user's `active` subscription whose end date is still ahead of `now`.
pub async fn get_active_subscription_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    now: NaiveDateTime,
) -> Res<Option<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        SELECT * FROM user_subscriptions
        WHERE user_id = $1 AND status = 'active' AND end_date > $2
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn list_subscriptions_by_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
) -> Res<Vec<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        "SELECT * FROM user_subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn list_subscriptions_by_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    status: &str,
) -> Res<Vec<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        "SELECT * FROM user_subscriptions WHERE status = $1 ORDER BY end_date",
    )
    .bind(status)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn list_expiring_before<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    before: NaiveDateTime,
    now: NaiveDateTime,
) -> Res<Vec<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        SELECT * FROM user_subscriptions
        WHERE status = 'active' AND end_date <= $1 AND end_date > $2
        ORDER BY end_date
        "#,
    )
    .bind(before)
    .bind(now)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn list_pending_renewal_before<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    before: NaiveDateTime,
) -> Res<Vec<UserSubscription>> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        SELECT * FROM user_subscriptions
        WHERE status = 'active' AND renewal_date IS NOT NULL AND renewal_date <= $1
        ORDER BY renewal_date
        "#,
    )
    .bind(before)
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn update_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
    data: SubscriptionWriteRequest,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        UPDATE user_subscriptions
        SET plan_id = $2, status = $3, start_date = $4, end_date = $5,
            renewal_date = $6, cancellation_date = $7, last_payment_date = $8,
            next_payment_attempt = $9, payment_method_id = $10, metadata = $11,
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(subscription_id)
    .bind(data.plan_id)
    .bind(data.status)
    .bind(data.start_date)
    .bind(data.end_date)
    .bind(data.renewal_date)
    .bind(data.cancellation_date)
    .bind(data.last_payment_date)
    .bind(data.next_payment_attempt)
    .bind(data.payment_method_id)
    .bind(Json(data.metadata))
    .fetch_one(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::RowNotFound => AppError::NotFound("subscription".to_string()),
        other => map_write_error(other, ACTIVE_CONFLICT),
    })
}

pub async fn update_subscription_status<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
    status: &str,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        UPDATE user_subscriptions
        SET status = $2, updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(subscription_id)
    .bind(status)
    .fetch_one(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::RowNotFound => AppError::NotFound("subscription".to_string()),
        other => map_write_error(other, ACTIVE_CONFLICT),
    })
}

/// Marks the subscription cancelled and records the reason under
/// `metadata.cancellation_reason` in one statement.
pub async fn cancel_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: CancellationRequest,
) -> Res<UserSubscription> {
    sqlx::query_as::<_, UserSubscription>(
        r#"
        UPDATE user_subscriptions
        SET status = 'cancelled',
            cancellation_date = $2,
            metadata = metadata || jsonb_build_object('cancellation_reason', $3::text),
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(data.subscription_id)
    .bind(data.cancelled_at)
    .bind(data.reason)
    .fetch_one(executor)
    .await
    .map_err(|err| map_read_error(err, "subscription"))
}

/// Flips the user's `active` rows whose end date has passed to `expired`.
pub async fn expire_lapsed_subscriptions<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: Uuid,
    now: NaiveDateTime,
) -> Res<u64> {
    let result = sqlx::query(
        r#"
        UPDATE user_subscriptions
        SET status = 'expired', updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE user_id = $1 AND status = 'active' AND end_date <= $2
        "#,
    )
    .bind(user_id)
    .bind(now)
    .execute(executor)
    .await?;
    Ok(result.rows_affected())
}

pub async fn delete_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: Uuid,
) -> Res<()> {
    let result = sqlx::query("DELETE FROM user_subscriptions WHERE id = $1")
        .bind(subscription_id)
        .execute(executor)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("subscription".to_string()));
    }
    Ok(())
}
