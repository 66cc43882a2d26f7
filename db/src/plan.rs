use common::error::{AppError, Res};
use sqlx::{Executor, Postgres, types::Json};
use uuid::Uuid;

use crate::{
    dtos::plan::PlanWriteRequest, map_read_error, map_reference_error, models::plan::Plan,
};

pub async fn get_plan_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    plan_id: Uuid,
) -> Res<Plan> {
    sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE id = $1")
        .bind(plan_id)
        .fetch_one(executor)
        .await
        .map_err(|err| map_read_error(err, "plan"))
}

pub async fn list_plans<'e, E: Executor<'e, Database = Postgres>>(executor: E) -> Res<Vec<Plan>> {
    sqlx::query_as::<_, Plan>("SELECT * FROM plans ORDER BY sort_order, name")
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn list_public_plans<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<Plan>> {
    sqlx::query_as::<_, Plan>(
        "SELECT * FROM plans WHERE is_public AND is_active ORDER BY sort_order, name",
    )
    .fetch_all(executor)
    .await
    .map_err(AppError::from)
}

pub async fn list_active_plans<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<Plan>> {
    sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE is_active ORDER BY sort_order, name")
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: PlanWriteRequest,
) -> Res<Plan> {
    sqlx::query_as::<_, Plan>(
        r#"
        INSERT INTO plans (name, description, price, currency_id, billing_interval,
                           features, is_active, is_public, sort_order)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.currency_id)
    .bind(data.billing_interval)
    .bind(Json(data.features))
    .bind(data.is_active)
    .bind(data.is_public)
    .bind(data.sort_order)
    .fetch_one(executor)
    .await
    .map_err(|err| map_reference_error(err, "plan references an unknown currency"))
}

pub async fn update_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    plan_id: Uuid,
    data: PlanWriteRequest,
) -> Res<Plan> {
    sqlx::query_as::<_, Plan>(
        r#"
        UPDATE plans
        SET name = $2, description = $3, price = $4, currency_id = $5,
            billing_interval = $6, features = $7, is_active = $8, is_public = $9,
            sort_order = $10, updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(plan_id)
    .bind(data.name)
    .bind(data.description)
    .bind(data.price)
    .bind(data.currency_id)
    .bind(data.billing_interval)
    .bind(Json(data.features))
    .bind(data.is_active)
    .bind(data.is_public)
    .bind(data.sort_order)
    .fetch_one(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::RowNotFound => AppError::NotFound("plan".to_string()),
        other => map_reference_error(other, "plan references an unknown currency"),
    })
}

pub async fn delete_plan<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    plan_id: Uuid,
) -> Res<()> {
    let result = sqlx::query("DELETE FROM plans WHERE id = $1")
        .bind(plan_id)
        .execute(executor)
        .await
        .map_err(|err| map_reference_error(err, "plan still has subscriptions"))?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("plan".to_string()));
    }
    Ok(())
}
