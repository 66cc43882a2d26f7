use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    dtos::currency::CurrencyWriteRequest, map_read_error, map_write_error,
    models::currency::Currency,
};

const CODE_CONFLICT: &str = "currency code already exists";

pub async fn get_currency_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    currency_id: Uuid,
) -> Res<Currency> {
    sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE id = $1")
        .bind(currency_id)
        .fetch_one(executor)
        .await
        .map_err(|err| map_read_error(err, "currency"))
}

pub async fn list_active_currencies<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
) -> Res<Vec<Currency>> {
    sqlx::query_as::<_, Currency>("SELECT * FROM currencies WHERE is_active ORDER BY code")
        .fetch_all(executor)
        .await
        .map_err(AppError::from)
}

pub async fn insert_currency<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: CurrencyWriteRequest,
) -> Res<Currency> {
    sqlx::query_as::<_, Currency>(
        r#"
        INSERT INTO currencies (code, name, symbol, is_active)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(data.code)
    .bind(data.name)
    .bind(data.symbol)
    .bind(data.is_active)
    .fetch_one(executor)
    .await
    .map_err(|err| map_write_error(err, CODE_CONFLICT))
}

pub async fn update_currency<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    currency_id: Uuid,
    data: CurrencyWriteRequest,
) -> Res<Currency> {
    sqlx::query_as::<_, Currency>(
        r#"
        UPDATE currencies
        SET code = $2, name = $3, symbol = $4, is_active = $5,
            updated_at = (NOW() AT TIME ZONE 'utc')
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(currency_id)
    .bind(data.code)
    .bind(data.name)
    .bind(data.symbol)
    .bind(data.is_active)
    .fetch_one(executor)
    .await
    .map_err(|err| match err {
        sqlx::Error::RowNotFound => AppError::NotFound("currency".to_string()),
        other => map_write_error(other, CODE_CONFLICT),
    })
}
