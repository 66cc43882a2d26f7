mod support;

use std::str::FromStr;

use api_subs::models::plan::PlanInterval;
use bigdecimal::BigDecimal;
use chrono::Duration;
use common::error::AppError;
use db::dtos::currency::CurrencyWriteRequest;
use support::{Fixture, missing_id, new_subscription};

#[tokio::test]
async fn creates_and_lists_plans_in_catalogue_order() {
    let fx = Fixture::new();

    let mut pro = fx.draft("Pro", "9.99", PlanInterval::Monthly);
    pro.sort_order = 2;
    let mut basic = fx.draft("Basic", "0", PlanInterval::Monthly);
    basic.sort_order = 1;
    let mut hidden = fx.draft("Internal", "0", PlanInterval::Yearly);
    hidden.is_public = false;
    let mut retired = fx.draft("Legacy", "4.99", PlanInterval::Monthly);
    retired.is_active = false;

    for draft in [pro, basic, hidden, retired] {
        fx.catalogue.create_plan(draft).await.unwrap();
    }

    let names = |plans: Vec<api_subs::models::plan::Plan>| {
        plans.into_iter().map(|plan| plan.name).collect::<Vec<_>>()
    };
    assert_eq!(
        names(fx.catalogue.list_plans().await.unwrap()),
        vec!["Internal", "Legacy", "Basic", "Pro"]
    );
    assert_eq!(
        names(fx.catalogue.list_public_plans().await.unwrap()),
        vec!["Basic", "Pro"]
    );
    assert_eq!(
        names(fx.catalogue.list_active_plans().await.unwrap()),
        vec!["Internal", "Basic", "Pro"]
    );
}

#[tokio::test]
async fn rejects_malformed_drafts() {
    let fx = Fixture::new();

    let mut nameless = fx.draft("Pro", "9.99", PlanInterval::Monthly);
    nameless.name = " ".to_string();
    assert!(matches!(
        fx.catalogue.create_plan(nameless).await,
        Err(AppError::InvalidArgument(_))
    ));

    let mut negative = fx.draft("Pro", "9.99", PlanInterval::Monthly);
    negative.price = BigDecimal::from_str("-1").unwrap();
    assert!(matches!(
        fx.catalogue.create_plan(negative).await,
        Err(AppError::InvalidArgument(_))
    ));

    for price in ["0.001", "9.999", "10000000000"] {
        let mut out_of_range = fx.draft("Pro", "9.99", PlanInterval::Monthly);
        out_of_range.price = BigDecimal::from_str(price).unwrap();
        assert!(
            matches!(
                fx.catalogue.create_plan(out_of_range).await,
                Err(AppError::InvalidArgument(_))
            ),
            "price {} should be rejected",
            price
        );
    }

    for price in ["9.90", "9999999999.99", "100"] {
        fx.catalogue
            .create_plan(fx.draft("Edge", price, PlanInterval::Monthly))
            .await
            .unwrap();
    }

    let mut unknown_currency = fx.draft("Pro", "9.99", PlanInterval::Monthly);
    unknown_currency.currency_id = missing_id();
    assert!(matches!(
        fx.catalogue.create_plan(unknown_currency).await,
        Err(AppError::NotFound(_))
    ));

    let eur = fx.currencies.add("EUR", false).unwrap();
    let mut inactive_currency = fx.draft("Pro", "9.99", PlanInterval::Monthly);
    inactive_currency.currency_id = eur.id;
    assert!(matches!(
        fx.catalogue.create_plan(inactive_currency).await,
        Err(AppError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn updates_and_deletes_plans() {
    let fx = Fixture::new();
    let plan = fx
        .catalogue
        .create_plan(fx.draft("Pro", "9.99", PlanInterval::Monthly))
        .await
        .unwrap();

    let updated = fx
        .catalogue
        .update_plan(plan.id, fx.draft("Pro", "12.50", PlanInterval::Yearly))
        .await
        .unwrap();
    assert_eq!(updated.interval, PlanInterval::Yearly);
    assert_eq!(updated.price, BigDecimal::from_str("12.5").unwrap());

    assert!(matches!(
        fx.catalogue
            .update_plan(missing_id(), fx.draft("X", "1", PlanInterval::Monthly))
            .await,
        Err(AppError::NotFound(_))
    ));

    fx.catalogue.delete_plan(plan.id).await.unwrap();
    assert!(matches!(
        fx.catalogue.get_plan(plan.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn refuses_to_delete_a_plan_with_subscriptions() {
    let fx = Fixture::new();
    let user = fx.user("Ana");
    let pro = fx.plan("Pro", "9.99", PlanInterval::Monthly).await;
    let sub = fx
        .lifecycle
        .create_subscription(new_subscription(&user, &pro, 30, Some("pm_1")))
        .await
        .unwrap();

    assert!(matches!(
        fx.catalogue.delete_plan(pro.id).await,
        Err(AppError::InvalidState(_))
    ));
    assert_eq!(fx.catalogue.get_plan(pro.id).await.unwrap().id, pro.id);

    let renewed = fx
        .lifecycle
        .renew_subscription(sub.id, sub.end_date + Duration::days(30))
        .await
        .unwrap();
    assert!(renewed.end_date > sub.end_date);

    fx.lifecycle.delete_subscription(sub.id).await.unwrap();
    fx.catalogue.delete_plan(pro.id).await.unwrap();
}

fn currency(code: &str, name: &str, symbol: &str, is_active: bool) -> CurrencyWriteRequest {
    CurrencyWriteRequest {
        code: code.to_string(),
        name: name.to_string(),
        symbol: symbol.to_string(),
        is_active,
    }
}

#[tokio::test]
async fn created_currency_prices_new_plans() {
    let fx = Fixture::new();

    let eur = fx
        .money
        .create_currency(currency(" eur ", "Euro", "€", true))
        .await
        .unwrap();
    assert_eq!(eur.code, "EUR");
    assert_eq!(eur.name, "Euro");

    let mut draft = fx.draft("Pro", "9.99", PlanInterval::Monthly);
    draft.currency_id = eur.id;
    let plan = fx.catalogue.create_plan(draft).await.unwrap();
    assert_eq!(plan.currency_id, eur.id);

    let codes: Vec<String> = fx
        .money
        .list_active_currencies()
        .await
        .unwrap()
        .into_iter()
        .map(|currency| currency.code)
        .collect();
    assert_eq!(codes, vec!["EUR", "USD"]);
}

#[tokio::test]
async fn currency_codes_are_unique_and_fields_required() {
    let fx = Fixture::new();

    assert!(matches!(
        fx.money
            .create_currency(currency("usd", "Dollar", "$", true))
            .await,
        Err(AppError::InvalidState(_))
    ));
    assert!(matches!(
        fx.money
            .create_currency(currency("GBP", "Pound", " ", true))
            .await,
        Err(AppError::InvalidArgument(_))
    ));
    assert!(matches!(
        fx.money
            .update_currency(missing_id(), currency("GBP", "Pound", "£", true))
            .await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn deactivated_currency_is_hidden_and_refused_for_plans() {
    let fx = Fixture::new();

    let retired = fx
        .money
        .update_currency(fx.usd.id, currency("USD", "US Dollar", "$", false))
        .await
        .unwrap();
    assert!(!retired.is_active);
    assert!(fx.money.list_active_currencies().await.unwrap().is_empty());

    assert!(matches!(
        fx.catalogue
            .create_plan(fx.draft("Pro", "9.99", PlanInterval::Monthly))
            .await,
        Err(AppError::InvalidArgument(_))
    ));
}
