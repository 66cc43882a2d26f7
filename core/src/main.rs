mod cors;
mod health;

use std::{sync::Arc, time::Instant};

use actix_web::{
    App, HttpServer,
    web::{self},
};
use api_subs::{
    ports::{CurrencyLookup, CurrencyStore, PlanLookup, PlanStore, SubscriptionStore, UserLookup},
    services::{currency::CurrencyService, plan::PlanService, sub::SubscriptionLifecycle},
    store::pg::{PgCurrencyStore, PgPlanStore, PgSubscriptionStore, PgUserStore},
};
use common::env_config::Config;
use health::StartedAt;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();
    let config_data = config.clone();
    let origin = config.cors_allowed_origin.clone();

    // init logger
    if config.console_logging_enabled {
        logger::setup(&config.log_file).expect("Failed to set up logger");
    }

    // init db connection
    let pool = db::setup(
        &config.database_url,
        config.is_production(),
        config.db_max_connections,
    )
    .await
    .expect("Failed to set up database");

    // wire stores into services
    let plan_store = Arc::new(PgPlanStore::new(pool.clone()));
    let subscriptions: Arc<dyn SubscriptionStore> =
        Arc::new(PgSubscriptionStore::new(pool.clone()));
    let users: Arc<dyn UserLookup> = Arc::new(PgUserStore::new(pool.clone()));
    let currency_store = Arc::new(PgCurrencyStore::new(pool.clone()));
    let currency_lookup: Arc<dyn CurrencyLookup> = currency_store.clone();
    let currency_catalogue: Arc<dyn CurrencyStore> = currency_store;
    let plan_lookup: Arc<dyn PlanLookup> = plan_store.clone();
    let plan_catalogue: Arc<dyn PlanStore> = plan_store;

    let lifecycle = Arc::new(SubscriptionLifecycle::new(
        subscriptions,
        plan_lookup,
        users,
    ));
    let plans = Arc::new(PlanService::new(plan_catalogue, currency_lookup));
    let currencies = Arc::new(CurrencyService::new(currency_catalogue));
    let started = web::Data::new(StartedAt(Instant::now()));

    log::info!(
        "Starting mymoney on {}:{} ({})",
        config.server_host,
        config.server_port,
        config.environment
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .app_data(web::Data::new(lifecycle.clone()))
            .app_data(web::Data::new(plans.clone()))
            .app_data(web::Data::new(currencies.clone()))
            .app_data(started.clone())
            .wrap(logger::middleware()) // 2nd
            .wrap(cors::middleware(&origin)) // 1st
            .service(
                web::scope("/api")
                    .service(health::mount_health())
                    .service(api_auth::mount_auth())
                    .service(api_subs::mount_plans())
                    .service(api_subs::mount_currencies())
                    .service(
                        web::scope("/secured")
                            .wrap(api_auth::auth_middleware(config_data.clone()))
                            .service(api_auth::mount_user())
                            .service(api_subs::mount_subs())
                            .service(api_subs::mount_admin()),
                    ),
            )
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
