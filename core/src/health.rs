use std::{sync::Arc, time::Instant};

use actix_web::{HttpMessage, HttpRequest, Responder, get, web};
use common::{env_config::Config, error::Res, http::Success};
use logger::RequestId;
use serde::Serialize;
use sqlx::PgPool;

/// When the process started serving, for the uptime report.
pub struct StartedAt(pub Instant);

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    environment: String,
    timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_id: Option<String>,
    database: &'static str,
    uptime_seconds: u64,
}

#[get("")]
async fn get_health() -> Res<impl Responder> {
    Success::ok(serde_json::json!({ "status": "ok" }))
}

/// Liveness plus a database round trip. Reports `degraded` instead of
/// failing when Postgres is unreachable.
#[get("/status")]
async fn get_status(
    req: HttpRequest,
    config: web::Data<Arc<Config>>,
    pool: web::Data<Arc<PgPool>>,
    started: web::Data<StartedAt>,
) -> Res<impl Responder> {
    let pg_pool: &PgPool = &pool;
    let database = match sqlx::query("SELECT 1").execute(pg_pool).await {
        Ok(_) => "up",
        Err(err) => {
            log::warn!("Health check could not reach the database: {}", err);
            "down"
        }
    };

    Success::ok(HealthStatus {
        status: if database == "up" { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        environment: config.environment.clone(),
        timestamp: chrono::Utc::now(),
        request_id: req
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.to_string()),
        database,
        uptime_seconds: started.0.elapsed().as_secs(),
    })
}

pub fn mount_health() -> actix_web::Scope {
    web::scope("/health")
        .service(get_health)
        .service(get_status)
}
