use std::{sync::Arc, time::Instant};

use actix_web::{
    Error, HttpMessage,
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    web,
};
use colored::Colorize;
use common::{env_config::Config, jwt::JwtClaims};
use futures::future::{LocalBoxFuture, Ready, ready};
use log::info;
use uuid::Uuid;

/// Per-request id, available to handlers through the request extensions.
#[derive(Debug, Clone, Copy)]
pub struct RequestId(pub Uuid);

/// Logs one line per request: status, method, path, elapsed time and the
/// authenticated user, if any.
pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let started = Instant::now();
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();

        let request_id = RequestId(Uuid::new_v4());
        req.extensions_mut().insert(request_id);

        let console_logging_enabled = req
            .app_data::<web::Data<Arc<Config>>>()
            .map(|config| config.console_logging_enabled)
            .unwrap_or(true);
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let res = srv.call(req).await?;

            if console_logging_enabled {
                // claims are inserted by the auth middleware further down the chain
                let user_id = res
                    .request()
                    .extensions()
                    .get::<JwtClaims>()
                    .map(|claims| claims.user_id.to_string())
                    .unwrap_or_else(|| "None".to_string());

                let status_code = res.status().as_u16();
                let colored_status = match status_code {
                    200..=299 => status_code.to_string().green(),
                    300..=399 => status_code.to_string().yellow(),
                    400..=499 => status_code.to_string().bright_red(),
                    _ => status_code.to_string().red(),
                };
                let colored_method = match method.as_str() {
                    "GET" => method.blue(),
                    "POST" => method.yellow(),
                    "PUT" => method.purple(),
                    "DELETE" => method.red(),
                    _ => method.normal(),
                };
                let target = if query_string.is_empty() {
                    path
                } else {
                    format!("{}?{}", path, query_string)
                };

                info!(
                    "[{}] {} {} {} user_id={} request_id={}",
                    colored_status,
                    colored_method,
                    target.bright_white(),
                    format!("({}ms)", started.elapsed().as_millis()).bright_black(),
                    user_id.bright_blue(),
                    request_id.0,
                );
            }

            Ok(res.map_into_boxed_body())
        })
    }
}
