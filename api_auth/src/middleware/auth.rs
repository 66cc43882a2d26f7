use std::{future::Future, pin::Pin, rc::Rc, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use common::jwt;

/// Validates `Authorization: Bearer <jwt>` and stores the `JwtClaims` in the
/// request extensions. Requests without a valid token get a 401.
pub struct AuthMiddleware {
    jwt_secret: Rc<String>,
}

impl AuthMiddleware {
    pub fn new(jwt_secret: String) -> Self {
        AuthMiddleware {
            jwt_secret: Rc::new(jwt_secret),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
            jwt_secret: self.jwt_secret.clone(),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
    jwt_secret: Rc<String>,
}

fn unauthorized(req: ServiceRequest, message: &str) -> ServiceResponse<actix_web::body::BoxBody> {
    let response = HttpResponse::Unauthorized()
        .json(serde_json::json!({ "error": message }))
        .map_into_boxed_body();
    req.into_response(response)
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|header| header.to_str().ok())
            .and_then(jwt::bearer_token)
            .map(str::to_owned);

        let Some(token) = token else {
            return Box::pin(async move {
                Ok(unauthorized(req, "No authorization token provided"))
            });
        };

        match jwt::validate_jwt(&token, &self.jwt_secret) {
            Ok(claims) => {
                req.extensions_mut().insert(claims);
                let srv = Arc::clone(&self.service);
                Box::pin(async move { srv.call(req).await.map(|res| res.map_into_boxed_body()) })
            }
            Err(err) => {
                log::debug!("Rejected bearer token: {}", err);
                Box::pin(async move { Ok(unauthorized(req, "Invalid token")) })
            }
        }
    }
}
