use actix_web::HttpResponse;
use thiserror::Error;

pub type Res<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    // === CONVERSION ERRORS ===
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JWT error: {0}")]
    JWT(#[from] jsonwebtoken::errors::Error),

    #[error("Store error while {context}: {source}")]
    Store {
        context: String,
        #[source]
        source: sqlx::Error,
    },

    // === APPLICATION ERRORS ===
    #[error("Authorization error: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn to_http_response(&self) -> HttpResponse {
        let is_dev = cfg!(debug_assertions);

        let to_internal_json = |err_msg: &str| {
            if is_dev {
                serde_json::json!({ "error": err_msg })
            } else {
                serde_json::json!({ "error": "Internal server error" })
            }
        };
        let json_response = serde_json::json!({ "error": self.to_string() });

        match self {
            // === CONVERSION ERRORS ===
            AppError::Database(error) => {
                log::error!("Database error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::JWT(error) => {
                log::error!("JWT error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(&error.to_string()))
            }
            AppError::Store { context, source } => {
                log::error!("Store error while {}: {}", context, source);
                HttpResponse::InternalServerError().json(to_internal_json(&self.to_string()))
            }

            // === APPLICATION ERRORS ===
            AppError::Unauthorized(_) => HttpResponse::Unauthorized().json(json_response),
            AppError::Forbidden(_) => HttpResponse::Forbidden().json(json_response),
            AppError::NotFound(_) => HttpResponse::NotFound().json(json_response),
            AppError::InvalidArgument(_) => HttpResponse::BadRequest().json(json_response),
            AppError::InvalidState(_) => HttpResponse::Conflict().json(json_response),
            AppError::ValidationFailed(_) => {
                HttpResponse::UnprocessableEntity().json(json_response)
            }

            AppError::Internal(error) => {
                log::error!("Internal error: {}", error);
                HttpResponse::InternalServerError().json(to_internal_json(error))
            }
        }
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        self.to_http_response()
    }
}

/// Attaches the name of the failing operation to raw persistence errors.
///
/// Only `AppError::Database` is rewritten (into `AppError::Store`); domain
/// errors such as `NotFound` pass through untouched.
pub trait ResExt<T> {
    fn context(self, operation: &str) -> Res<T>;
}

impl<T> ResExt<T> for Res<T> {
    fn context(self, operation: &str) -> Res<T> {
        self.map_err(|err| match err {
            AppError::Database(source) => AppError::Store {
                context: operation.to_string(),
                source,
            },
            other => other,
        })
    }
}
