use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

use crate::api::ErrorResponse;
use crate::books_gateway::GatewayError;
use crate::validation::ValidationError;

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Every failure a handler can end with, translated to a status code and a JSON body in one place
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("book not found")]
    NotFound,

    #[error("Gateway failure {0}")]
    Gateway(#[from] GatewayError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            ApiError::Gateway(err) => {
                tracing::error!("Request failed {}", err);
                INTERNAL_ERROR_MESSAGE.to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(ErrorResponse { error })
    }
}
