use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::model::TrainingError;
use crate::predictor::FeatureError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    InvalidFeatures(#[from] FeatureError),

    #[error("Not logged in")]
    Unauthorized,

    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(AuthError::DuplicateUsername) => StatusCode::CONFLICT,
            AppError::Auth(AuthError::InvalidCredentials) | AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Auth(AuthError::MissingField(_)) | AppError::InvalidFeatures(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Auth(AuthError::Store(_)) | AppError::Store(_) | AppError::Training(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        HttpResponse::build(status).json(ErrorBody {
            error: self.to_string(),
        })
    }
}
