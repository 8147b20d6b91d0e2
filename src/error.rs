use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct ValidationErrorBody {
    pub error: String,
    pub fields: BTreeMap<String, String>,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("not found")]
    NotFound,
    #[error("conflict")]
    Conflict,
    #[error("bad request")]
    BadRequest,
    #[error("forbidden")]
    Forbidden,
    #[error("validation failed")]
    Validation(BTreeMap<String, String>),
    #[error("internal error")]
    Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(_) => ApiError::Internal,
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        match self {
            ApiError::Validation(fields) => {
                HttpResponse::build(StatusCode::UNPROCESSABLE_ENTITY).json(ValidationErrorBody {
                    error: "validation failed".into(),
                    fields: fields.clone(),
                })
            }
            other => {
                let status = match other {
                    ApiError::NotFound => StatusCode::NOT_FOUND,
                    ApiError::Conflict => StatusCode::CONFLICT,
                    ApiError::BadRequest => StatusCode::BAD_REQUEST,
                    ApiError::Forbidden => StatusCode::FORBIDDEN,
                    ApiError::Validation(_) => unreachable!(),
                    ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                HttpResponse::build(status).json(ApiErrorBody {
                    error: other.to_string(),
                })
            }
        }
    }
}
