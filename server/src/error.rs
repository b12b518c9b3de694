use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use menu::orders::OrderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl From<OrderError> for AppError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::UnknownProduct(id) => AppError::UnknownProduct(id),
            OrderError::Empty | OrderError::InvalidQuantity(_) => AppError::MalformedPayload,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::MalformedPayload | AppError::UnknownProduct { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
