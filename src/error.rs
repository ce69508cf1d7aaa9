use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tract_onnx::prelude::{tract_ndarray, TractError};

use crate::models::FailResponse;

/// Failures of the inference engine, from startup loading through per-request
/// runs. Load failures are fatal to startup; run failures are fatal only to
/// the request that triggered them.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("model not loaded")]
    NotLoaded,

    #[error("model load failed: {0}")]
    Load(TractError),

    #[error("model download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("bad input tensor shape: {0}")]
    Shape(#[from] tract_ndarray::ShapeError),

    #[error("inference failed: {0}")]
    Run(TractError),

    #[error("model produced no output")]
    EmptyOutput,
}

/// Request-level error taxonomy. Client-caused variants surface their own
/// message with a 4xx status; server-caused variants log the detail and
/// return only a generic message with a 5xx status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid image file")]
    Decode(#[source] image::ImageError),

    #[error("Payload content length greater than maximum allowed: {0} bytes")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    Multipart(#[from] actix_multipart::MultipartError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Persistence(#[from] rusqlite::Error),

    #[error("history retrieval failed")]
    HistoryUnavailable,

    #[error("worker pool unavailable")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Decode(_) | ApiError::Multipart(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Inference(_)
            | ApiError::Persistence(_)
            | ApiError::HistoryUnavailable
            | ApiError::Blocking(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            ApiError::BadRequest(_)
            | ApiError::Decode(_)
            | ApiError::PayloadTooLarge(_)
            | ApiError::Multipart(_) => self.to_string(),
            ApiError::HistoryUnavailable => {
                "Terjadi kesalahan dalam mengambil riwayat prediksi".to_string()
            }
            ApiError::Inference(_) | ApiError::Persistence(_) | ApiError::Blocking(_) => {
                "Terjadi kesalahan dalam melakukan prediksi".to_string()
            }
        };

        if self.status_code().is_server_error() {
            log::error!("request failed: {self:?}");
        }

        HttpResponse::build(self.status_code()).json(FailResponse::new(message))
    }
}
