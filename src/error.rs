//! HTTP-facing error type.
//!
//! Module errors ([`StoreError`], [`MetadataError`], [`SelectorError`]) are
//! wrapped into [`AppError`], which decides the status code and the
//! human-readable message. The taxonomy is flat: 400 for anything the
//! caller can fix, 500 for everything else.

use crate::metadata::MetadataError;
use crate::selector::SelectorError;
use crate::store::StoreError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0} parameter is required")]
    MissingParameter(&'static str),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error(transparent)]
    Selector(#[from] SelectorError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingParameter(_)
            | AppError::MalformedPayload(_)
            | AppError::Selector(_)
            | AppError::Metadata(_)
            | AppError::Store(StoreError::InvalidPath(_)) => StatusCode::BAD_REQUEST,
            AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short message shown to the user.
    pub fn message(&self) -> String {
        match self {
            AppError::MissingParameter(_) | AppError::MalformedPayload(_) => self.to_string(),
            AppError::Selector(_) => "Invalid query expression".to_string(),
            AppError::Metadata(MetadataError::NoExif) => {
                "No EXIF data found in the image.".to_string()
            }
            AppError::Metadata(MetadataError::Malformed(_)) => {
                "Failed to extract EXIF data. Make sure the image contains EXIF metadata."
                    .to_string()
            }
            AppError::Store(StoreError::InvalidPath(_)) => "Invalid image path".to_string(),
            AppError::Store(_) => "Failed to fetch the image".to_string(),
            AppError::Internal(_) => "An error occurred while processing the image.".to_string(),
        }
    }

    /// Detail appended to the message, when there is more to say.
    pub fn detail(&self) -> Option<String> {
        match self {
            AppError::MissingParameter(_)
            | AppError::MalformedPayload(_)
            | AppError::Metadata(MetadataError::NoExif) => None,
            AppError::Metadata(MetadataError::Malformed(detail)) => Some(detail.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            success: false,
            message: self.message(),
            error: self.detail(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{status}: {self}");
        } else {
            warn!("{status}: {self}");
        }
        (status, Json(self.body())).into_response()
    }
}
