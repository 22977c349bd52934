//! Shared handler utilities: the JSON error body and its status mapping.

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use viz_common::{LoadError, RenderError};

use crate::playback::PlaybackError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

/// Error returned by API handlers.
#[derive(Debug)]
pub enum ApiError {
    Render(RenderError),
    Playback(PlaybackError),
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Render(e) => StatusCode::from_u16(e.http_status_code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            ApiError::Playback(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Render(e) => ErrorBody {
                error: e.code(),
                message: e.to_string(),
            },
            ApiError::Playback(e) => ErrorBody {
                error: "InvalidPlayback",
                message: e.to_string(),
            },
            ApiError::BadRequest(message) => ErrorBody {
                error: "BadRequest",
                message: message.clone(),
            },
        }
    }
}

impl From<RenderError> for ApiError {
    fn from(e: RenderError) -> Self {
        ApiError::Render(e)
    }
}

impl From<LoadError> for ApiError {
    fn from(e: LoadError) -> Self {
        ApiError::Render(e.into())
    }
}

impl From<PlaybackError> for ApiError {
    fn from(e: PlaybackError) -> Self {
        ApiError::Playback(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::to_string(&self.body()).unwrap_or_default();
        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
