use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::camera::error::CameraError;

/// HTTP-facing error: a status code plus a JSON body naming what failed.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[cfg(test)]
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CameraError> for AppError {
    fn from(err: CameraError) -> Self {
        let status = match err {
            CameraError::AlreadyRecording | CameraError::NotRecording => StatusCode::CONFLICT,
            CameraError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
            CameraError::Hardware(_) => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use crate::camera::error::CameraError;

    use super::AppError;

    #[test]
    fn camera_errors_map_to_status_codes() {
        assert_eq!(
            AppError::from(CameraError::AlreadyRecording).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(CameraError::NotRecording).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(CameraError::NotReady).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::from(CameraError::hardware("boom")).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
