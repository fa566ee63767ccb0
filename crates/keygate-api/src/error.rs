//! 통합 API 에러 응답 타입.
//!
//! 모든 엔드포인트는 실패 시 같은 형식으로 응답합니다.
//!
//! ```json
//! {
//!   "status": 401,
//!   "code": "UNAUTHORIZED",
//!   "message": "인증이 필요합니다"
//! }
//! ```
//!
//! 내부 에러의 원인은 응답에 포함되지 않고 로그에만 남습니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use keygate_core::{AuthError, ErrorKind};
use serde::{Deserialize, Serialize};
use tracing::error;

/// 에러 응답 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// HTTP 상태 코드
    pub status: u16,
    /// 에러 코드 (예: "UNAUTHORIZED", "FORBIDDEN")
    pub code: String,
    /// 사람이 읽을 수 있는 메시지
    pub message: String,
}

impl ApiErrorResponse {
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            code: code.into(),
            message: message.into(),
        }
    }
}

/// 에러 분류별 HTTP 상태 코드.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::BadRequest => StatusCode::BAD_REQUEST,
        ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// 핸들러와 미들웨어의 에러 타입.
#[derive(Debug)]
pub struct ApiError(pub AuthError);

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if let AuthError::Internal(cause) = &self.0 {
            error!(cause = %cause, "Internal error");
        }

        let status = status_for(kind);
        let body = ApiErrorResponse::new(status, kind.code(), self.0.public_message());
        (status, Json(body)).into_response()
    }
}

/// API 핸들러 Result 타입.
pub type ApiResult<T> = Result<T, ApiError>;
