//! 인증/인가 에러 타입.
//!
//! 하위 계층(캐시 드라이버, 저장소 등)의 에러는 호출자에게 그대로 노출되지 않고
//! 이 모듈의 [`AuthError`]로 변환됩니다. 사용자에게는 에러 종류별 고정 메시지만
//! 보여지며, 원인은 내부 로그에만 남습니다.

use thiserror::Error;

/// 사용자에게 보여지는 에러 분류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 잘못되었거나 누락된 입력
    BadRequest,
    /// 토큰 누락/무효/만료/폐기, 또는 알 수 없는 refresh 매핑
    Unauthorized,
    /// 인증되었지만 권한 부족
    Forbidden,
    /// 리소스 없음 (인증 흐름에서는 사용하지 않음)
    NotFound,
    /// 중복 리소스
    Conflict,
    /// 예상하지 못한 내부 실패
    Internal,
}

impl ErrorKind {
    /// 에러 코드 문자열.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BadRequest => "BAD_REQUEST",
            ErrorKind::Unauthorized => "UNAUTHORIZED",
            ErrorKind::Forbidden => "FORBIDDEN",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

/// 인증/인가 에러.
#[derive(Debug, Error)]
pub enum AuthError {
    /// 잘못된 요청
    #[error("잘못된 요청: {0}")]
    BadRequest(String),

    /// 이메일 또는 비밀번호 불일치.
    ///
    /// 존재하지 않는 사용자와 잘못된 비밀번호를 구분하지 않습니다.
    #[error("이메일 또는 비밀번호가 올바르지 않습니다")]
    InvalidCredentials,

    /// 인증 실패
    #[error("인증이 필요합니다")]
    Unauthorized,

    /// 권한 부족
    #[error("접근 권한이 없습니다")]
    Forbidden,

    /// 리소스 없음
    #[error("리소스를 찾을 수 없습니다")]
    NotFound,

    /// 중복 리소스
    #[error("이미 존재합니다: {0}")]
    Conflict(String),

    /// 내부 에러 (원인은 로그 전용)
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 인증 작업을 위한 Result 타입.
pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    /// 에러 분류를 반환합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::BadRequest(_) => ErrorKind::BadRequest,
            AuthError::InvalidCredentials | AuthError::Unauthorized => ErrorKind::Unauthorized,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::NotFound => ErrorKind::NotFound,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// 사용자에게 보여줄 메시지.
    ///
    /// 내부 에러의 원인은 포함하지 않습니다.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "요청을 처리하는 중 오류가 발생했습니다".to_string(),
            other => other.to_string(),
        }
    }

    /// 내부 에러 생성 헬퍼.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        AuthError::Internal(cause.to_string())
    }
}
