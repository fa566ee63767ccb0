//! 세션 저장소 오류 타입.

use thiserror::Error;

/// 세션 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum SessionError {
    /// 연결 실패
    #[error("Session store connection error: {0}")]
    Connection(String),

    /// 명령 타임아웃
    #[error("Session store operation timed out after {0}ms")]
    Timeout(u64),

    /// 명령 실행 오류
    #[error("Session store command error: {0}")]
    Command(String),

    /// 잘못된 설정
    #[error("Session store configuration error: {0}")]
    Configuration(String),
}

/// 세션 저장소 작업을 위한 Result 타입.
pub type Result<T> = std::result::Result<T, SessionError>;

impl SessionError {
    /// 재시도 가능한 일시적 오류인지 확인합니다.
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::Connection(_) | SessionError::Timeout(_))
    }
}

impl From<redis::RedisError> for SessionError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            SessionError::Connection(err.to_string())
        } else if err.is_timeout() {
            SessionError::Timeout(0)
        } else {
            SessionError::Command(err.to_string())
        }
    }
}
