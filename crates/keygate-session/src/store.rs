//! 세션 저장소 trait 및 공통 정책.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use keygate_core::RedisConfig;
use tracing::warn;

use crate::error::{Result, SessionError};

/// 폐기 항목에 저장되는 값.
pub const REVOKED_MARKER: &str = "revoked";

/// refresh 토큰 매핑 키.
pub fn refresh_key(token: &str) -> String {
    format!("refresh_token:{}", token)
}

/// 폐기된 access 토큰 키.
pub fn blacklist_key(token: &str) -> String {
    format!("blacklist:{}", token)
}

/// 서버 측 세션/폐기 저장소.
///
/// 모든 작업은 멱등이며 여러 요청 처리 태스크에서 동시에 호출해도 안전해야 합니다.
/// 저장소에 접근할 수 없으면 `Err`를 반환하고, 호출자는 이를 거부로 처리합니다.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// refresh 토큰 → 사용자 ID 매핑을 `ttl` 동안 저장합니다.
    async fn put_refresh(&self, subject_id: &str, token: &str, ttl: Duration) -> Result<()>;

    /// refresh 토큰의 사용자 ID를 조회합니다.
    ///
    /// `None`은 폐기됨, 만료됨, 발급된 적 없음을 모두 의미하며 서로 구분하지 않습니다.
    async fn get_refresh_subject(&self, token: &str) -> Result<Option<String>>;

    /// refresh 토큰 매핑을 삭제합니다.
    async fn delete_refresh(&self, token: &str) -> Result<()>;

    /// access 토큰을 남은 수명(`remaining`) 동안 폐기 목록에 올립니다.
    async fn blacklist(&self, token: &str, remaining: Duration) -> Result<()>;

    /// access 토큰이 폐기 목록에 있는지 확인합니다.
    async fn is_blacklisted(&self, token: &str) -> Result<bool>;

    /// 저장소 연결 상태를 확인합니다.
    async fn ping(&self) -> Result<()>;
}

/// 타임아웃 및 재시도 정책.
///
/// 각 시도는 `timeout`으로 제한되며, 일시적 오류([`SessionError::is_transient`])에
/// 한해 최대 `max_retries`번 다시 시도합니다.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RedisConfig::default())
    }
}

impl RetryPolicy {
    /// Redis 설정에서 정책을 생성합니다.
    pub fn from_config(config: &RedisConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.operation_timeout_ms),
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }

    /// 정책에 따라 작업을 실행합니다.
    pub async fn run<T, F, Fut>(&self, operation: &'static str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 0;
        loop {
            let result = match tokio::time::timeout(self.timeout, attempt()).await {
                Ok(result) => result,
                Err(_) => Err(SessionError::Timeout(self.timeout.as_millis() as u64)),
            };

            match result {
                Err(err) if err.is_transient() && tries < self.max_retries => {
                    tries += 1;
                    warn!(operation, attempt = tries, error = %err, "Session store retry");
                    tokio::time::sleep(self.backoff).await;
                }
                other => return other,
            }
        }
    }
}
