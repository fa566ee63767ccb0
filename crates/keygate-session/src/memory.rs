//! 인메모리 세션 저장소.
//!
//! 단일 프로세스 개발 환경과 테스트용입니다. 만료는 조회 시점에 판단하고,
//! 만료된 항목은 쓰기 시점에 함께 정리합니다. `tokio::time`을 사용하므로
//! 일시정지된 테스트 런타임에서 시간을 앞당길 수 있습니다.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{Result, SessionError};
use crate::store::{blacklist_key, refresh_key, SessionStore, REVOKED_MARKER};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// 인메모리 세션 저장소.
#[derive(Debug, Clone)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// 저장소 가용성을 설정합니다. `false`이면 모든 작업이 연결 오류를 반환합니다.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// 보관 중인 항목 수 (아직 정리되지 않은 만료 항목 포함).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// 키의 남은 수명을 반환합니다.
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.expires_at - now)
    }

    fn ensure_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::Connection("session store unavailable".to_string()))
        }
    }

    async fn set(&self, key: String, value: String, ttl: Duration) -> Result<()> {
        self.ensure_available()?;
        if ttl.is_zero() {
            return Ok(());
        }
        let now = Instant::now();
        let entry = Entry {
            value,
            expires_at: now + ttl,
        };

        let mut entries = self.entries.write().await;
        entries.retain(|_, existing| existing.expires_at > now);
        entries.insert(key, entry);
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.ensure_available()?;
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put_refresh(&self, subject_id: &str, token: &str, ttl: Duration) -> Result<()> {
        self.set(refresh_key(token), subject_id.to_string(), ttl)
            .await
    }

    async fn get_refresh_subject(&self, token: &str) -> Result<Option<String>> {
        self.get(&refresh_key(token)).await
    }

    async fn delete_refresh(&self, token: &str) -> Result<()> {
        self.ensure_available()?;
        self.entries.write().await.remove(&refresh_key(token));
        Ok(())
    }

    async fn blacklist(&self, token: &str, remaining: Duration) -> Result<()> {
        self.set(blacklist_key(token), REVOKED_MARKER.to_string(), remaining)
            .await
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool> {
        Ok(self.get(&blacklist_key(token)).await?.is_some())
    }

    async fn ping(&self) -> Result<()> {
        self.ensure_available()
    }
}
