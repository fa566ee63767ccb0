//! Redis 기반 세션 저장소.
//!
//! `ConnectionManager`로 연결이 끊기면 자동으로 재연결하며, 각 명령은
//! [`RetryPolicy`]의 타임아웃과 재시도 규칙을 따릅니다.

use std::time::Duration;

use ::redis::{aio::ConnectionManager, AsyncCommands, Client};
use async_trait::async_trait;
use keygate_core::RedisConfig;
use tracing::{debug, info, instrument};

use crate::error::{Result, SessionError};
use crate::store::{blacklist_key, refresh_key, RetryPolicy, SessionStore, REVOKED_MARKER};

/// Redis 세션 저장소.
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    policy: RetryPolicy,
}

impl RedisSessionStore {
    /// Redis에 연결합니다.
    pub async fn connect(config: &RedisConfig) -> Result<Self> {
        info!("Connecting to Redis...");

        let client = Client::open(config.url.as_str())
            .map_err(|e| SessionError::Configuration(e.to_string()))?;

        let policy = RetryPolicy::from_config(config);
        let connection = tokio::time::timeout(policy.timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| SessionError::Timeout(config.operation_timeout_ms))??;

        info!("Redis connection established");

        Ok(Self { connection, policy })
    }

    /// Redis 상태를 확인합니다.
    pub async fn health_check(&self) -> Result<bool> {
        let result: String = self
            .policy
            .run("ping", || {
                let mut conn = self.connection.clone();
                async move {
                    let pong: String = ::redis::cmd("PING").query_async(&mut conn).await?;
                    Ok::<_, SessionError>(pong)
                }
            })
            .await?;

        Ok(result == "PONG")
    }

    async fn set_px(
        &self,
        operation: &'static str,
        key: String,
        value: String,
        ttl: Duration,
    ) -> Result<()> {
        let millis = ttl.as_millis() as u64;
        if millis == 0 {
            debug!(operation, "Skipping write with zero TTL");
            return Ok(());
        }

        self.policy
            .run(operation, || {
                let mut conn = self.connection.clone();
                let key = key.clone();
                let value = value.clone();
                async move {
                    let _: () = conn.pset_ex(key, value, millis).await?;
                    Ok::<_, SessionError>(())
                }
            })
            .await
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip_all, fields(subject_id = %subject_id))]
    async fn put_refresh(&self, subject_id: &str, token: &str, ttl: Duration) -> Result<()> {
        self.set_px("put_refresh", refresh_key(token), subject_id.to_string(), ttl)
            .await
    }

    async fn get_refresh_subject(&self, token: &str) -> Result<Option<String>> {
        let key = refresh_key(token);
        self.policy
            .run("get_refresh_subject", || {
                let mut conn = self.connection.clone();
                let key = key.clone();
                async move {
                    let subject: Option<String> = conn.get(key).await?;
                    Ok::<_, SessionError>(subject)
                }
            })
            .await
    }

    async fn delete_refresh(&self, token: &str) -> Result<()> {
        let key = refresh_key(token);
        self.policy
            .run("delete_refresh", || {
                let mut conn = self.connection.clone();
                let key = key.clone();
                async move {
                    let _: i64 = conn.del(key).await?;
                    Ok::<_, SessionError>(())
                }
            })
            .await
    }

    async fn blacklist(&self, token: &str, remaining: Duration) -> Result<()> {
        self.set_px(
            "blacklist",
            blacklist_key(token),
            REVOKED_MARKER.to_string(),
            remaining,
        )
        .await
    }

    async fn is_blacklisted(&self, token: &str) -> Result<bool> {
        let key = blacklist_key(token);
        self.policy
            .run("is_blacklisted", || {
                let mut conn = self.connection.clone();
                let key = key.clone();
                async move {
                    let exists: bool = conn.exists(key).await?;
                    Ok::<_, SessionError>(exists)
                }
            })
            .await
    }

    async fn ping(&self) -> Result<()> {
        if self.health_check().await? {
            Ok(())
        } else {
            Err(SessionError::Command("unexpected PING reply".to_string()))
        }
    }
}
