//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! AppState는 `Arc`로 래핑되어 Axum의 State extractor를 통해 핸들러에 주입됩니다.
//! 서명 키와 권한 레지스트리는 시작 시 한 번 설정되며 이후 바뀌지 않습니다.

use std::sync::Arc;

use keygate_core::{PermissionRegistry, RateLimitConfig, SecurityConfig};
use keygate_session::SessionStore;

use crate::auth::{AccessGuard, CredentialVerifier, TokenCodec};
use crate::middleware::RateLimiter;
use crate::repository::{PrincipalRepository, RoleRepository};
use crate::services::{AuthService, RoleService, UserService};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 권한 카탈로그
    pub registry: Arc<PermissionRegistry>,

    /// 세션/폐기 저장소
    pub sessions: Arc<dyn SessionStore>,

    /// 접근 가드 - 토큰 검증 및 폐기 확인
    pub guard: AccessGuard,

    /// 로그인 / 로그아웃 / 토큰 갱신
    pub auth: Arc<AuthService>,

    /// 사용자 관리
    pub users: Arc<UserService>,

    /// 역할 관리
    pub roles: Arc<RoleService>,

    /// 인증 endpoint Rate Limiter (비활성화 시 `None`)
    pub rate_limiter: Option<RateLimiter>,

    /// API 버전
    pub version: String,

    /// 서버 시작 시간
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(
        security: &SecurityConfig,
        registry: Arc<PermissionRegistry>,
        sessions: Arc<dyn SessionStore>,
        principals: Arc<dyn PrincipalRepository>,
        roles: Arc<dyn RoleRepository>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&security.jwt_secret));
        let guard = AccessGuard::new(Arc::clone(&codec), Arc::clone(&sessions));

        let auth = AuthService::new(
            security,
            codec,
            Arc::clone(&sessions),
            Arc::clone(&principals),
            verifier,
        );
        let users = UserService::new(Arc::clone(&principals));
        let role_service = RoleService::new(roles, principals, Arc::clone(&registry));

        Self {
            registry,
            sessions,
            guard,
            auth: Arc::new(auth),
            users: Arc::new(users),
            roles: Arc::new(role_service),
            rate_limiter: Some(RateLimiter::new(RateLimitConfig::default())),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: chrono::Utc::now(),
        }
    }

    /// Rate Limit 설정을 적용합니다. 기본값은 [`RateLimitConfig::default`]입니다.
    pub fn with_rate_limit(mut self, config: &RateLimitConfig) -> Self {
        self.rate_limiter = config.enabled.then(|| RateLimiter::new(config.clone()));
        self
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 AppState 생성 헬퍼.
///
/// 인메모리 저장소와 기본 기능 모듈의 권한으로 채워진 레지스트리를 사용합니다.
#[cfg(test)]
pub fn create_test_state() -> AppState {
    create_test_state_with_sessions(Arc::new(keygate_session::InMemorySessionStore::new()))
}

/// 지정한 세션 저장소로 테스트용 AppState를 생성합니다.
#[cfg(test)]
pub fn create_test_state_with_sessions(sessions: Arc<dyn SessionStore>) -> AppState {
    use crate::auth::Argon2Verifier;
    use crate::modules::{bootstrap_registry, default_modules};
    use crate::repository::{InMemoryPrincipalRepository, InMemoryRoleRepository};

    let security = SecurityConfig {
        jwt_secret: "test-secret-key-that-is-at-least-32-bytes".to_string(),
        ..Default::default()
    };
    let registry = Arc::new(PermissionRegistry::new());
    bootstrap_registry(&registry, &default_modules());

    let roles = InMemoryRoleRepository::new();
    let principals = InMemoryPrincipalRepository::new(roles.clone());

    AppState::new(
        &security,
        registry,
        sessions,
        Arc::new(principals),
        Arc::new(roles),
        Arc::new(Argon2Verifier),
    )
}
