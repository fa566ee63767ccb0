//! 토큰 발급, 접근 가드 및 REST API 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - HS256 JWT 기반 Access/Refresh Token 발급 및 검증
//! - 로그인 / 로그아웃 / 토큰 갱신 흐름
//! - 권한 기반 접근 가드 미들웨어
//! - 사용자 및 역할 관리 API
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`auth`]: 토큰 코덱, 비밀번호 검증, 접근 가드
//! - [`services`]: 인증 / 사용자 / 역할 서비스
//! - [`repository`]: Principal / Role 저장소
//! - [`modules`]: 기능 모듈 및 권한 부트스트랩
//! - [`middleware`]: Rate limiting
//! - [`routes`]: REST API 엔드포인트

pub mod auth;
pub mod error;
pub mod middleware;
pub mod modules;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{
    authenticate, require_permissions, AccessGuard, AccessPayload, AuthContext,
    RequiredPermissions, TokenCodec,
};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use middleware::{rate_limit_middleware, RateLimiter};
pub use modules::{bootstrap_registry, default_modules, FeatureModule};
pub use routes::create_api_router;
pub use state::AppState;
