//! 세션/토큰 폐기 저장소.
//!
//! 공유 키-값 캐시(Redis)에 다음 두 종류의 키를 키별 만료 시간과 함께 저장합니다:
//! - `refresh_token:<token>` → 사용자 ID (refresh 토큰 매핑)
//! - `blacklist:<token>` → `"revoked"` (폐기된 access 토큰)
//!
//! 모든 작업은 단일 키 연산이며, 저장소에 접근할 수 없으면 에러를 반환합니다.
//! 호출자는 이 에러를 "신뢰하지 않음"으로 처리해야 합니다.

pub mod error;
pub mod memory;
pub mod redis;
pub mod store;

pub use error::{Result, SessionError};
pub use memory::InMemorySessionStore;
pub use self::redis::RedisSessionStore;
pub use store::{blacklist_key, refresh_key, RetryPolicy, SessionStore};
