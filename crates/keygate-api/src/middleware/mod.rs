//! API 서버용 HTTP middleware.
//!
//! 접근 가드는 [`crate::auth`]에 있고, 여기에는 인증과 무관한 요청 처리
//! middleware를 둡니다.

mod rate_limit;

pub use rate_limit::{rate_limit_middleware, RateLimitResult, RateLimiter};
