//! 인증 및 권한 부여.
//!
//! # 구성 요소
//!
//! - [`TokenCodec`]: Access/Refresh Token 발급 및 검증
//! - [`CredentialVerifier`]: 비밀번호 digest 검증 추상화
//! - [`authenticate`] / [`require_permissions`]: 접근 가드 미들웨어
//! - [`AuthContext`]: 인증된 요청 정보 추출기

mod jwt;
mod middleware;
mod password;

pub use jwt::{AccessPayload, JwtError, RefreshPayload, TokenClaims, TokenCodec};
pub use middleware::{
    authenticate, check_access, extract_token, require_permissions, AccessGuard, AuthContext,
    RequiredPermissions,
};
pub use password::{
    hash_password, validate_password_strength, verify_password, Argon2Verifier,
    CredentialVerifier, PasswordError, TIMING_DIGEST,
};
