//! JWT 토큰 처리.
//!
//! HS256 대칭 서명으로 Access Token / Refresh Token을 발급하고 검증합니다.
//! 토큰 본문은 `{ "data": <payload>, "iat": .., "exp": .., "jti": .. }` 형태이며,
//! 서명 키는 프로세스 시작 시 한 번 주입됩니다.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind as JwtErrorKind, Algorithm, DecodingKey, EncodingKey,
    Header, Validation,
};
use keygate_core::{Principal, RoleSummary};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// 서명된 토큰 본문.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims<T> {
    /// 호출자가 지정한 페이로드
    pub data: T,
    /// Issued At (Unix timestamp, 초)
    pub iat: i64,
    /// Expiration (Unix timestamp, 초)
    pub exp: i64,
    /// JWT ID - 같은 초에 발급된 토큰도 서로 구분되도록 합니다
    pub jti: String,
}

impl<T> TokenClaims<T> {
    /// 토큰이 만료되었는지 확인.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Access Token 페이로드.
///
/// 발급 시점의 사용자 정보와 권한 스냅샷입니다. 역할이 바뀌어도 토큰이 갱신될
/// 때까지는 이 스냅샷이 그대로 사용됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessPayload {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// 모든 역할 권한의 합집합 (정렬, 중복 없음)
    #[serde(rename = "permission")]
    pub permissions: Vec<String>,
    pub roles: Vec<RoleSummary>,
}

impl AccessPayload {
    /// Principal과 집계된 권한으로 페이로드를 만듭니다.
    pub fn new(principal: &Principal, permissions: Vec<String>) -> Self {
        Self {
            id: principal.id,
            email: principal.email.clone(),
            name: principal.name.clone(),
            created_at: principal.created_at,
            permissions,
            roles: principal.role_summaries(),
        }
    }
}

/// Refresh Token 페이로드.
///
/// `id` 외의 필드가 있으면 역직렬화에 실패하므로 Access Token은 refresh 토큰으로
/// 받아들여지지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshPayload {
    pub id: Uuid,
}

/// JWT 처리 에러.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("토큰 인코딩 실패: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),
    #[error("토큰이 만료되었습니다")]
    TokenExpired,
    #[error("유효하지 않은 토큰")]
    InvalidToken,
    #[error("토큰 클레임 형식 오류: {0}")]
    MalformedClaims(String),
}

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// 토큰 발급/검증기.
#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// 대칭 키로 코덱을 생성합니다.
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Access Token 발급.
    ///
    /// 직렬화 가능한 어떤 페이로드든 `data` 클레임에 담깁니다.
    pub fn issue_access<T: Serialize>(&self, payload: &T, ttl: Duration) -> Result<String, JwtError> {
        self.issue(payload, ttl)
    }

    /// Refresh Token 발급.
    pub fn issue_refresh(&self, payload: &RefreshPayload, ttl: Duration) -> Result<String, JwtError> {
        self.issue(payload, ttl)
    }

    fn issue<T: Serialize>(&self, payload: &T, ttl: Duration) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = TokenClaims {
            data: payload,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// 서명과 만료를 검증하고 클레임을 반환합니다.
    ///
    /// `exp`가 현재 시각 이하이면 만료로 처리하며 유예 시간은 없습니다.
    pub fn verify<T: DeserializeOwned>(&self, token: &str) -> Result<TokenClaims<T>, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<TokenClaims<T>>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                JwtErrorKind::ExpiredSignature => JwtError::TokenExpired,
                _ => JwtError::InvalidToken,
            }
        })?;

        if data.claims.is_expired() {
            return Err(JwtError::TokenExpired);
        }

        Ok(data.claims)
    }

    /// 서명만 검증하고 `exp`를 읽습니다. 만료된 토큰도 허용합니다.
    ///
    /// 로그아웃 시 폐기 항목의 수명을 계산하는 데 사용합니다.
    pub fn expiry_of(&self, token: &str) -> Result<i64, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;

        decode::<ExpiryClaim>(token, &self.decoding, &validation)
            .map(|data| data.claims.exp)
            .map_err(|e| match e.kind() {
                JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
                    JwtError::InvalidToken
                }
                _ => JwtError::MalformedClaims(e.to_string()),
            })
    }
}
