//! 로그인 / 로그아웃 / 토큰 갱신.
//!
//! # 흐름
//!
//! - 로그인: 자격 증명 검증 → 권한 집계 → Access/Refresh Token 발급 →
//!   refresh 매핑 저장
//! - 로그아웃: access 토큰을 남은 수명 동안 폐기 목록에 올리고 refresh 매핑 삭제
//! - 갱신: refresh 매핑 확인 → Principal 재조회 → 새 권한 스냅샷으로 Access Token
//!   재발급 (refresh 토큰은 그대로)
//!
//! 세션 저장소나 Principal 저장소의 장애는 모두 `Internal`로 변환되며, 어떤
//! 경우에도 토큰을 발급하지 않습니다.

use std::sync::Arc;

use chrono::{Duration, Utc};
use keygate_core::{aggregate_permissions, AuthError, AuthResult, Principal, SecurityConfig};
use keygate_session::SessionStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::auth::{
    AccessPayload, CredentialVerifier, JwtError, RefreshPayload, TokenCodec, TIMING_DIGEST,
};
use crate::repository::{PrincipalRepository, RepositoryError};

/// 로그인 / 갱신 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access Token에 담긴 페이로드
    pub data: AccessPayload,
}

/// 인증 서비스.
pub struct AuthService {
    principals: Arc<dyn PrincipalRepository>,
    verifier: Arc<dyn CredentialVerifier>,
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl AuthService {
    pub fn new(
        security: &SecurityConfig,
        codec: Arc<TokenCodec>,
        sessions: Arc<dyn SessionStore>,
        principals: Arc<dyn PrincipalRepository>,
        verifier: Arc<dyn CredentialVerifier>,
    ) -> Self {
        Self {
            principals,
            verifier,
            codec,
            sessions,
            access_ttl: security.access_ttl(),
            refresh_ttl: security.refresh_ttl(),
        }
    }

    /// 이메일/비밀번호로 로그인합니다.
    ///
    /// 존재하지 않는 이메일과 잘못된 비밀번호는 같은 `InvalidCredentials`로
    /// 응답합니다.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> AuthResult<AuthResponse> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::BadRequest(
                "이메일과 비밀번호가 필요합니다".to_string(),
            ));
        }

        let principal = match self.principals.find_by_email(email).await {
            Ok(principal) => principal,
            Err(RepositoryError::NotFound) => {
                // 없는 계정도 같은 비용의 검증을 거쳐야 응답 시간으로 구분되지 않음
                self.check_password(TIMING_DIGEST.to_string(), password)
                    .await?;
                debug!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => {
                error!(error = %e, "Principal lookup failed during login");
                return Err(AuthError::internal(e));
            }
        };

        let matched = self
            .check_password(principal.password_digest.clone(), password)
            .await?;

        if !matched {
            debug!(principal_id = %principal.id, "Password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        let (access_token, data) = self.issue_access(&principal)?;
        let refresh_token = self
            .codec
            .issue_refresh(&RefreshPayload { id: principal.id }, self.refresh_ttl)
            .map_err(AuthError::internal)?;

        let ttl = self.refresh_ttl.to_std().map_err(AuthError::internal)?;
        self.sessions
            .put_refresh(&principal.id.to_string(), &refresh_token, ttl)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store refresh mapping");
                AuthError::internal(e)
            })?;

        info!(principal_id = %principal.id, "Login succeeded");

        Ok(AuthResponse {
            access_token,
            refresh_token,
            data,
        })
    }

    /// 세션을 종료합니다.
    ///
    /// access 토큰은 만료되었더라도 서명이 유효하면 받아들입니다. 이미 만료된
    /// 토큰은 폐기 목록에 올리지 않고 refresh 매핑만 삭제합니다.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> AuthResult<()> {
        if access_token.is_empty() {
            return Err(AuthError::BadRequest("access 토큰이 필요합니다".to_string()));
        }
        if refresh_token.is_empty() {
            return Err(AuthError::BadRequest("refresh 토큰이 필요합니다".to_string()));
        }

        let exp = self.codec.expiry_of(access_token).map_err(|e| match e {
            JwtError::MalformedClaims(cause) => {
                error!(cause = %cause, "Signed access token has malformed claims");
                AuthError::Internal(cause)
            }
            _ => AuthError::Unauthorized,
        })?;

        let remaining_ms = exp * 1000 - Utc::now().timestamp_millis();
        if remaining_ms > 0 {
            let remaining = std::time::Duration::from_millis(remaining_ms as u64);
            self.sessions
                .blacklist(access_token, remaining)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to blacklist access token");
                    AuthError::internal(e)
                })?;
        } else {
            debug!("Access token already expired; skipping blacklist");
        }

        self.sessions
            .delete_refresh(refresh_token)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete refresh mapping");
                AuthError::internal(e)
            })?;

        info!("Logout completed");
        Ok(())
    }

    /// refresh 토큰으로 새 Access Token을 발급합니다.
    ///
    /// 권한은 Principal을 다시 읽어 현재 역할 기준으로 집계합니다.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> AuthResult<AuthResponse> {
        if refresh_token.is_empty() {
            return Err(AuthError::BadRequest("refresh 토큰이 필요합니다".to_string()));
        }

        let claims = self
            .codec
            .verify::<RefreshPayload>(refresh_token)
            .map_err(|e| {
                debug!(error = %e, "Refresh token rejected");
                AuthError::Forbidden
            })?;

        let subject = self
            .sessions
            .get_refresh_subject(refresh_token)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read refresh mapping");
                AuthError::internal(e)
            })?
            .ok_or_else(|| {
                debug!("Refresh mapping not found");
                AuthError::Unauthorized
            })?;

        if subject != claims.data.id.to_string() {
            warn!(
                token_subject = %claims.data.id,
                stored_subject = %subject,
                "Refresh mapping subject mismatch"
            );
            return Err(AuthError::Unauthorized);
        }

        let principal = match self.principals.find_by_id(claims.data.id).await {
            Ok(principal) => principal,
            Err(RepositoryError::NotFound) => {
                warn!(principal_id = %claims.data.id, "Refresh for deleted principal");
                return Err(AuthError::Unauthorized);
            }
            Err(e) => {
                error!(error = %e, "Principal lookup failed during refresh");
                return Err(AuthError::internal(e));
            }
        };

        let (access_token, data) = self.issue_access(&principal)?;
        info!(principal_id = %principal.id, "Access token refreshed");

        Ok(AuthResponse {
            access_token,
            refresh_token: refresh_token.to_string(),
            data,
        })
    }

    /// blocking 풀에서 비밀번호를 검증합니다.
    async fn check_password(&self, digest: String, candidate: &str) -> AuthResult<bool> {
        let verifier = Arc::clone(&self.verifier);
        let candidate = candidate.to_string();
        tokio::task::spawn_blocking(move || verifier.verify(&digest, &candidate))
            .await
            .map_err(AuthError::internal)
    }

    fn issue_access(&self, principal: &Principal) -> AuthResult<(String, AccessPayload)> {
        let payload = AccessPayload::new(principal, aggregate_permissions(&principal.roles));
        let token = self
            .codec
            .issue_access(&payload, self.access_ttl)
            .map_err(AuthError::internal)?;
        Ok((token, payload))
    }
}
