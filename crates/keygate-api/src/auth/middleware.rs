//! 접근 가드 미들웨어.
//!
//! 보호된 라우트는 두 단계를 거칩니다.
//!
//! 1. [`authenticate`]: `Authorization` 헤더의 토큰을 검증하고 폐기 여부를
//!    확인한 뒤 [`AuthContext`]를 요청 extension에 넣습니다.
//! 2. [`require_permissions`]: 라우트가 요구하는 권한 중 하나라도 토큰의 권한
//!    스냅샷에 있으면 통과시킵니다. `manage:system`은 항상 통과합니다.
//!
//! # 사용 예시
//!
//! ```rust,ignore
//! Router::new()
//!     .route(
//!         "/",
//!         post(create_role).route_layer(middleware::from_fn_with_state(
//!             RequiredPermissions::any_of(["roles:create"]),
//!             require_permissions,
//!         )),
//!     )
//!     .route_layer(middleware::from_fn_with_state(guard, authenticate))
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use keygate_core::{intersect, AuthError, AuthResult, MANAGE_SYSTEM};
use keygate_session::SessionStore;
use tracing::{debug, error, warn};
use uuid::Uuid;

use super::jwt::{AccessPayload, TokenClaims, TokenCodec};
use crate::error::ApiError;

/// 인증된 요청의 컨텍스트.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// 원본 access 토큰
    pub token: String,
    /// 검증된 클레임
    pub claims: TokenClaims<AccessPayload>,
}

impl AuthContext {
    pub fn subject_id(&self) -> Uuid {
        self.claims.data.id
    }

    pub fn permissions(&self) -> &[String] {
        &self.claims.data.permissions
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or_else(|| {
                warn!("AuthContext missing; authenticate layer not applied");
                ApiError(AuthError::Forbidden)
            })
    }
}

/// `Authorization` 헤더에서 토큰을 꺼냅니다.
///
/// `Bearer <token>` 형식과 토큰만 있는 형식을 모두 받습니다.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim_start();
    let token = match value.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
        _ => value.trim_end(),
    };

    (!token.is_empty()).then(|| token.to_string())
}

/// 토큰 검증기.
///
/// 서명/만료 검증과 폐기 목록 확인을 모두 통과해야 토큰을 신뢰합니다.
#[derive(Clone)]
pub struct AccessGuard {
    codec: Arc<TokenCodec>,
    sessions: Arc<dyn SessionStore>,
}

impl AccessGuard {
    pub fn new(codec: Arc<TokenCodec>, sessions: Arc<dyn SessionStore>) -> Self {
        Self { codec, sessions }
    }

    /// 토큰을 검증합니다. 실패 사유와 관계없이 `Unauthorized`를 반환합니다.
    pub async fn authenticate(&self, token: &str) -> AuthResult<TokenClaims<AccessPayload>> {
        let claims = self.codec.verify::<AccessPayload>(token).map_err(|e| {
            debug!(error = %e, "Access token rejected");
            AuthError::Unauthorized
        })?;

        match self.sessions.is_blacklisted(token).await {
            Ok(false) => Ok(claims),
            Ok(true) => {
                debug!(principal_id = %claims.data.id, "Revoked access token presented");
                Err(AuthError::Unauthorized)
            }
            Err(e) => {
                // 폐기 여부를 확인할 수 없으면 신뢰하지 않음
                error!(error = %e, "Blacklist lookup failed; rejecting token");
                Err(AuthError::Unauthorized)
            }
        }
    }
}

/// 인증 단계 미들웨어.
pub async fn authenticate(
    State(guard): State<AccessGuard>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_token(request.headers()).ok_or(AuthError::Unauthorized)?;
    let claims = guard.authenticate(&token).await?;

    request.extensions_mut().insert(AuthContext { token, claims });
    Ok(next.run(request).await)
}

/// 라우트가 요구하는 권한 (OR 조건).
#[derive(Debug, Clone)]
pub struct RequiredPermissions(Arc<[String]>);

impl RequiredPermissions {
    /// 나열된 권한 중 하나라도 있으면 통과.
    pub fn any_of<I, S>(permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(permissions.into_iter().map(Into::into).collect())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

/// 권한 검사.
///
/// `manage:system`이 있으면 항상 허용하고, 그 외에는 교집합이 비어 있지 않을
/// 때 허용합니다.
pub fn check_access(granted: &[String], required: &[String]) -> AuthResult<()> {
    if granted.iter().any(|p| p == MANAGE_SYSTEM) {
        return Ok(());
    }
    if intersect(granted, required).is_empty() {
        Err(AuthError::Forbidden)
    } else {
        Ok(())
    }
}

/// 인가 단계 미들웨어. [`authenticate`] 뒤에 적용해야 합니다.
pub async fn require_permissions(
    State(required): State<RequiredPermissions>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(context) = request.extensions().get::<AuthContext>() else {
        warn!("AuthContext missing; authenticate layer not applied");
        return Err(AuthError::Forbidden.into());
    };

    if let Err(err) = check_access(context.permissions(), required.as_slice()) {
        debug!(
            principal_id = %context.subject_id(),
            required = ?required.as_slice(),
            "Permission denied"
        );
        return Err(err.into());
    }

    Ok(next.run(request).await)
}
