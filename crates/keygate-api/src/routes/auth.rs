//! 인증 endpoint.
//!
//! - `POST /api/v1/auth/login`
//! - `POST /api/v1/auth/logout` (Authorization 헤더 + refresh 토큰 본문)
//! - `POST /api/v1/auth/refresh`
//!
//! 로그아웃은 만료된 access 토큰도 받아야 하므로 접근 가드를 거치지 않고
//! 헤더에서 직접 토큰을 읽습니다. 모든 endpoint에 IP별 Rate Limit이 적용됩니다.

use std::sync::Arc;

use axum::{
    extract::State, http::HeaderMap, http::StatusCode, middleware, routing::post, Json, Router,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::extract_token;
use crate::error::ApiResult;
use crate::middleware::rate_limit_middleware;
use crate::modules::FeatureModule;
use crate::routes::ValidatedJson;
use crate::services::AuthResponse;
use crate::state::AppState;

/// 로그인 요청.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "올바른 이메일 형식이 아닙니다"))]
    pub email: String,
    #[validate(length(min = 1, message = "비밀번호가 필요합니다"))]
    pub password: String,
}

/// refresh 토큰을 담는 요청 (로그아웃 / 갱신).
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct RefreshTokenRequest {
    #[serde(default)]
    pub refresh_token: String,
}

/// 로그아웃 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub message: String,
}

/// 로그인.
///
/// POST /api/v1/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = state.auth.login(&request.email, &request.password).await?;
    Ok(Json(response))
}

/// 로그아웃.
///
/// POST /api/v1/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<(StatusCode, Json<LogoutResponse>)> {
    let access_token = extract_token(&headers).unwrap_or_default();
    state
        .auth
        .logout(&access_token, &request.refresh_token)
        .await?;

    Ok((
        StatusCode::OK,
        Json(LogoutResponse {
            message: "로그아웃되었습니다".to_string(),
        }),
    ))
}

/// Access Token 갱신.
///
/// POST /api/v1/auth/refresh
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RefreshTokenRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let response = state.auth.refresh(&request.refresh_token).await?;
    Ok(Json(response))
}

/// 인증 모듈. 새 권한을 도입하지 않습니다.
pub struct AuthModule;

impl FeatureModule for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn permissions(&self) -> &'static [&'static str] {
        &[]
    }

    fn router(&self, state: &Arc<AppState>) -> Router<Arc<AppState>> {
        let router = Router::new()
            .route("/login", post(login))
            .route("/logout", post(logout))
            .route("/refresh", post(refresh));

        match &state.rate_limiter {
            Some(limiter) => router.route_layer(middleware::from_fn_with_state(
                limiter.clone(),
                rate_limit_middleware,
            )),
            None => router,
        }
    }
}
