//! REST API 라우트.
//!
//! 각 기능 모듈의 엔드포인트와 공용 요청 추출기를 정의합니다.

pub mod auth;
pub mod health;
pub mod roles;
pub mod system;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json, Router,
};
use keygate_core::AuthError;
use serde::de::DeserializeOwned;
use uuid::Uuid;
use validator::Validate;

use crate::error::{ApiError, ApiResult};
use crate::modules::FeatureModule;
use crate::state::AppState;

pub use auth::AuthModule;
pub use health::health_router;
pub use roles::RolesModule;
pub use system::SystemModule;
pub use users::UsersModule;

/// 모든 API 라우트를 포함하는 라우터 생성.
///
/// 각 모듈은 `/api/v1/<name>` 아래에 붙습니다.
pub fn create_api_router(
    state: &Arc<AppState>,
    modules: &[Box<dyn FeatureModule>],
) -> Router<Arc<AppState>> {
    modules.iter().fold(
        Router::new().nest("/health", health_router()),
        |router, module| router.nest(&format!("/api/v1/{}", module.name()), module.router(state)),
    )
}

/// JSON 본문을 파싱하고 `validator` 규칙을 검사하는 추출기.
///
/// 파싱/검증 실패는 모두 `BadRequest` 에러 응답이 됩니다.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AuthError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| AuthError::BadRequest(e.to_string()))?;

        Ok(Self(value))
    }
}

/// 쿼리 문자열을 파싱하고 `validator` 규칙을 검사하는 추출기.
#[derive(Debug, Clone)]
pub struct ValidatedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate + Send,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AuthError::BadRequest(rejection.body_text()))?;

        value
            .validate()
            .map_err(|e| AuthError::BadRequest(e.to_string()))?;

        Ok(Self(value))
    }
}

/// 경로의 ID 파라미터를 파싱합니다.
pub fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|_| AuthError::BadRequest(format!("잘못된 ID 형식: {}", raw)).into())
}
