//! 시스템 관리 endpoint.
//!
//! `manage:system` 권한을 도입합니다. 이 권한을 가진 사용자는 모든 권한
//! 검사를 통과합니다.

use std::sync::Arc;

use axum::{extract::State, middleware, routing::get, Json, Router};
use keygate_core::MANAGE_SYSTEM;
use serde::{Deserialize, Serialize};

use crate::auth::{authenticate, require_permissions, RequiredPermissions};
use crate::modules::FeatureModule;
use crate::routes::roles::{ROLES_CREATE, ROLES_UPDATE};
use crate::state::AppState;

/// 권한 카탈로그 응답.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionCatalog {
    pub permissions: Vec<String>,
    pub total: usize,
}

/// 등록된 전체 권한 목록.
///
/// 역할 편집 화면에서 선택 가능한 권한을 보여주는 데 사용합니다.
/// GET /api/v1/system/permissions
pub async fn list_permissions(State(state): State<Arc<AppState>>) -> Json<PermissionCatalog> {
    let permissions = state.registry.permissions();
    Json(PermissionCatalog {
        total: permissions.len(),
        permissions,
    })
}

/// 시스템 모듈.
pub struct SystemModule;

impl FeatureModule for SystemModule {
    fn name(&self) -> &'static str {
        "system"
    }

    fn permissions(&self) -> &'static [&'static str] {
        &[MANAGE_SYSTEM]
    }

    fn router(&self, state: &Arc<AppState>) -> Router<Arc<AppState>> {
        Router::new()
            .route(
                "/permissions",
                get(list_permissions).route_layer(middleware::from_fn_with_state(
                    RequiredPermissions::any_of([ROLES_CREATE, ROLES_UPDATE]),
                    require_permissions,
                )),
            )
            .route_layer(middleware::from_fn_with_state(
                state.guard.clone(),
                authenticate,
            ))
    }
}
