//! 역할 관리 endpoint.
//!
//! | 메서드 | 경로 | 권한 |
//! |--------|------|------|
//! | POST | `/api/v1/roles` | `roles:create` |
//! | GET | `/api/v1/roles` | `roles:read` |
//! | GET | `/api/v1/roles/{id}` | `roles:read` |
//! | PUT | `/api/v1/roles/{id}` | `roles:update` |
//! | DELETE | `/api/v1/roles/{id}` | `roles:delete` |
//! | POST | `/api/v1/roles/assign` | `roles:assign` |
//! | POST | `/api/v1/roles/unassign` | `roles:assign` |

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use keygate_core::Role;

use crate::auth::{authenticate, require_permissions, RequiredPermissions};
use crate::error::ApiResult;
use crate::modules::FeatureModule;
use crate::routes::{parse_id, ValidatedJson};
use crate::services::{CreateRoleRequest, RoleAssignmentRequest, UpdateRoleRequest};
use crate::state::AppState;

pub const ROLES_CREATE: &str = "roles:create";
pub const ROLES_READ: &str = "roles:read";
pub const ROLES_UPDATE: &str = "roles:update";
pub const ROLES_DELETE: &str = "roles:delete";
pub const ROLES_ASSIGN: &str = "roles:assign";

/// POST /api/v1/roles
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateRoleRequest>,
) -> ApiResult<(StatusCode, Json<Role>)> {
    let role = state.roles.create(request).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// GET /api/v1/roles
pub async fn list_roles(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Role>>> {
    Ok(Json(state.roles.list().await?))
}

/// GET /api/v1/roles/{id}
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Role>> {
    Ok(Json(state.roles.get(parse_id(&id)?).await?))
}

/// PUT /api/v1/roles/{id}
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateRoleRequest>,
) -> ApiResult<Json<Role>> {
    Ok(Json(state.roles.update(parse_id(&id)?, request).await?))
}

/// DELETE /api/v1/roles/{id}
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.roles.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/roles/assign
pub async fn assign_role(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state.roles.assign(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/roles/unassign
pub async fn unassign_role(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RoleAssignmentRequest>,
) -> ApiResult<StatusCode> {
    state.roles.unassign(request).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn guard(permission: &'static str) -> RequiredPermissions {
    RequiredPermissions::any_of([permission])
}

/// 역할 모듈.
pub struct RolesModule;

impl FeatureModule for RolesModule {
    fn name(&self) -> &'static str {
        "roles"
    }

    fn permissions(&self) -> &'static [&'static str] {
        &[ROLES_CREATE, ROLES_READ, ROLES_UPDATE, ROLES_DELETE, ROLES_ASSIGN]
    }

    fn router(&self, state: &Arc<AppState>) -> Router<Arc<AppState>> {
        Router::new()
            .route(
                "/",
                post(create_role)
                    .route_layer(middleware::from_fn_with_state(
                        guard(ROLES_CREATE),
                        require_permissions,
                    ))
                    .merge(get(list_roles).route_layer(middleware::from_fn_with_state(
                        guard(ROLES_READ),
                        require_permissions,
                    ))),
            )
            .route(
                "/assign",
                post(assign_role).route_layer(middleware::from_fn_with_state(
                    guard(ROLES_ASSIGN),
                    require_permissions,
                )),
            )
            .route(
                "/unassign",
                post(unassign_role).route_layer(middleware::from_fn_with_state(
                    guard(ROLES_ASSIGN),
                    require_permissions,
                )),
            )
            .route(
                "/{id}",
                get(get_role)
                    .route_layer(middleware::from_fn_with_state(
                        guard(ROLES_READ),
                        require_permissions,
                    ))
                    .merge(put(update_role).route_layer(
                        middleware::from_fn_with_state(guard(ROLES_UPDATE), require_permissions),
                    ))
                    .merge(delete(delete_role).route_layer(
                        middleware::from_fn_with_state(guard(ROLES_DELETE), require_permissions),
                    )),
            )
            .route_layer(middleware::from_fn_with_state(
                state.guard.clone(),
                authenticate,
            ))
    }
}
