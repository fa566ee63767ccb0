//! 사용자 관리 endpoint.
//!
//! - `POST /api/v1/users` (`users:create`)
//! - `GET /api/v1/users?page=&limit=&search=` (`users:read`)
//! - `GET /api/v1/users/me` (인증만 필요)
//! - `GET /api/v1/users/{id}` (`users:read`)
//! - `PUT /api/v1/users/{id}` (`users:update`)
//! - `DELETE /api/v1/users/{id}` (`users:delete`)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use keygate_core::Principal;

use crate::auth::{authenticate, require_permissions, AccessPayload, AuthContext, RequiredPermissions};
use crate::error::ApiResult;
use crate::modules::FeatureModule;
use crate::routes::{parse_id, ValidatedJson, ValidatedQuery};
use crate::services::{CreateUserRequest, ListUsersQuery, Paginated, UpdateUserRequest};
use crate::state::AppState;

pub const USERS_CREATE: &str = "users:create";
pub const USERS_READ: &str = "users:read";
pub const USERS_UPDATE: &str = "users:update";
pub const USERS_DELETE: &str = "users:delete";

/// 사용자 생성.
///
/// POST /api/v1/users
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<Principal>)> {
    let principal = state.users.create(request).await?;
    Ok((StatusCode::CREATED, Json(principal)))
}

/// 사용자 조회.
///
/// GET /api/v1/users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Principal>> {
    let principal = state.users.get(parse_id(&id)?).await?;
    Ok(Json(principal))
}

/// 사용자 목록.
///
/// GET /api/v1/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ValidatedQuery(query): ValidatedQuery<ListUsersQuery>,
) -> ApiResult<Json<Paginated<Principal>>> {
    Ok(Json(state.users.list(query).await?))
}

/// 사용자 수정.
///
/// PUT /api/v1/users/{id}
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ValidatedJson(request): ValidatedJson<UpdateUserRequest>,
) -> ApiResult<Json<Principal>> {
    let principal = state.users.update(parse_id(&id)?, request).await?;
    Ok(Json(principal))
}

/// DELETE /api/v1/users/{id}
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.users.delete(parse_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// 현재 토큰의 페이로드.
///
/// GET /api/v1/users/me
pub async fn me(context: AuthContext) -> Json<AccessPayload> {
    Json(context.claims.data)
}

/// 사용자 모듈.
pub struct UsersModule;

impl FeatureModule for UsersModule {
    fn name(&self) -> &'static str {
        "users"
    }

    fn permissions(&self) -> &'static [&'static str] {
        &[USERS_CREATE, USERS_READ, USERS_UPDATE, USERS_DELETE]
    }

    fn router(&self, state: &Arc<AppState>) -> Router<Arc<AppState>> {
        Router::new()
            .route(
                "/",
                post(create_user)
                    .route_layer(middleware::from_fn_with_state(
                        guard(USERS_CREATE),
                        require_permissions,
                    ))
                    .merge(get(list_users).route_layer(middleware::from_fn_with_state(
                        guard(USERS_READ),
                        require_permissions,
                    ))),
            )
            .route("/me", get(me))
            .route(
                "/{id}",
                get(get_user)
                    .route_layer(middleware::from_fn_with_state(
                        guard(USERS_READ),
                        require_permissions,
                    ))
                    .merge(put(update_user).route_layer(
                        middleware::from_fn_with_state(guard(USERS_UPDATE), require_permissions),
                    ))
                    .merge(delete(delete_user).route_layer(
                        middleware::from_fn_with_state(guard(USERS_DELETE), require_permissions),
                    )),
            )
            .route_layer(middleware::from_fn_with_state(
                state.guard.clone(),
                authenticate,
            ))
    }
}

fn guard(permission: &'static str) -> RequiredPermissions {
    RequiredPermissions::any_of([permission])
}
