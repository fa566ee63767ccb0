//! 역할 관리.
//!
//! 역할이 참조하는 모든 권한은 권한 레지스트리에 등록되어 있어야 합니다.
//! 역할 변경은 이미 발급된 Access Token에는 반영되지 않고, 다음 로그인이나
//! 토큰 갱신부터 적용됩니다.

use std::sync::Arc;

use keygate_core::{AuthError, AuthResult, PermissionRegistry, Role};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{normalize_name, not_blank};
use crate::repository::{PrincipalRepository, RoleRepository};

/// 역할 생성 요청.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateRoleRequest {
    #[validate(
        length(min = 1, max = 64, message = "역할 이름은 1~64자여야 합니다"),
        custom(function = "not_blank")
    )]
    pub name: String,
    #[validate(length(min = 1, message = "최소 1개의 권한이 필요합니다"))]
    pub permissions: Vec<String>,
}

/// 역할 수정 요청. 지정한 필드만 바뀝니다.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(
        length(min = 1, max = 64, message = "역할 이름은 1~64자여야 합니다"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "최소 1개의 권한이 필요합니다"))]
    pub permissions: Option<Vec<String>>,
}

/// 역할 할당/해제 요청.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RoleAssignmentRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}

/// 역할 서비스.
pub struct RoleService {
    roles: Arc<dyn RoleRepository>,
    principals: Arc<dyn PrincipalRepository>,
    registry: Arc<PermissionRegistry>,
}

impl RoleService {
    pub fn new(
        roles: Arc<dyn RoleRepository>,
        principals: Arc<dyn PrincipalRepository>,
        registry: Arc<PermissionRegistry>,
    ) -> Self {
        Self {
            roles,
            principals,
            registry,
        }
    }

    fn ensure_registered(&self, permissions: &[String]) -> AuthResult<()> {
        let unknown = self.registry.unknown(permissions);
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(AuthError::BadRequest(format!(
                "등록되지 않은 권한: {}",
                unknown.join(", ")
            )))
        }
    }

    pub async fn create(&self, request: CreateRoleRequest) -> AuthResult<Role> {
        let name = normalize_name(&request.name, "역할 이름")?;
        self.ensure_registered(&request.permissions)?;
        let role = self
            .roles
            .create(Role::new(name, request.permissions))
            .await?;

        info!(role_id = %role.id, name = %role.name, "Role created");
        Ok(role)
    }

    pub async fn update(&self, id: Uuid, request: UpdateRoleRequest) -> AuthResult<Role> {
        let mut role = self.roles.find_by_id(id).await?;

        if let Some(name) = request.name {
            role.name = normalize_name(&name, "역할 이름")?;
        }
        if let Some(permissions) = request.permissions {
            self.ensure_registered(&permissions)?;
            role.set_permissions(permissions);
        }

        let role = self.roles.update(role).await?;
        info!(role_id = %role.id, "Role updated");
        Ok(role)
    }

    pub async fn get(&self, id: Uuid) -> AuthResult<Role> {
        Ok(self.roles.find_by_id(id).await?)
    }

    pub async fn list(&self) -> AuthResult<Vec<Role>> {
        Ok(self.roles.list().await?)
    }

    pub async fn delete(&self, id: Uuid) -> AuthResult<()> {
        self.roles.delete(id).await?;
        info!(role_id = %id, "Role deleted");
        Ok(())
    }

    pub async fn assign(&self, request: RoleAssignmentRequest) -> AuthResult<()> {
        self.roles.find_by_id(request.role_id).await?;
        self.principals
            .assign_role(request.user_id, request.role_id)
            .await?;

        info!(user_id = %request.user_id, role_id = %request.role_id, "Role assigned");
        Ok(())
    }

    pub async fn unassign(&self, request: RoleAssignmentRequest) -> AuthResult<()> {
        self.principals
            .unassign_role(request.user_id, request.role_id)
            .await?;

        info!(user_id = %request.user_id, role_id = %request.role_id, "Role unassigned");
        Ok(())
    }
}
