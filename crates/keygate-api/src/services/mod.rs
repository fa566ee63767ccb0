//! 비즈니스 로직 서비스.
//!
//! 라우트 핸들러는 요청을 파싱하고 이 모듈의 서비스에 위임합니다.

pub mod auth;
pub mod roles;
pub mod users;

pub use auth::{AuthResponse, AuthService};
pub use roles::{CreateRoleRequest, RoleAssignmentRequest, RoleService, UpdateRoleRequest};
pub use users::{
    CreateUserRequest, ListUsersQuery, Paginated, Paging, UpdateUserRequest, UserService,
};

use keygate_core::{AuthError, AuthResult};
use validator::ValidationError;

/// 공백만으로 이루어진 문자열을 거부하는 validator.
pub(crate) fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("공백만 입력할 수 없습니다".into()));
    }
    Ok(())
}

/// 앞뒤 공백을 제거한 이름. 비어 있으면 `BadRequest`.
pub(crate) fn normalize_name(raw: &str, field: &str) -> AuthResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AuthError::BadRequest(format!("{field}이(가) 비어 있습니다")));
    }
    Ok(name.to_string())
}
