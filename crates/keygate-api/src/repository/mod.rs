//! Principal / Role 저장소.
//!
//! 인증 흐름과 사용자/역할 관리 라우트는 이 모듈의 trait에만 의존합니다.
//! 기본 구현은 프로세스 메모리에 저장하는 [`memory`] 모듈입니다.

pub mod memory;

use async_trait::async_trait;
use keygate_core::{AuthError, Principal, Role};
use thiserror::Error;
use uuid::Uuid;

pub use memory::{InMemoryPrincipalRepository, InMemoryRoleRepository};

/// 저장소 에러.
///
/// `NotFound`는 정상적인 조회 결과이고, `Backend`는 저장소 자체의 장애입니다.
/// 인증 흐름은 두 경우를 다르게 처리합니다.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("레코드를 찾을 수 없습니다")]
    NotFound,
    #[error("중복 레코드: {0}")]
    Duplicate(String),
    #[error("저장소 에러: {0}")]
    Backend(String),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => AuthError::NotFound,
            RepositoryError::Duplicate(what) => AuthError::Conflict(what),
            RepositoryError::Backend(cause) => AuthError::Internal(cause),
        }
    }
}

/// Principal 저장소.
///
/// 반환되는 Principal의 `roles`는 조회 시점의 역할 정의로 채워집니다.
#[async_trait]
pub trait PrincipalRepository: Send + Sync {
    /// 이메일로 조회 (대소문자 무시).
    async fn find_by_email(&self, email: &str) -> Result<Principal, RepositoryError>;

    /// ID로 조회.
    async fn find_by_id(&self, id: Uuid) -> Result<Principal, RepositoryError>;

    /// 새 Principal 저장. 이메일이 이미 있으면 `Duplicate`.
    async fn create(&self, principal: Principal) -> Result<Principal, RepositoryError>;

    /// 페이지 단위 목록.
    ///
    /// `search`가 있으면 이메일이나 이름에 포함된 것만 (대소문자 무시) 남깁니다.
    /// 최근 생성 순으로 `offset`부터 최대 `limit`개와 조건에 맞는 전체 수를 반환합니다.
    async fn list(
        &self,
        search: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Principal>, usize), RepositoryError>;

    /// 이메일, 이름, 비밀번호 해시 갱신. 역할 할당은 그대로 둡니다.
    /// 다른 Principal과 이메일이 겹치면 `Duplicate`.
    async fn update(&self, principal: Principal) -> Result<Principal, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 역할 할당. 이미 할당된 경우 아무것도 하지 않습니다.
    async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> Result<(), RepositoryError>;

    /// 역할 할당 해제.
    async fn unassign_role(&self, principal_id: Uuid, role_id: Uuid)
        -> Result<(), RepositoryError>;
}

/// Role 저장소.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// 새 역할 저장. 이름이 이미 있으면 `Duplicate`.
    async fn create(&self, role: Role) -> Result<Role, RepositoryError>;

    /// 역할 갱신. 다른 역할과 이름이 겹치면 `Duplicate`.
    async fn update(&self, role: Role) -> Result<Role, RepositoryError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Role, RepositoryError>;

    async fn find_by_name(&self, name: &str) -> Result<Role, RepositoryError>;

    /// 이름 순으로 정렬된 전체 목록.
    async fn list(&self) -> Result<Vec<Role>, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
