//! 사용자 관리.

use std::sync::Arc;

use keygate_core::{AuthError, AuthResult, Principal};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use super::{normalize_name, not_blank};
use crate::auth::{hash_password, validate_password_strength};
use crate::repository::PrincipalRepository;

/// 목록 조회 기본 페이지 크기.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// 목록 조회 최대 페이지 크기.
pub const MAX_PAGE_SIZE: u32 = 100;

/// 사용자 생성 요청.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CreateUserRequest {
    #[validate(email(message = "올바른 이메일 형식이 아닙니다"))]
    pub email: String,
    #[validate(
        length(min = 1, max = 100, message = "이름은 1~100자여야 합니다"),
        custom(function = "not_blank")
    )]
    pub name: String,
    pub password: String,
}

/// 사용자 수정 요청. 비어 있는 필드는 바꾸지 않습니다.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(email(message = "올바른 이메일 형식이 아닙니다"))]
    pub email: Option<String>,
    #[validate(
        length(min = 1, max = 100, message = "이름은 1~100자여야 합니다"),
        custom(function = "not_blank")
    )]
    pub name: Option<String>,
    /// 주어지면 강도 검사 후 다시 해시합니다.
    pub password: Option<String>,
}

/// 사용자 목록 조회 조건.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListUsersQuery {
    #[validate(range(min = 1, message = "page는 1 이상이어야 합니다"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "limit은 1~100이어야 합니다"))]
    pub limit: Option<u32>,
    /// 이메일 또는 이름 부분 검색
    pub search: Option<String>,
}

/// 페이지 정보.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Paging {
    pub limit: u32,
    pub page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl Paging {
    fn new(page: u32, limit: u32, total_items: u64) -> Self {
        Self {
            limit,
            page,
            total_items,
            total_pages: total_items.div_ceil(u64::from(limit.max(1))),
        }
    }
}

/// 페이지 단위 응답.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub paging: Paging,
}

/// 사용자 서비스.
pub struct UserService {
    principals: Arc<dyn PrincipalRepository>,
}

impl UserService {
    pub fn new(principals: Arc<dyn PrincipalRepository>) -> Self {
        Self { principals }
    }

    /// 사용자 생성. 이메일이 이미 있으면 `Conflict`.
    pub async fn create(&self, request: CreateUserRequest) -> AuthResult<Principal> {
        validate_password_strength(&request.password)
            .map_err(|msg| AuthError::BadRequest(msg.to_string()))?;

        let name = normalize_name(&request.name, "이름")?;
        let digest = digest_password(request.password).await?;

        let principal = self
            .principals
            .create(Principal::new(request.email, name, digest))
            .await?;

        info!(user_id = %principal.id, "User created");
        Ok(principal)
    }

    pub async fn get(&self, id: Uuid) -> AuthResult<Principal> {
        Ok(self.principals.find_by_id(id).await?)
    }

    /// 페이지 단위 목록. 기본값은 1페이지, 페이지당 [`DEFAULT_PAGE_SIZE`]개.
    pub async fn list(&self, query: ListUsersQuery) -> AuthResult<Paginated<Principal>> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let offset = (page as usize - 1).saturating_mul(limit as usize);

        let (items, total) = self
            .principals
            .list(query.search.as_deref(), offset, limit as usize)
            .await?;

        Ok(Paginated {
            items,
            paging: Paging::new(page, limit, total as u64),
        })
    }

    /// 사용자 수정. 이메일이 다른 사용자와 겹치면 `Conflict`.
    pub async fn update(&self, id: Uuid, request: UpdateUserRequest) -> AuthResult<Principal> {
        let mut principal = self.principals.find_by_id(id).await?;

        if let Some(email) = request.email {
            principal.email = email;
        }
        if let Some(name) = request.name {
            principal.name = normalize_name(&name, "이름")?;
        }
        if let Some(password) = request.password {
            validate_password_strength(&password)
                .map_err(|msg| AuthError::BadRequest(msg.to_string()))?;
            principal.password_digest = digest_password(password).await?;
        }

        let principal = self.principals.update(principal).await?;
        info!(user_id = %principal.id, "User updated");
        Ok(principal)
    }

    /// 사용자 삭제.
    ///
    /// 이미 발급된 refresh token은 다음 갱신 때 거부되고, access token은
    /// 만료될 때까지 유효합니다.
    pub async fn delete(&self, id: Uuid) -> AuthResult<()> {
        self.principals.delete(id).await?;
        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

async fn digest_password(password: String) -> AuthResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(AuthError::internal)?
        .map_err(AuthError::internal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::verify_password;
    use crate::repository::{InMemoryPrincipalRepository, InMemoryRoleRepository};

    fn service() -> UserService {
        UserService::new(Arc::new(InMemoryPrincipalRepository::new(
            InMemoryRoleRepository::new(),
        )))
    }

    fn request(email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            email: email.to_string(),
            name: "Kim".to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_hashes_password() {
        let service = service();
        let principal = service
            .create(request("kim@example.com", "Password1"))
            .await
            .unwrap();

        assert!(principal.password_digest.starts_with("$argon2id$"));
        assert!(verify_password("Password1", &principal.password_digest).is_ok());
        assert_eq!(service.get(principal.id).await.unwrap().email, "kim@example.com");
    }

    #[tokio::test]
    async fn test_create_duplicate_email_conflicts() {
        let service = service();
        service
            .create(request("kim@example.com", "Password1"))
            .await
            .unwrap();

        let result = service.create(request("KIM@example.com", "Password2")).await;
        assert!(matches!(result, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_weak_password() {
        let result = service().create(request("kim@example.com", "short")).await;
        assert!(matches!(result, Err(AuthError::BadRequest(_))));
    }

    #[test]
    fn test_blank_name_is_rejected() {
        let mut request = request("kim@example.com", "Password1");
        request.name = "   ".to_string();
        assert!(request.validate().is_err());

        let update = UpdateUserRequest {
            name: Some(" \t ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }

    #[tokio::test]
    async fn test_create_trims_name() {
        let mut request = request("kim@example.com", "Password1");
        request.name = "  Kim  ".to_string();
        let principal = service().create(request).await.unwrap();
        assert_eq!(principal.name, "Kim");
    }

    #[tokio::test]
    async fn test_list_defaults_and_paging() {
        let repo = Arc::new(InMemoryPrincipalRepository::new(InMemoryRoleRepository::new()));
        for i in 0..12 {
            repo.create(Principal::new(format!("user{i}@example.com"), "Kim", "digest"))
                .await
                .unwrap();
        }
        let service = UserService::new(repo);

        let page = service.list(ListUsersQuery::default()).await.unwrap();
        assert_eq!(page.items.len(), 10);
        assert_eq!(
            page.paging,
            Paging {
                limit: 10,
                page: 1,
                total_items: 12,
                total_pages: 2,
            }
        );

        let second = service
            .list(ListUsersQuery {
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);

        let search = service
            .list(ListUsersQuery {
                search: Some("user11".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(search.paging.total_items, 1);
        assert_eq!(search.items[0].email, "user11@example.com");
    }

    #[tokio::test]
    async fn test_list_empty_has_zero_pages() {
        let page = service().list(ListUsersQuery::default()).await.unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.paging.total_pages, 0);
    }

    #[tokio::test]
    async fn test_update_rehashes_only_when_password_given() {
        let service = service();
        let principal = service
            .create(request("kim@example.com", "Password1"))
            .await
            .unwrap();

        let renamed = service
            .update(
                principal.id,
                UpdateUserRequest {
                    name: Some("Kim Jr".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Kim Jr");
        assert_eq!(renamed.password_digest, principal.password_digest);

        let rekeyed = service
            .update(
                principal.id,
                UpdateUserRequest {
                    password: Some("Password2".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(verify_password("Password2", &rekeyed.password_digest).is_ok());

        let weak = service
            .update(
                principal.id,
                UpdateUserRequest {
                    password: Some("short".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(weak, Err(AuthError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_update_email_conflict() {
        let service = service();
        let kim = service
            .create(request("kim@example.com", "Password1"))
            .await
            .unwrap();
        service
            .create(request("lee@example.com", "Password1"))
            .await
            .unwrap();

        let result = service
            .update(
                kim.id,
                UpdateUserRequest {
                    email: Some("lee@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AuthError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_delete_user() {
        let service = service();
        let kim = service
            .create(request("kim@example.com", "Password1"))
            .await
            .unwrap();

        service.delete(kim.id).await.unwrap();
        assert!(matches!(service.get(kim.id).await, Err(AuthError::NotFound)));
        assert!(matches!(service.delete(kim.id).await, Err(AuthError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_unknown_user() {
        let result = service().get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AuthError::NotFound)));
    }
}
