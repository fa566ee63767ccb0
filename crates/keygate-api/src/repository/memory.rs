//! 인메모리 Principal / Role 저장소.
//!
//! Principal은 역할 ID만 보관하고, 조회할 때 Role 저장소에서 현재 정의를
//! 읽어 채웁니다. 따라서 역할 권한이 바뀌면 다음 로그인이나 토큰 갱신부터
//! 새 권한이 반영되고, 삭제된 역할은 자동으로 빠집니다.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use keygate_core::{Principal, Role};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PrincipalRepository, RepositoryError, RoleRepository};

/// 인메모리 Role 저장소.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRoleRepository {
    roles: Arc<RwLock<HashMap<Uuid, Role>>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    async fn resolve(&self, ids: &[Uuid]) -> Vec<Role> {
        let roles = self.roles.read().await;
        ids.iter().filter_map(|id| roles.get(id).cloned()).collect()
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn create(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut roles = self.roles.write().await;
        if roles.values().any(|r| r.name == role.name) {
            return Err(RepositoryError::Duplicate(format!("role '{}'", role.name)));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update(&self, role: Role) -> Result<Role, RepositoryError> {
        let mut roles = self.roles.write().await;
        if !roles.contains_key(&role.id) {
            return Err(RepositoryError::NotFound);
        }
        if roles
            .values()
            .any(|r| r.id != role.id && r.name == role.name)
        {
            return Err(RepositoryError::Duplicate(format!("role '{}'", role.name)));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Role, RepositoryError> {
        self.roles
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn find_by_name(&self, name: &str) -> Result<Role, RepositoryError> {
        self.roles
            .read()
            .await
            .values()
            .find(|r| r.name == name)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<Role>, RepositoryError> {
        let mut list: Vec<Role> = self.roles.read().await.values().cloned().collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.roles
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Debug, Clone)]
struct PrincipalRecord {
    principal: Principal,
    role_ids: Vec<Uuid>,
}

/// 인메모리 Principal 저장소.
#[derive(Debug, Clone)]
pub struct InMemoryPrincipalRepository {
    records: Arc<RwLock<HashMap<Uuid, PrincipalRecord>>>,
    roles: InMemoryRoleRepository,
}

impl InMemoryPrincipalRepository {
    /// 역할 정의를 읽어올 Role 저장소와 함께 생성합니다.
    pub fn new(roles: InMemoryRoleRepository) -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            roles,
        }
    }

    async fn hydrate(&self, record: PrincipalRecord) -> Principal {
        let mut principal = record.principal;
        principal.roles = self.roles.resolve(&record.role_ids).await;
        principal
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl PrincipalRepository for InMemoryPrincipalRepository {
    async fn find_by_email(&self, email: &str) -> Result<Principal, RepositoryError> {
        let email = normalize_email(email);
        let record = self
            .records
            .read()
            .await
            .values()
            .find(|r| r.principal.email == email)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        Ok(self.hydrate(record).await)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Principal, RepositoryError> {
        let record = self
            .records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        Ok(self.hydrate(record).await)
    }

    async fn create(&self, mut principal: Principal) -> Result<Principal, RepositoryError> {
        principal.email = normalize_email(&principal.email);
        let role_ids = principal.roles.iter().map(|r| r.id).collect();

        let mut records = self.records.write().await;
        if records
            .values()
            .any(|r| r.principal.email == principal.email)
        {
            return Err(RepositoryError::Duplicate(format!(
                "email '{}'",
                principal.email
            )));
        }

        let record = PrincipalRecord {
            principal: Principal {
                roles: Vec::new(),
                ..principal
            },
            role_ids,
        };
        records.insert(record.principal.id, record.clone());
        drop(records);

        Ok(self.hydrate(record).await)
    }

    async fn list(
        &self,
        search: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Principal>, usize), RepositoryError> {
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut matched: Vec<PrincipalRecord> = self
            .records
            .read()
            .await
            .values()
            .filter(|r| match &needle {
                Some(needle) => {
                    r.principal.email.contains(needle.as_str())
                        || r.principal.name.to_lowercase().contains(needle.as_str())
                }
                None => true,
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            b.principal
                .created_at
                .cmp(&a.principal.created_at)
                .then_with(|| a.principal.email.cmp(&b.principal.email))
        });

        let total = matched.len();
        let mut items = Vec::new();
        for record in matched.into_iter().skip(offset).take(limit) {
            items.push(self.hydrate(record).await);
        }
        Ok((items, total))
    }

    async fn update(&self, mut principal: Principal) -> Result<Principal, RepositoryError> {
        principal.email = normalize_email(&principal.email);

        let mut records = self.records.write().await;
        if records
            .values()
            .any(|r| r.principal.id != principal.id && r.principal.email == principal.email)
        {
            return Err(RepositoryError::Duplicate(format!(
                "email '{}'",
                principal.email
            )));
        }

        let record = records
            .get_mut(&principal.id)
            .ok_or(RepositoryError::NotFound)?;
        record.principal.email = principal.email;
        record.principal.name = principal.name;
        record.principal.password_digest = principal.password_digest;
        record.principal.updated_at = Utc::now();
        let record = record.clone();
        drop(records);

        Ok(self.hydrate(record).await)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.records
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn assign_role(&self, principal_id: Uuid, role_id: Uuid) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&principal_id)
            .ok_or(RepositoryError::NotFound)?;
        if !record.role_ids.contains(&role_id) {
            record.role_ids.push(role_id);
            record.principal.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn unassign_role(
        &self,
        principal_id: Uuid,
        role_id: Uuid,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(&principal_id)
            .ok_or(RepositoryError::NotFound)?;
        let before = record.role_ids.len();
        record.role_ids.retain(|id| *id != role_id);
        if record.role_ids.len() != before {
            record.principal.updated_at = Utc::now();
        }
        Ok(())
    }
}
