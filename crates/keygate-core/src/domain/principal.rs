//! Principal 및 Role 모델.
//!
//! Principal 레코드는 사용자 관리 쪽이 소유하며, 인증 흐름은 로그인과 토큰 갱신 시
//! id, 비밀번호 digest, 역할만 읽습니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 권한 문자열 묶음.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// 역할 ID
    pub id: Uuid,
    /// 역할 이름 (고유)
    pub name: String,
    /// 권한 목록 (순서 유지, 중복 없음)
    pub permissions: Vec<String>,
}

impl Role {
    /// 새 역할 생성. 권한 목록의 중복은 첫 항목만 남깁니다.
    pub fn new(name: impl Into<String>, permissions: Vec<String>) -> Self {
        let mut role = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            permissions: Vec::new(),
        };
        role.set_permissions(permissions);
        role
    }

    /// 권한 목록을 교체합니다.
    pub fn set_permissions(&mut self, permissions: Vec<String>) {
        let mut seen = std::collections::HashSet::new();
        self.permissions = permissions
            .into_iter()
            .filter(|p| seen.insert(p.clone()))
            .collect();
    }

    /// 토큰 페이로드에 들어가는 요약.
    pub fn summary(&self) -> RoleSummary {
        RoleSummary {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// 토큰에 포함되는 역할 요약.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub id: Uuid,
    pub name: String,
}

/// 인증 대상 사용자.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// 사용자 ID
    pub id: Uuid,
    /// 이메일 (고유)
    pub email: String,
    /// 표시 이름
    pub name: String,
    /// 비밀번호 해시 (PHC 문자열)
    #[serde(default, skip_serializing)]
    pub password_digest: String,
    /// 할당된 역할
    pub roles: Vec<Role>,
    /// 생성 시간
    pub created_at: DateTime<Utc>,
    /// 수정 시간
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// 새 Principal 생성 (역할 없음).
    pub fn new(
        email: impl Into<String>,
        name: impl Into<String>,
        password_digest: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            name: name.into(),
            password_digest: password_digest.into(),
            roles: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// 역할 요약 목록.
    pub fn role_summaries(&self) -> Vec<RoleSummary> {
        self.roles.iter().map(Role::summary).collect()
    }
}
