//! 권한 레지스트리.
//!
//! 각 기능 모듈은 부트스트랩 시 자신이 도입하는 권한 문자열(예: `"users:create"`)을
//! 한 번 등록합니다. 레지스트리는 추가만 가능하며, 같은 문자열을 여러 번 등록해도
//! 항목은 하나만 유지됩니다.
//!
//! 전역 상태가 아니라 프로세스 시작 시 한 번 생성되어 `Arc`로 각 모듈과
//! 접근 가드에 전달됩니다.

use std::collections::{BTreeSet, HashSet};
use std::sync::{PoisonError, RwLock};

use super::principal::Role;

/// 모든 권한 검사를 통과시키는 관리자 권한.
pub const MANAGE_SYSTEM: &str = "manage:system";

/// 프로세스 단위 권한 카탈로그.
///
/// 쓰기는 주로 단일 스레드 부트스트랩 단계에서 일어나지만, 내부적으로 동기화되어
/// 있으므로 늦은 등록과 동시 읽기도 안전합니다.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    entries: RwLock<HashSet<String>>,
}

impl PermissionRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 권한들을 레지스트리에 합칩니다. 이미 있는 항목은 무시됩니다.
    ///
    /// 새로 추가된 항목 수를 반환합니다.
    pub fn register<I, S>(&self, permissions: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        permissions
            .into_iter()
            .map(Into::into)
            .filter(|permission| entries.insert(permission.clone()))
            .count()
    }

    /// 권한이 등록되어 있는지 확인합니다. O(1).
    pub fn contains(&self, permission: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(permission)
    }

    /// `candidate` 중 `required`에도 있는 권한을 반환합니다.
    ///
    /// [`intersect`] 참고.
    pub fn intersect(&self, candidate: &[String], required: &[String]) -> Vec<String> {
        intersect(candidate, required)
    }

    /// 등록되지 않은 후보 권한을 입력 순서대로 반환합니다.
    pub fn unknown<'a>(&self, candidate: &'a [String]) -> Vec<&'a str> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut seen = HashSet::new();
        candidate
            .iter()
            .map(String::as_str)
            .filter(|permission| !entries.contains(*permission) && seen.insert(*permission))
            .collect()
    }

    /// 등록된 모든 권한을 정렬하여 반환합니다.
    pub fn permissions(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut list: Vec<String> = entries.iter().cloned().collect();
        list.sort();
        list
    }

    /// 등록된 권한 수.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// 레지스트리가 비어 있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 두 권한 목록의 교집합.
///
/// `candidate` 순서를 유지하며 중복을 제거합니다.
pub fn intersect(candidate: &[String], required: &[String]) -> Vec<String> {
    let required: HashSet<&str> = required.iter().map(String::as_str).collect();
    let mut seen = HashSet::new();
    candidate
        .iter()
        .filter(|permission| {
            required.contains(permission.as_str()) && seen.insert(permission.as_str())
        })
        .cloned()
        .collect()
}

/// 역할들의 권한 합집합을 정렬된 중복 없는 목록으로 반환합니다.
pub fn aggregate_permissions<'a, I>(roles: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Role>,
{
    roles
        .into_iter()
        .flat_map(|role| role.permissions.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_register_and_contains() {
        let registry = PermissionRegistry::new();
        assert!(registry.is_empty());

        let added = registry.register(["users:create", "users:read"]);
        assert_eq!(added, 2);
        assert!(registry.contains("users:create"));
        assert!(registry.contains("users:read"));
        assert!(!registry.contains("users:delete"));
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = PermissionRegistry::new();
        registry.register(["roles:assign"]);
        let added = registry.register(["roles:assign", "roles:assign"]);

        assert_eq!(added, 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_permissions_sorted() {
        let registry = PermissionRegistry::new();
        registry.register(["users:read", "roles:read", "manage:system"]);
        assert_eq!(
            registry.permissions(),
            strings(&["manage:system", "roles:read", "users:read"])
        );
    }

    #[test]
    fn test_unknown_permissions() {
        let registry = PermissionRegistry::new();
        registry.register(["users:read"]);

        let candidate = strings(&["users:read", "users:fly", "users:fly", "x"]);
        assert_eq!(registry.unknown(&candidate), vec!["users:fly", "x"]);
    }

    #[test]
    fn test_intersect_preserves_candidate_order() {
        let candidate = strings(&["c", "b", "a", "b"]);
        let required = strings(&["a", "b"]);
        assert_eq!(intersect(&candidate, &required), strings(&["b", "a"]));
    }

    #[test]
    fn test_intersect_any_of_semantics() {
        let required = strings(&["roles:read", "roles:assign"]);
        assert_eq!(
            intersect(&strings(&["roles:assign"]), &required),
            strings(&["roles:assign"])
        );
        assert!(intersect(&strings(&["users:read"]), &required).is_empty());
    }

    #[test]
    fn test_aggregate_permissions_sorted_union() {
        let roles = vec![
            Role::new("editor", strings(&["users:update", "users:read"])),
            Role::new("auditor", strings(&["users:read", "roles:read"])),
        ];
        assert_eq!(
            aggregate_permissions(&roles),
            strings(&["roles:read", "users:read", "users:update"])
        );
        assert!(aggregate_permissions(&Vec::<Role>::new()).is_empty());
    }

    #[test]
    fn test_concurrent_reads_and_late_registration() {
        let registry = Arc::new(PermissionRegistry::new());
        registry.register(["users:read"]);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    registry.register([format!("module{}:read", i % 4)]);
                    registry.contains("users:read")
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(registry.len(), 5);
    }

    proptest! {
        #[test]
        fn prop_register_n_times_leaves_one_entry(permission in "[a-z]{1,8}:[a-z]{1,8}", n in 1usize..20) {
            let registry = PermissionRegistry::new();
            for _ in 0..n {
                registry.register([permission.clone()]);
            }
            prop_assert_eq!(registry.len(), 1);
            prop_assert!(registry.contains(&permission));
        }

        #[test]
        fn prop_intersect_is_deduplicated_subset(
            candidate in proptest::collection::vec("[a-d]", 0..12),
            required in proptest::collection::vec("[a-d]", 0..6),
        ) {
            let result = intersect(&candidate, &required);
            let unique: HashSet<&String> = result.iter().collect();
            prop_assert_eq!(unique.len(), result.len());
            for permission in &result {
                prop_assert!(candidate.contains(permission));
                prop_assert!(required.contains(permission));
            }
        }
    }
}
