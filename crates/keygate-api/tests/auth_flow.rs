//! 로그인부터 권한 검사, 로그아웃까지의 전체 흐름 테스트.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use keygate_api::auth::hash_password;
use keygate_api::auth::Argon2Verifier;
use keygate_api::repository::{
    InMemoryPrincipalRepository, InMemoryRoleRepository, PrincipalRepository, RoleRepository,
};
use keygate_api::{bootstrap_registry, create_api_router, default_modules, AppState};
use keygate_core::{PermissionRegistry, Principal, Role, SecurityConfig, MANAGE_SYSTEM};
use keygate_session::{InMemorySessionStore, SessionStore};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret-key-32-bytes-min";
const PASSWORD: &str = "Password1";

struct TestApp {
    router: Router,
    sessions: InMemorySessionStore,
    principals: InMemoryPrincipalRepository,
    roles: InMemoryRoleRepository,
}

impl TestApp {
    fn new() -> Self {
        let security = SecurityConfig {
            jwt_secret: SECRET.to_string(),
            ..Default::default()
        };
        let registry = Arc::new(PermissionRegistry::new());
        let modules = default_modules();
        bootstrap_registry(&registry, &modules);

        let sessions = InMemorySessionStore::new();
        let roles = InMemoryRoleRepository::new();
        let principals = InMemoryPrincipalRepository::new(roles.clone());

        let state = Arc::new(AppState::new(
            &security,
            registry,
            Arc::new(sessions.clone()),
            Arc::new(principals.clone()),
            Arc::new(roles.clone()),
            Arc::new(Argon2Verifier),
        ));
        let router = create_api_router(&state, &modules).with_state(state);

        Self {
            router,
            sessions,
            principals,
            roles,
        }
    }

    /// 지정한 권한의 역할을 가진 사용자를 만듭니다.
    async fn user_with(&self, email: &str, permissions: &[&str]) -> Principal {
        let principal = self
            .principals
            .create(Principal::new(email, "Tester", hash_password(PASSWORD).unwrap()))
            .await
            .unwrap();

        if !permissions.is_empty() {
            let role = self
                .roles
                .create(Role::new(
                    format!("role-{}", Uuid::new_v4()),
                    permissions.iter().map(|p| p.to_string()).collect(),
                ))
                .await
                .unwrap();
            self.principals
                .assign_role(principal.id, role.id)
                .await
                .unwrap();
        }
        principal
    }

    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn login(&self, email: &str) -> (String, String) {
        let (status, body) = self
            .send(
                "POST",
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

#[tokio::test]
async fn test_login_returns_tokens_and_payload() {
    let app = TestApp::new();
    let principal = app
        .user_with("kim@example.com", &["users:read", "roles:read"])
        .await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "kim@example.com", "password": PASSWORD })),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(principal.id));
    assert_eq!(body["data"]["permission"], json!(["roles:read", "users:read"]));
    assert!(body["data"].get("password_digest").is_none());

    let refresh = body["refresh_token"].as_str().unwrap();
    assert_eq!(
        app.sessions.get_refresh_subject(refresh).await.unwrap(),
        Some(principal.id.to_string())
    );
}

#[tokio::test]
async fn test_wrong_password_and_unknown_email_look_the_same() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[]).await;

    let (s1, b1) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "kim@example.com", "password": "Wrong123" })),
        )
        .await;
    let (s2, b2) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "ghost@example.com", "password": "Wrong123" })),
        )
        .await;

    assert_eq!(s1, StatusCode::UNAUTHORIZED);
    assert_eq!(s2, StatusCode::UNAUTHORIZED);
    assert_eq!(b1, b2);
    assert_eq!(b1["code"], "UNAUTHORIZED");
    assert_eq!(b1["status"], 401);
}

#[tokio::test]
async fn test_protected_route_requires_valid_token() {
    let app = TestApp::new();

    let (status, body) = app.send("GET", "/api/v1/users/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = app
        .send("GET", "/api/v1/users/me", Some("not.a.token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_raw_token_without_bearer_prefix_is_accepted() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[]).await;
    let (access, _) = app.login("kim@example.com").await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/users/me")
                .header("authorization", access)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_token_cannot_be_used_as_access_token() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[]).await;
    let (_, refresh) = app.login("kim@example.com").await;

    let (status, _) = app
        .send("GET", "/api/v1/users/me", Some(&refresh), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_any_of_permission_semantics() {
    let app = TestApp::new();
    app.user_with("viewer@example.com", &["users:read"]).await;
    app.user_with("editor@example.com", &["roles:update"]).await;
    let (viewer, _) = app.login("viewer@example.com").await;
    let (editor, _) = app.login("editor@example.com").await;

    // 카탈로그는 roles:create 또는 roles:update 중 하나면 허용
    let (status, body) = app
        .send("GET", "/api/v1/system/permissions", Some(&editor), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["permissions"]
        .as_array()
        .unwrap()
        .contains(&json!("roles:assign")));

    let (status, body) = app
        .send("GET", "/api/v1/system/permissions", Some(&viewer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_manage_system_bypasses_all_checks() {
    let app = TestApp::new();
    app.user_with("admin@example.com", &[MANAGE_SYSTEM]).await;
    let (admin, _) = app.login("admin@example.com").await;

    let (status, role) = app
        .send(
            "POST",
            "/api/v1/roles",
            Some(&admin),
            Some(json!({ "name": "auditor", "permissions": ["users:read"] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app.send("GET", "/api/v1/roles", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "DELETE",
            &format!("/api/v1/roles/{}", role["id"].as_str().unwrap()),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_role_with_unregistered_permission_is_rejected() {
    let app = TestApp::new();
    app.user_with("admin@example.com", &["roles:create"]).await;
    let (token, _) = app.login("admin@example.com").await;

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/roles",
            Some(&token),
            Some(json!({ "name": "pilot", "permissions": ["planes:fly"] })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("planes:fly"));
}

#[tokio::test]
async fn test_stale_snapshot_until_refresh() {
    let app = TestApp::new();
    let principal = app.user_with("kim@example.com", &["users:read"]).await;
    let (access, refresh) = app.login("kim@example.com").await;

    let (status, _) = app.send("GET", "/api/v1/roles", Some(&access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // 역할 추가
    let role = app
        .roles
        .create(Role::new("role-reader", vec!["roles:read".to_string()]))
        .await
        .unwrap();
    app.principals
        .assign_role(principal.id, role.id)
        .await
        .unwrap();

    // 기존 토큰은 여전히 예전 권한
    let (status, _) = app.send("GET", "/api/v1/roles", Some(&access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refresh_token"], json!(refresh));
    let renewed = body["access_token"].as_str().unwrap().to_string();

    let (status, _) = app.send("GET", "/api/v1/roles", Some(&renewed), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_after_mapping_deleted_is_unauthorized() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[]).await;
    let (_, refresh) = app.login("kim@example.com").await;

    app.sessions.delete_refresh(&refresh).await.unwrap();

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_revokes_access_and_refresh() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[]).await;
    let (access, refresh) = app.login("kim@example.com").await;

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/logout",
            Some(&access),
            Some(json!({ "refresh_token": &refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/api/v1/users/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_concurrent_sessions_are_independent() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[]).await;

    let logins = futures::future::join_all((0..4).map(|_| app.login("kim@example.com"))).await;
    let unique: std::collections::HashSet<_> = logins.iter().map(|(a, r)| (a, r)).collect();
    assert_eq!(unique.len(), logins.len());
    let (first, second) = (&logins[0], &logins[1]);
    assert_ne!(first.0, second.0);
    assert_ne!(first.1, second.1);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/logout",
            Some(&first.0),
            Some(json!({ "refresh_token": &first.1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.send("GET", "/api/v1/users/me", Some(&first.0), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send("GET", "/api/v1/users/me", Some(&second.0), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &second.1 })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_store_outage_fails_closed() {
    let app = TestApp::new();
    app.user_with("kim@example.com", &[MANAGE_SYSTEM]).await;
    let (access, refresh) = app.login("kim@example.com").await;

    app.sessions.set_available(false);

    // 폐기 여부를 확인할 수 없으면 관리자 토큰도 거부
    let (status, _) = app.send("GET", "/api/v1/users/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "kim@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app.send("GET", "/health/ready", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    app.sessions.set_available(true);
    let (status, _) = app.send("GET", "/api/v1/users/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_user_management_flow() {
    let app = TestApp::new();
    app.user_with("admin@example.com", &["users:create", "users:read", "roles:assign"])
        .await;
    let (admin, _) = app.login("admin@example.com").await;

    let (status, created) = app
        .send(
            "POST",
            "/api/v1/users",
            Some(&admin),
            Some(json!({ "email": "new@example.com", "name": "New", "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created.get("password_digest").is_none());

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/users",
            Some(&admin),
            Some(json!({ "email": "new@example.com", "name": "Dup", "password": "Secret123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = app
        .send("GET", &format!("/api/v1/users/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["email"], "new@example.com");

    let role = app
        .roles
        .create(Role::new("reader", vec!["users:read".to_string()]))
        .await
        .unwrap();
    let (status, _) = app
        .send(
            "POST",
            "/api/v1/roles/assign",
            Some(&admin),
            Some(json!({ "user_id": id, "role_id": role.id })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send("GET", "/api/v1/users/not-a-uuid", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_role_update_reflected_after_refresh() {
    let app = TestApp::new();
    let principal = app.user_with("kim@example.com", &[]).await;
    let mut role = app
        .roles
        .create(Role::new("member", vec!["users:read".to_string()]))
        .await
        .unwrap();
    app.principals
        .assign_role(principal.id, role.id)
        .await
        .unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({ "email": "kim@example.com", "password": PASSWORD })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["permission"], json!(["users:read"]));
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    role.set_permissions(vec!["users:read".to_string(), "users:delete".to_string()]);
    app.roles.update(role).await.unwrap();

    let (status, body) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["permission"], json!(["users:delete", "users:read"]));
}

#[tokio::test]
async fn test_user_list_update_delete_are_guarded() {
    let app = TestApp::new();
    app.user_with(
        "admin@example.com",
        &["users:read", "users:update", "users:delete"],
    )
    .await;
    app.user_with("reader@example.com", &["users:read"]).await;
    let target = app.user_with("target@example.com", &[]).await;
    let (admin, _) = app.login("admin@example.com").await;
    let (reader, _) = app.login("reader@example.com").await;
    let (_, target_refresh) = app.login("target@example.com").await;

    let (status, page) = app
        .send("GET", "/api/v1/users?page=1&limit=2", Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    assert_eq!(
        page["paging"],
        json!({ "limit": 2, "page": 1, "total_items": 3, "total_pages": 2 })
    );

    let (status, page) = app
        .send("GET", "/api/v1/users?search=target", Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["paging"]["total_items"], 1);
    assert_eq!(page["items"][0]["email"], "target@example.com");

    let (status, _) = app
        .send("GET", "/api/v1/users?limit=0", Some(&reader), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/api/v1/users/{}", target.id);
    let (status, _) = app
        .send("PUT", &uri, Some(&reader), Some(json!({ "name": "Nope" })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, updated) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "name": "Renamed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Renamed");
    assert!(updated.get("password_digest").is_none());

    let (status, _) = app
        .send("PUT", &uri, Some(&admin), Some(json!({ "name": "   " })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.send("DELETE", &uri, Some(&reader), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send("DELETE", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send("GET", &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            "POST",
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": &target_refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
