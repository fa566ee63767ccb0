//! 기능 모듈.
//!
//! 각 기능 모듈은 자신이 도입하는 권한 문자열과 라우터를 제공합니다.
//! 부트스트랩 시 [`bootstrap_registry`]가 모든 모듈의 권한을 레지스트리에
//! 등록하고, [`crate::routes::create_api_router`]가 라우터를 `/api/v1/<name>`
//! 아래에 붙입니다.

use std::sync::Arc;

use axum::Router;
use keygate_core::PermissionRegistry;
use tracing::info;

use crate::routes::{AuthModule, RolesModule, SystemModule, UsersModule};
use crate::state::AppState;

/// 기능 모듈.
pub trait FeatureModule: Send + Sync {
    /// 경로 접두사로도 쓰이는 모듈 이름.
    fn name(&self) -> &'static str;

    /// 모듈이 도입하는 권한 목록.
    fn permissions(&self) -> &'static [&'static str];

    /// 모듈 라우터. 보호된 라우트에는 접근 가드를 적용해야 합니다.
    fn router(&self, state: &Arc<AppState>) -> Router<Arc<AppState>>;
}

/// 기본 기능 모듈 목록.
pub fn default_modules() -> Vec<Box<dyn FeatureModule>> {
    vec![
        Box::new(AuthModule),
        Box::new(UsersModule),
        Box::new(RolesModule),
        Box::new(SystemModule),
    ]
}

/// 모든 모듈의 권한을 레지스트리에 등록합니다.
///
/// 여러 번 호출해도 결과는 같습니다.
pub fn bootstrap_registry(registry: &PermissionRegistry, modules: &[Box<dyn FeatureModule>]) {
    for module in modules {
        let added = registry.register(module.permissions().iter().copied());
        info!(module = module.name(), added, "Module permissions registered");
    }
    info!(total = registry.len(), "Permission registry ready");
}
