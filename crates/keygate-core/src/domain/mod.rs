//! 도메인 모델.

pub mod permission;
pub mod principal;

pub use permission::{aggregate_permissions, intersect, PermissionRegistry, MANAGE_SYSTEM};
pub use principal::{Principal, Role, RoleSummary};
