//! Keygate API 서버 진입점.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use axum::http::StatusCode;
use keygate_core::{init_logging, AppConfig, LogConfig, PermissionRegistry, Principal, Role, MANAGE_SYSTEM};
use keygate_session::RedisSessionStore;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use keygate_api::auth::{hash_password, Argon2Verifier};
use keygate_api::repository::{
    InMemoryPrincipalRepository, InMemoryRoleRepository, PrincipalRepository, RepositoryError,
    RoleRepository,
};
use keygate_api::{bootstrap_registry, create_api_router, default_modules, AppState};

const ADMIN_ROLE: &str = "administrator";

/// 환경 변수로 지정된 관리자 계정을 생성합니다.
///
/// `KEYGATE_ADMIN_EMAIL`과 `KEYGATE_ADMIN_PASSWORD`가 모두 있을 때만 동작하며,
/// 이미 있는 계정은 건드리지 않습니다.
async fn seed_admin(
    principals: &InMemoryPrincipalRepository,
    roles: &InMemoryRoleRepository,
) -> anyhow::Result<()> {
    let (Ok(email), Ok(password)) = (
        std::env::var("KEYGATE_ADMIN_EMAIL"),
        std::env::var("KEYGATE_ADMIN_PASSWORD"),
    ) else {
        info!("No admin seed configured");
        return Ok(());
    };

    let role = match roles.find_by_name(ADMIN_ROLE).await {
        Ok(role) => role,
        Err(RepositoryError::NotFound) => {
            roles
                .create(Role::new(ADMIN_ROLE, vec![MANAGE_SYSTEM.to_string()]))
                .await?
        }
        Err(e) => return Err(e.into()),
    };

    let digest = hash_password(&password).map_err(|e| anyhow!("failed to hash admin password: {e}"))?;
    let principal = match principals
        .create(Principal::new(email.as_str(), "Administrator", digest))
        .await
    {
        Ok(principal) => principal,
        Err(RepositoryError::Duplicate(_)) => {
            warn!("Admin account already exists; skipping seed");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    principals.assign_role(principal.id, role.id).await?;
    info!(principal_id = %principal.id, "Admin account seeded");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;

    init_logging(LogConfig::from_config(&config.logging))
        .map_err(|e| anyhow!("failed to initialize logging: {e}"))?;

    info!("Starting Keygate API server...");

    let sessions = RedisSessionStore::connect(&config.redis)
        .await
        .context("failed to connect session store")?;

    // 권한 레지스트리는 라우터 구성 전에 채워져야 함
    let registry = Arc::new(PermissionRegistry::new());
    let modules = default_modules();
    bootstrap_registry(&registry, &modules);

    let roles = InMemoryRoleRepository::new();
    let principals = InMemoryPrincipalRepository::new(roles.clone());
    seed_admin(&principals, &roles).await?;

    let state = Arc::new(AppState::new(
        &config.security,
        registry,
        Arc::new(sessions),
        Arc::new(principals),
        Arc::new(roles),
        Arc::new(Argon2Verifier),
    )
    .with_rate_limit(&config.rate_limit));

    match &state.rate_limiter {
        Some(limiter) => {
            limiter.spawn_cleanup();
            info!(
                requests_per_minute = config.rate_limit.requests_per_minute,
                burst_size = config.rate_limit.burst_size,
                "Auth rate limiting enabled"
            );
        }
        None => warn!("Auth rate limiting disabled"),
    }

    let app = create_api_router(&state, &modules)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.request_timeout_secs),
        ))
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server stopped");
    Ok(())
}
