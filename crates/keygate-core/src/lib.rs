//! # Keygate Core
//!
//! 인증/인가 시스템의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 다른 크레이트에서 공통으로 사용하는 기본 타입을 제공합니다:
//! - 권한 레지스트리 (모듈별 권한 카탈로그)
//! - Principal / Role 도메인 모델
//! - 인증 에러 분류 체계
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
