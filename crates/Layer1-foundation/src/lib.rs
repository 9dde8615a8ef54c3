//! # atrium-foundation
//!
//! Foundation layer for Atrium:
//! - Error: 중앙 에러 타입 (thiserror 기반, Result alias)
//! - Config: 런타임 설정 (카탈로그 URL, 배치 파라미터)
//!
//! 상위 레이어(atrium-core)의 플러그인 런타임이 공통으로 사용하는
//! 기반 타입만 포함합니다.

pub mod config;
pub mod error;

pub use config::RuntimeConfig;
pub use error::{Error, Result};
