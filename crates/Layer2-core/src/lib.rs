//! atrium-core: Core Runtime for Atrium
//!
//! Layer2 - 플러그인 런타임 레이어
//!
//! # 주요 모듈
//!
//! - `plugin`: 동적 플러그인 시스템 (발견, 로드, 감독)
//!
//! # 사용 예시
//!
//! ```ignore
//! use atrium_core::{PluginRuntime, ScriptHost};
//! use atrium_foundation::RuntimeConfig;
//!
//! // 런타임 구성 (애플리케이션 시작 시 한 번)
//! let config = RuntimeConfig::load_from("atrium.json").await?;
//! let runtime = PluginRuntime::with_http_catalog(&config, host, None)?;
//!
//! // 설치된 플러그인 배치 로드
//! let report = runtime.loader().load_installed().await?;
//!
//! // 확장 포인트 해석
//! let bindings = runtime
//!     .dispatcher()
//!     .resolve("admin.page", &json!({ "route": "/admin" }), None)
//!     .await;
//! ```

// Core modules
pub mod plugin;

// Re-exports: Plugin Runtime
pub use plugin::{
    CapabilityBinding, CatalogService, EventBus, EventKind, ExtensionPointDispatcher, HttpCatalog,
    LoadReport, LoadedPlugin, ModuleHandle, PluginEvent, PluginLoader, PluginMetadata,
    PluginRegistry, PluginRuntime, PluginStatus, RegistrationTable, RuntimeSummary, ScriptHost,
    SharedModuleContainer,
};

// Re-exports: Foundation
pub use atrium_foundation::{Error, Result, RuntimeConfig};
