//! # Plugin System
//!
//! Atrium 동적 플러그인 시스템
//!
//! ## 개요
//!
//! 원격 카탈로그에 게시된 플러그인 번들을 런타임에 발견, 로드, 관리
//! 합니다:
//! - 카탈로그 조회 및 배치 로드
//! - 확장 포인트 인덱스 (우선순위 내림차순)
//! - 생명주기 이벤트 (loaded / error / unloaded)
//! - 플러그인별 실패 격리
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PluginRuntime                          │
//! │  ┌───────────────┐  ┌────────────────────────────────────┐ │
//! │  │ PluginLoader  │─▶│          PluginRegistry            │ │
//! │  │ (배치 스윕)   │  │  ┌──────────┬──────────┬────────┐  │ │
//! │  └──────┬────────┘  │  │ Plugin A │ Plugin B │ ...    │  │ │
//! │         │           │  └──────────┴──────────┴────────┘  │ │
//! │  ┌──────▼────────┐  │  확장 포인트 인덱스 + EventBus     │ │
//! │  │ CatalogService│  └──────────────┬─────────────────────┘ │
//! │  │ (HTTP)        │                 │                       │
//! │  └───────────────┘  ┌──────────────▼─────────────────────┐ │
//! │                     │     ExtensionPointDispatcher       │ │
//! │  ┌───────────────┐  └────────────────────────────────────┘ │
//! │  │ CodeLoader    │  공유 컨테이너 → 스크립트 주입 →       │
//! │  │ + ScriptHost  │  등록 테이블 확인                      │ │
//! │  └───────────────┘                                         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 로드 경로
//!
//! 1. **공유 컨테이너**: 호스트 애플리케이션과 함께 번들된 모듈
//! 2. **스크립트 주입**: `ScriptHost`를 통한 원격 번들 실행 후
//!    전역 등록 테이블 확인

mod catalog;
mod code_loader;
mod dispatcher;
mod events;
mod loader;
mod metadata;
mod registry;
mod runtime;

pub use catalog::{CatalogService, HttpCatalog};
pub use code_loader::{
    CodeLoader, ModuleFactory, ModuleHandle, RegistrationTable, ScriptHost, SharedModuleContainer,
};
pub use dispatcher::{CapabilityBinding, ExtensionPointDispatcher, PluginFilter};
pub use events::{EventBus, EventKind, PluginEvent, Subscriber, SubscriptionId};
pub use loader::{LoadReport, PluginLoader};
pub use metadata::{PluginMetadata, RawPluginMetadata};
pub use registry::{LoadedPlugin, PluginRegistry, PluginStatus};
pub use runtime::{PluginRuntime, RuntimeSummary};
