//! Plugin Runtime - 전체 배선 파사드
//!
//! 레지스트리, 로더, 디스패처를 한 번에 구성합니다. 전역 싱글턴 대신
//! 애플리케이션 시작 시 한 번 만들어 참조로 전달하는 명시적 인스턴스
//! 입니다. "권위 있는 인스턴스는 하나"라는 의미는 애플리케이션이 이
//! 값을 하나만 만들어 공유하는 것으로 달성합니다.

use std::sync::Arc;

use super::catalog::{CatalogService, HttpCatalog};
use super::code_loader::{CodeLoader, RegistrationTable, ScriptHost, SharedModuleContainer};
use super::dispatcher::ExtensionPointDispatcher;
use super::loader::PluginLoader;
use super::registry::{PluginRegistry, PluginStatus};
use atrium_foundation::{Result, RuntimeConfig};

/// 플러그인 시스템 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeSummary {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
    pub loading: usize,
}

/// 플러그인 런타임 - 레지스트리/로더/디스패처 묶음
pub struct PluginRuntime {
    /// 플러그인 레지스트리
    registry: Arc<PluginRegistry>,

    /// 배치 로더
    loader: PluginLoader,

    /// 확장 포인트 디스패처
    dispatcher: ExtensionPointDispatcher,

    /// 전역 등록 테이블
    ///
    /// 번들을 실행하는 호스트 글루가 플러그인 자기 등록을 전달할 때
    /// 사용합니다.
    registration: Arc<RegistrationTable>,
}

impl PluginRuntime {
    /// 구성 요소를 지정하여 런타임 생성
    pub fn new(
        config: &RuntimeConfig,
        catalog: Arc<dyn CatalogService>,
        host: Arc<dyn ScriptHost>,
        container: Option<Arc<SharedModuleContainer>>,
    ) -> Self {
        let registration = Arc::new(RegistrationTable::new());
        let code_loader = CodeLoader::new(host, Arc::clone(&registration), container);
        let registry = Arc::new(PluginRegistry::new(code_loader));
        let loader = PluginLoader::new(Arc::clone(&registry), catalog, config);
        let dispatcher = ExtensionPointDispatcher::new(Arc::clone(&registry));

        Self {
            registry,
            loader,
            dispatcher,
            registration,
        }
    }

    /// HTTP 카탈로그로 런타임 생성
    ///
    /// # Errors
    ///
    /// HTTP 클라이언트 구성에 실패하면 에러를 반환합니다.
    pub fn with_http_catalog(
        config: &RuntimeConfig,
        host: Arc<dyn ScriptHost>,
        container: Option<Arc<SharedModuleContainer>>,
    ) -> Result<Self> {
        let catalog = Arc::new(HttpCatalog::new(config)?);
        Ok(Self::new(config, catalog, host, container))
    }

    // ========================================================================
    // 접근자
    // ========================================================================

    /// 플러그인 레지스트리 접근
    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// 배치 로더 접근
    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    /// 확장 포인트 디스패처 접근
    pub fn dispatcher(&self) -> &ExtensionPointDispatcher {
        &self.dispatcher
    }

    /// 전역 등록 테이블 접근
    pub fn registration_table(&self) -> &Arc<RegistrationTable> {
        &self.registration
    }

    // ========================================================================
    // 유틸리티
    // ========================================================================

    /// 플러그인 시스템 요약
    pub async fn summary(&self) -> RuntimeSummary {
        let mut summary = RuntimeSummary::default();
        for record in self.registry.get_all().await {
            summary.total += 1;
            match record.status {
                PluginStatus::Loaded => summary.loaded += 1,
                PluginStatus::Failed => summary.failed += 1,
                PluginStatus::Loading => summary.loading += 1,
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::metadata::PluginMetadata;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticCatalog {
        plugins: Vec<PluginMetadata>,
    }

    #[async_trait]
    impl CatalogService for StaticCatalog {
        async fn available_plugins(&self) -> Result<Vec<PluginMetadata>> {
            Ok(self.plugins.clone())
        }

        async fn installed_plugins(
            &self,
            _organization_id: Option<&str>,
        ) -> Result<Vec<PluginMetadata>> {
            Ok(self.plugins.clone())
        }

        async fn plugin(&self, id: &str) -> Result<Option<PluginMetadata>> {
            Ok(self.plugins.iter().find(|m| m.id == id).cloned())
        }
    }

    /// 런타임 자신의 등록 테이블에 자기 등록을 수행하는 호스트
    struct SelfRegisteringHost {
        registration: std::sync::Mutex<Option<Arc<RegistrationTable>>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl ScriptHost for SelfRegisteringHost {
        async fn inject(&self, bundle_location: &str) -> Result<()> {
            let id = bundle_location
                .rsplit('/')
                .next()
                .unwrap()
                .trim_end_matches(".js")
                .to_string();
            if self.failing.contains(&id) {
                return Err(atrium_foundation::Error::load("script error"));
            }
            let table = self.registration.lock().unwrap().clone().unwrap();
            table
                .register(id, json!({ "extensionPoints": { "admin.page": { "component": "Page" } } }))
                .await;
            Ok(())
        }
    }

    fn runtime(ids: &[&str], failing: &[&str]) -> PluginRuntime {
        let host = Arc::new(SelfRegisteringHost {
            registration: std::sync::Mutex::new(None),
            failing: failing.iter().map(|s| s.to_string()).collect(),
        });
        let catalog = Arc::new(StaticCatalog {
            plugins: ids
                .iter()
                .map(|id| {
                    PluginMetadata::new(*id, format!("https://cdn.example.com/{id}.js"))
                        .with_extension_point("admin.page")
                })
                .collect(),
        });

        let runtime = PluginRuntime::new(
            &RuntimeConfig::default(),
            catalog,
            Arc::clone(&host) as Arc<dyn ScriptHost>,
            None,
        );
        *host.registration.lock().unwrap() = Some(Arc::clone(runtime.registration_table()));
        runtime
    }

    #[tokio::test]
    async fn test_end_to_end_load_and_resolve() {
        let runtime = runtime(&["p1", "p2"], &[]);

        let report = runtime.loader().load_installed().await.unwrap();
        assert_eq!(report.loaded, 2);

        let bindings = runtime
            .dispatcher()
            .resolve("admin.page", &json!({ "route": "/admin" }), None)
            .await;
        assert_eq!(bindings.len(), 2);
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let runtime = runtime(&["p1", "p2", "p3"], &["p2"]);
        runtime.loader().load_available().await.unwrap();

        let summary = runtime.summary().await;
        assert_eq!(
            summary,
            RuntimeSummary {
                total: 3,
                loaded: 2,
                failed: 1,
                loading: 0,
            }
        );
    }
}
