//! Code Loader - 번들 위치를 실행 가능한 모듈로 변환
//!
//! 두 가지 전략을 순서대로 시도합니다:
//!
//! 1. **공유 컨테이너**: 프로세스 전역 모듈 컨테이너에 ID로 등록된
//!    팩토리가 있으면 호출합니다. 이미 로드된 공통 의존성을 재사용하여
//!    중복 다운로드를 피하는 경로입니다.
//! 2. **스크립트 주입 폴백**: [`ScriptHost`]를 통해 번들을 주입하고
//!    완료 신호를 기다린 뒤, 플러그인이 전역 등록 테이블에 스스로
//!    등록한 엔트리를 읽습니다.
//!
//! 주입 메커니즘은 플랫폼마다 다르므로 [`ScriptHost`] 트레이트 뒤에
//! 두었습니다. 브라우저 스크립트 태그 대신 동적 라이브러리, 서브프로세스,
//! WASM 인스턴스화 등 어떤 구현도 같은 인터페이스로 대체할 수 있습니다.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use atrium_foundation::{Error, Result};

/// 모듈이 확장 포인트 맵을 내보내는 필드명
pub const EXTENSION_POINTS_KEY: &str = "extensionPoints";

// ============================================================================
// ModuleHandle - 검증된 모듈 참조
// ============================================================================

/// 인스턴스화된 플러그인 모듈에 대한 핸들
///
/// 생성 시점에 모듈의 기본 익스포트 형태를 검증합니다.
/// 형태가 맞지 않는 모듈은 빈 기능 맵으로 조용히 처리되는 대신
/// 로드 에러가 됩니다.
#[derive(Debug, Clone)]
pub struct ModuleHandle {
    /// 모듈의 기본 익스포트 객체
    exports: Value,

    /// 확장 포인트 이름 -> 기능 디스크립터
    capabilities: HashMap<String, Value>,
}

impl ModuleHandle {
    /// 익스포트 객체를 검증하여 핸들 생성
    ///
    /// # Errors
    ///
    /// 익스포트가 객체가 아니거나, `extensionPoints` 멤버가 객체 맵이
    /// 아니면 로드 에러를 반환합니다. `extensionPoints` 멤버가 아예
    /// 없는 것은 유효하며, 기능을 등록하지 않은 플러그인으로 봅니다.
    pub fn from_exports(id: &str, exports: Value) -> Result<Self> {
        let object = exports
            .as_object()
            .ok_or_else(|| Error::load(format!("plugin {id} default export is not an object")))?;

        let capabilities = match object.get(EXTENSION_POINTS_KEY) {
            None => HashMap::new(),
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, capability)| (name.clone(), capability.clone()))
                .collect(),
            Some(_) => {
                return Err(Error::load(format!(
                    "plugin {id} declares a malformed {EXTENSION_POINTS_KEY} map"
                )))
            }
        };

        Ok(Self {
            exports,
            capabilities,
        })
    }

    /// 기본 익스포트 객체
    pub fn exports(&self) -> &Value {
        &self.exports
    }

    /// 확장 포인트 이름 -> 기능 디스크립터 맵
    pub fn capabilities(&self) -> &HashMap<String, Value> {
        &self.capabilities
    }
}

// ============================================================================
// SharedModuleContainer - 공유 모듈 컨테이너
// ============================================================================

/// 모듈 팩토리 - 호출하면 모듈의 기본 익스포트 객체를 만들어 반환
pub type ModuleFactory = Arc<dyn Fn() -> Result<Value> + Send + Sync>;

/// 프로세스 전역 연합(federated) 모듈 컨테이너
///
/// 여러 플러그인이 이미 로드된 공통 의존성을 공유할 수 있게 합니다.
/// 컨테이너 자체는 선택적이며, 없으면 로더는 곧바로 주입 폴백으로
/// 넘어갑니다.
#[derive(Default)]
pub struct SharedModuleContainer {
    factories: RwLock<HashMap<String, ModuleFactory>>,
}

impl SharedModuleContainer {
    /// 새 컨테이너 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 팩토리 등록
    pub async fn register(
        &self,
        id: impl Into<String>,
        factory: impl Fn() -> Result<Value> + Send + Sync + 'static,
    ) {
        let mut factories = self.factories.write().await;
        factories.insert(id.into(), Arc::new(factory));
    }

    /// 팩토리 조회
    pub async fn get(&self, id: &str) -> Option<ModuleFactory> {
        let factories = self.factories.read().await;
        factories.get(id).cloned()
    }

    /// 등록 여부 확인
    pub async fn contains(&self, id: &str) -> bool {
        let factories = self.factories.read().await;
        factories.contains_key(id)
    }
}

// ============================================================================
// RegistrationTable - 전역 등록 테이블
// ============================================================================

/// 플러그인이 번들 실행 시 스스로 등록하는 전역 테이블
///
/// 주입된 코드만 이 테이블에 쓰고, 로더는 완료 신호 이후에 읽기만
/// 합니다.
#[derive(Default)]
pub struct RegistrationTable {
    entries: RwLock<HashMap<String, Value>>,
}

impl RegistrationTable {
    /// 새 테이블 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 플러그인 자기 등록
    pub async fn register(&self, id: impl Into<String>, exports: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(id.into(), exports);
    }

    /// 등록된 익스포트 조회
    pub async fn get(&self, id: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries.get(id).cloned()
    }

    /// 등록 여부 확인
    pub async fn contains(&self, id: &str) -> bool {
        let entries = self.entries.read().await;
        entries.contains_key(id)
    }
}

// ============================================================================
// ScriptHost - 주입 메커니즘 경계
// ============================================================================

/// 번들 주입 메커니즘
///
/// `inject`는 번들 로드의 완료 신호가 올 때까지 대기합니다.
/// 성공이 반환되어도 플러그인이 등록 테이블에 자기 등록을 했는지는
/// 보장하지 않습니다. 그 확인은 [`CodeLoader`]의 몫입니다.
#[async_trait]
pub trait ScriptHost: Send + Sync {
    /// 번들을 주입하고 완료 신호를 대기
    async fn inject(&self, bundle_location: &str) -> Result<()>;
}

// ============================================================================
// CodeLoader - 전략 오케스트레이션
// ============================================================================

/// 번들 위치를 모듈 핸들로 변환하는 로더
pub struct CodeLoader {
    /// 공유 모듈 컨테이너 (선택적)
    container: Option<Arc<SharedModuleContainer>>,

    /// 전역 등록 테이블
    registration: Arc<RegistrationTable>,

    /// 주입 메커니즘
    host: Arc<dyn ScriptHost>,
}

impl CodeLoader {
    /// 새 로더 생성
    pub fn new(
        host: Arc<dyn ScriptHost>,
        registration: Arc<RegistrationTable>,
        container: Option<Arc<SharedModuleContainer>>,
    ) -> Self {
        Self {
            container,
            registration,
            host,
        }
    }

    /// 등록 테이블 접근
    pub fn registration(&self) -> &Arc<RegistrationTable> {
        &self.registration
    }

    /// 모듈 로드
    ///
    /// 컨테이너 조회를 먼저 시도하고, 없거나 실패하면 주입 폴백으로
    /// 넘어갑니다. 두 전략은 병렬이 아니라 순차입니다.
    ///
    /// 주입은 ID 기준으로 멱등합니다. 등록 테이블에 이미 엔트리가 있으면
    /// 주입 없이 즉시 해석합니다. 레지스트리의 중복 제거보다 먼저
    /// 경쟁하는 호출이 중복 주입을 일으키지 않게 하는 이중 방어입니다.
    ///
    /// # Errors
    ///
    /// 두 전략 모두 사용 가능한 모듈을 만들지 못하면 로드 에러를
    /// 반환합니다. 주입이 성공했는데 등록 엔트리가 없는 경우는
    /// 네트워크/스크립트 실패와 구분되는 별도의 실패 메시지를 가집니다.
    pub async fn load(&self, bundle_location: &str, id: &str) -> Result<ModuleHandle> {
        // 1. 공유 컨테이너 전략
        if let Some(container) = &self.container {
            if let Some(factory) = container.get(id).await {
                debug!("Loading plugin {} from shared container", id);
                match factory().and_then(|exports| ModuleHandle::from_exports(id, exports)) {
                    Ok(handle) => return Ok(handle),
                    Err(e) => {
                        warn!(
                            "Shared container factory for {} failed ({}), falling back to injection",
                            id, e
                        );
                    }
                }
            }
        }

        // 2. 스크립트 주입 폴백
        if !self.registration.contains(id).await {
            debug!("Injecting bundle for plugin {}: {}", id, bundle_location);
            self.host.inject(bundle_location).await?;
        } else {
            debug!("Plugin {} already present in registration table", id);
        }

        let exports = self.registration.get(id).await.ok_or_else(|| {
            Error::load(format!(
                "plugin {id} not found in registration table after loading"
            ))
        })?;

        ModuleHandle::from_exports(id, exports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 주입 시 등록 테이블에 엔트리를 기록하는 테스트 호스트
    struct RecordingHost {
        table: Arc<RegistrationTable>,
        id: String,
        exports: Value,
        injections: AtomicUsize,
    }

    #[async_trait]
    impl ScriptHost for RecordingHost {
        async fn inject(&self, _bundle_location: &str) -> Result<()> {
            self.injections.fetch_add(1, Ordering::SeqCst);
            self.table.register(self.id.clone(), self.exports.clone()).await;
            Ok(())
        }
    }

    /// 성공 신호는 보내지만 자기 등록을 하지 않는 호스트
    struct SilentHost;

    #[async_trait]
    impl ScriptHost for SilentHost {
        async fn inject(&self, _bundle_location: &str) -> Result<()> {
            Ok(())
        }
    }

    struct FailingHost;

    #[async_trait]
    impl ScriptHost for FailingHost {
        async fn inject(&self, bundle_location: &str) -> Result<()> {
            Err(Error::load(format!("script error: 404 {bundle_location}")))
        }
    }

    fn exports_with_point(name: &str) -> Value {
        json!({ "extensionPoints": { name: { "component": "Page" } } })
    }

    #[tokio::test]
    async fn test_container_strategy_first() {
        let table = Arc::new(RegistrationTable::new());
        let container = Arc::new(SharedModuleContainer::new());
        container
            .register("p1", || Ok(exports_with_point("admin.page")))
            .await;

        let loader = CodeLoader::new(Arc::new(FailingHost), table, Some(container));

        // 컨테이너가 응답하므로 주입 호스트(항상 실패)는 호출되지 않는다
        let handle = loader.load("https://cdn.example.com/p1.js", "p1").await.unwrap();
        assert!(handle.capabilities().contains_key("admin.page"));
    }

    #[tokio::test]
    async fn test_container_failure_falls_back_to_injection() {
        let table = Arc::new(RegistrationTable::new());
        let container = Arc::new(SharedModuleContainer::new());
        container
            .register("p1", || Err(Error::load("factory exploded")))
            .await;

        let host = Arc::new(RecordingHost {
            table: Arc::clone(&table),
            id: "p1".into(),
            exports: exports_with_point("admin.page"),
            injections: AtomicUsize::new(0),
        });

        let loader = CodeLoader::new(Arc::clone(&host) as Arc<dyn ScriptHost>, table, Some(container));
        let handle = loader.load("https://cdn.example.com/p1.js", "p1").await.unwrap();

        assert_eq!(host.injections.load(Ordering::SeqCst), 1);
        assert!(handle.capabilities().contains_key("admin.page"));
    }

    #[tokio::test]
    async fn test_injection_skipped_when_already_registered() {
        let table = Arc::new(RegistrationTable::new());
        table.register("p1", exports_with_point("admin.page")).await;

        let host = Arc::new(RecordingHost {
            table: Arc::clone(&table),
            id: "p1".into(),
            exports: exports_with_point("admin.page"),
            injections: AtomicUsize::new(0),
        });

        let loader = CodeLoader::new(Arc::clone(&host) as Arc<dyn ScriptHost>, table, None);
        loader.load("https://cdn.example.com/p1.js", "p1").await.unwrap();

        assert_eq!(host.injections.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_registration_after_load() {
        let table = Arc::new(RegistrationTable::new());
        let loader = CodeLoader::new(Arc::new(SilentHost), table, None);

        let err = loader
            .load("https://cdn.example.com/p1.js", "p1")
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("not found in registration table after loading"));
    }

    #[tokio::test]
    async fn test_script_failure_propagates() {
        let table = Arc::new(RegistrationTable::new());
        let loader = CodeLoader::new(Arc::new(FailingHost), table, None);

        let err = loader
            .load("https://cdn.example.com/missing.js", "p1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("script error"));
    }

    #[tokio::test]
    async fn test_malformed_exports_rejected() {
        let table = Arc::new(RegistrationTable::new());
        table.register("p1", json!("not an object")).await;

        let loader = CodeLoader::new(Arc::new(SilentHost), table, None);
        let err = loader
            .load("https://cdn.example.com/p1.js", "p1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not an object"));
    }

    #[tokio::test]
    async fn test_malformed_extension_points_rejected() {
        let table = Arc::new(RegistrationTable::new());
        table
            .register("p1", json!({ "extensionPoints": ["admin.page"] }))
            .await;

        let loader = CodeLoader::new(Arc::new(SilentHost), table, None);
        let err = loader
            .load("https://cdn.example.com/p1.js", "p1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn test_module_without_extension_points_is_valid() {
        let handle = ModuleHandle::from_exports("p1", json!({ "version": "1.0.0" })).unwrap();
        assert!(handle.capabilities().is_empty());

        // 원본 익스포트 객체는 그대로 보존된다
        assert_eq!(handle.exports()["version"], "1.0.0");
    }
}
