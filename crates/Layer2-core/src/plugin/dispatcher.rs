//! Extension Point Dispatcher - 확장 포인트 조회 표면
//!
//! 레지스트리 위의 읽기 전용 질의 계층입니다. 호스트 UI는 이
//! 디스패처를 통해 이름 있는 확장 포인트에 바인딩된 기능 목록을
//! 얻어 렌더링합니다. 레지스트리 상태를 절대 변경하지 않습니다.

use serde_json::Value;
use std::sync::Arc;

use super::registry::{LoadedPlugin, PluginRegistry};

// ============================================================================
// CapabilityBinding - 디스패치 결과
// ============================================================================

/// 확장 포인트 하나에 대한 기능 바인딩
///
/// 호출자가 넘긴 컨텍스트와 해당 플러그인이 그 포인트에 등록한
/// 기능 디스크립터를 묶습니다.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityBinding {
    /// 기여한 플러그인 ID
    pub plugin_id: String,

    /// 호출자가 제공한 컨텍스트
    pub context: Value,

    /// 플러그인이 등록한 기능 디스크립터
    pub capability: Value,
}

/// 플러그인 필터 술어
pub type PluginFilter = dyn Fn(&LoadedPlugin) -> bool + Send + Sync;

// ============================================================================
// ExtensionPointDispatcher
// ============================================================================

/// 확장 포인트 디스패처
pub struct ExtensionPointDispatcher {
    registry: Arc<PluginRegistry>,
}

impl ExtensionPointDispatcher {
    /// 새 디스패처 생성
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self { registry }
    }

    /// 확장 포인트에 바인딩된 기능 목록 해석
    ///
    /// 순서는 인덱스 순서와 동일합니다: 우선순위 내림차순, 동순위는
    /// 등록 순서. 인덱스가 변하지 않는 한 반복 호출에도 같은 순서가
    /// 보장됩니다.
    pub async fn resolve(
        &self,
        name: &str,
        context: &Value,
        filter: Option<&PluginFilter>,
    ) -> Vec<CapabilityBinding> {
        self.registry
            .list_for_extension_point(name)
            .await
            .into_iter()
            .filter(|plugin| filter.map_or(true, |predicate| predicate(plugin)))
            .filter_map(|plugin| {
                let capability = plugin.capabilities.get(name)?.clone();
                Some(CapabilityBinding {
                    plugin_id: plugin.metadata.id,
                    context: context.clone(),
                    capability,
                })
            })
            .collect()
    }
}
