//! Plugin Registry - 플러그인 상태의 단일 소유자
//!
//! 프로세스 전역에서 플러그인 ID -> 런타임 레코드 맵과 확장 포인트
//! 인덱스, 라이프사이클 이벤트 버스를 소유합니다. 플러그인 상태와
//! 인덱스의 모든 변경은 이 타입을 통해서만 일어납니다.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::code_loader::{CodeLoader, ModuleHandle};
use super::events::{EventBus, EventKind, PluginEvent, SubscriptionId};
use super::metadata::PluginMetadata;
use atrium_foundation::Result;
use std::sync::Arc;

// ============================================================================
// PluginStatus / LoadedPlugin - 런타임 레코드
// ============================================================================

/// 플러그인 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    /// 로드 진행 중
    Loading,

    /// 로드 완료
    Loaded,

    /// 로드 실패
    Failed,
}

impl std::fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::Loaded => write!(f, "loaded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// 플러그인 런타임 레코드
///
/// ID당 최대 하나만 존재하며 레지스트리가 단독으로 소유합니다.
/// 외부로는 복제된 스냅샷으로만 나갑니다.
#[derive(Debug, Clone)]
pub struct LoadedPlugin {
    /// 불변 메타데이터
    pub metadata: PluginMetadata,

    /// 인스턴스화된 모듈 핸들 (로드 실패 시 None)
    pub module: Option<ModuleHandle>,

    /// 확장 포인트 이름 -> 기능 디스크립터
    pub capabilities: HashMap<String, serde_json::Value>,

    /// 현재 상태
    pub status: PluginStatus,

    /// 실패 시에만 존재하는 에러 메시지
    pub error: Option<String>,

    /// 로드 순서 (등록 순회용)
    pub load_order: usize,

    /// 레코드 생성 시간
    pub registered_at: DateTime<Utc>,
}

/// 확장 포인트 인덱스 엔트리
///
/// 레코드 수명을 소유하지 않는 역참조입니다. 우선순위는 삽입 위치
/// 결정을 위해 함께 보관합니다.
#[derive(Debug, Clone)]
struct IndexEntry {
    id: String,
    priority: i32,
}

// ============================================================================
// PluginRegistry
// ============================================================================

/// 플러그인 레지스트리 - 모든 플러그인 상태 관리
pub struct PluginRegistry {
    /// 플러그인 저장소 (ID -> 레코드)
    plugins: RwLock<HashMap<String, LoadedPlugin>>,

    /// 확장 포인트 인덱스 (이름 -> 우선순위 내림차순 엔트리 목록)
    index: RwLock<HashMap<String, Vec<IndexEntry>>>,

    /// 로드 카운터
    load_counter: AtomicUsize,

    /// 코드 로더
    code_loader: CodeLoader,

    /// 라이프사이클 이벤트 버스
    event_bus: Arc<EventBus>,
}

impl PluginRegistry {
    /// 새 레지스트리 생성
    pub fn new(code_loader: CodeLoader) -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            index: RwLock::new(HashMap::new()),
            load_counter: AtomicUsize::new(0),
            code_loader,
            event_bus: Arc::new(EventBus::new()),
        }
    }

    // ========================================================================
    // 로드 / 언로드
    // ========================================================================

    /// 플러그인 로드 요청
    ///
    /// 같은 ID의 레코드가 이미 있으면 (상태와 무관하게) 그 스냅샷을
    /// 그대로 반환합니다. 네트워크나 스크립트 작업이 다시 일어나지
    /// 않습니다.
    ///
    /// 중복 검사와 `Loading` 레코드 생성은 하나의 쓰기 락 구간 안에서
    /// 일어나고 그 사이에 suspension이 없으므로, 같은 ID에 대한 동시
    /// 호출도 코드 로더를 한 번만 호출합니다.
    ///
    /// 로드 실패는 에러로 전파되지 않고 `Failed` 레코드로 기록됩니다.
    pub async fn request_load(&self, metadata: PluginMetadata) -> LoadedPlugin {
        let id = metadata.id.clone();
        let bundle_location = metadata.bundle_location.clone();

        {
            let mut plugins = self.plugins.write().await;
            if let Some(existing) = plugins.get(&id) {
                debug!("Plugin {} already tracked ({}), skipping load", id, existing.status);
                return existing.clone();
            }

            // 중복 검사부터 레코드 삽입까지 suspension 없이 끝낸다
            let load_order = self.load_counter.fetch_add(1, Ordering::Relaxed) + 1;

            plugins.insert(
                id.clone(),
                LoadedPlugin {
                    metadata,
                    module: None,
                    capabilities: HashMap::new(),
                    status: PluginStatus::Loading,
                    error: None,
                    load_order,
                    registered_at: Utc::now(),
                },
            );
        }

        info!("Loading plugin {} from {}", id, bundle_location);

        match self.code_loader.load(&bundle_location, &id).await {
            Ok(handle) => self.complete_load(&id, handle).await,
            Err(e) => self.fail_load(&id, &e.to_string()).await,
        }
    }

    /// 성공한 로드의 결과를 레코드와 인덱스에 반영
    async fn complete_load(&self, id: &str, handle: ModuleHandle) -> LoadedPlugin {
        let snapshot = {
            let mut plugins = self.plugins.write().await;
            let Some(record) = plugins.get_mut(id) else {
                // 로드 도중 unload된 경우. 레코드를 되살리지 않는다.
                warn!("Plugin {} was unloaded while its bundle was loading", id);
                return LoadedPlugin {
                    metadata: PluginMetadata::new(id, ""),
                    capabilities: handle.capabilities().clone(),
                    module: Some(handle),
                    status: PluginStatus::Loaded,
                    error: None,
                    load_order: 0,
                    registered_at: Utc::now(),
                };
            };

            record.capabilities = handle.capabilities().clone();
            record.module = Some(handle);
            record.status = PluginStatus::Loaded;
            record.error = None;

            let mut index = self.index.write().await;
            for point in &record.metadata.declared_extension_points {
                if !record.capabilities.contains_key(point) {
                    debug!(
                        "Plugin {} declares extension point {} but registered no capability for it",
                        id, point
                    );
                    continue;
                }
                insert_ranked(
                    index.entry(point.clone()).or_default(),
                    id,
                    record.metadata.priority,
                );
            }

            record.clone()
        };

        info!("Plugin {} loaded (v{})", id, snapshot.metadata.version);
        self.event_bus
            .emit(PluginEvent::new(
                EventKind::Loaded,
                id,
                json!({ "pluginId": id }),
            ))
            .await;

        snapshot
    }

    /// 실패한 로드를 레코드에 기록
    async fn fail_load(&self, id: &str, message: &str) -> LoadedPlugin {
        let snapshot = {
            let mut plugins = self.plugins.write().await;
            let Some(record) = plugins.get_mut(id) else {
                warn!("Plugin {} was unloaded while its bundle was loading", id);
                return LoadedPlugin {
                    metadata: PluginMetadata::new(id, ""),
                    module: None,
                    capabilities: HashMap::new(),
                    status: PluginStatus::Failed,
                    error: Some(message.to_string()),
                    load_order: 0,
                    registered_at: Utc::now(),
                };
            };

            record.status = PluginStatus::Failed;
            record.error = Some(message.to_string());
            record.clone()
        };

        warn!("Plugin {} failed to load: {}", id, message);
        self.event_bus
            .emit(PluginEvent::new(
                EventKind::Error,
                id,
                json!({ "pluginId": id, "error": message }),
            ))
            .await;

        snapshot
    }

    /// 플러그인 언로드
    ///
    /// 레코드와 모든 확장 포인트 인덱스 엔트리를 제거합니다.
    /// 실행 중인 모듈 코드를 비활성화하지는 않습니다. 참조가 끊기면
    /// 비활성으로 취급합니다.
    pub async fn unload(&self, id: &str) -> bool {
        let removed = {
            let mut plugins = self.plugins.write().await;
            let Some(record) = plugins.remove(id) else {
                return false;
            };

            let mut index = self.index.write().await;
            for point in &record.metadata.declared_extension_points {
                if let Some(entries) = index.get_mut(point) {
                    entries.retain(|entry| entry.id != id);
                    if entries.is_empty() {
                        index.remove(point);
                    }
                }
            }

            record
        };

        info!("Unloaded plugin: {}", removed.metadata.id);
        self.event_bus
            .emit(PluginEvent::new(
                EventKind::Unloaded,
                id,
                json!({ "pluginId": id }),
            ))
            .await;

        true
    }

    // ========================================================================
    // 조회
    // ========================================================================

    /// 플러그인 조회
    pub async fn get(&self, id: &str) -> Option<LoadedPlugin> {
        let plugins = self.plugins.read().await;
        plugins.get(id).cloned()
    }

    /// 모든 플러그인 스냅샷 (등록 순서대로)
    pub async fn get_all(&self) -> Vec<LoadedPlugin> {
        let plugins = self.plugins.read().await;
        let mut all: Vec<_> = plugins.values().cloned().collect();
        all.sort_by_key(|record| record.load_order);
        all
    }

    /// 특정 확장 포인트에 기여하는 플러그인 목록
    ///
    /// 우선순위 내림차순, 동순위는 등록 순서를 유지합니다.
    /// `Loaded` 상태의 플러그인만 포함됩니다.
    pub async fn list_for_extension_point(&self, name: &str) -> Vec<LoadedPlugin> {
        let index = self.index.read().await;
        let Some(entries) = index.get(name) else {
            return Vec::new();
        };

        let plugins = self.plugins.read().await;
        entries
            .iter()
            .filter_map(|entry| plugins.get(&entry.id))
            .filter(|record| record.status == PluginStatus::Loaded)
            .cloned()
            .collect()
    }

    /// 플러그인 존재 여부 확인
    pub async fn contains(&self, id: &str) -> bool {
        let plugins = self.plugins.read().await;
        plugins.contains_key(id)
    }

    /// 플러그인 수
    pub async fn len(&self) -> usize {
        let plugins = self.plugins.read().await;
        plugins.len()
    }

    /// 비어있는지 확인
    pub async fn is_empty(&self) -> bool {
        let plugins = self.plugins.read().await;
        plugins.is_empty()
    }

    // ========================================================================
    // 이벤트
    // ========================================================================

    /// 이벤트 버스 접근
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.event_bus
    }

    /// 라이프사이클 이벤트 구독
    pub async fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&PluginEvent) -> Result<()> + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.event_bus.on(kind, callback).await
    }

    /// 라이프사이클 이벤트 구독 해제
    pub async fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        self.event_bus.off(kind, id).await
    }

    // ========================================================================
    // 전체 리셋
    // ========================================================================

    /// 모든 레코드, 인덱스, 이벤트 구독과 히스토리 제거
    ///
    /// 테스트 teardown이나 강제 새로고침 같은 전체 리셋에만 사용합니다.
    pub async fn clear(&self) {
        {
            let mut plugins = self.plugins.write().await;
            let mut index = self.index.write().await;
            plugins.clear();
            index.clear();
        }
        self.load_counter.store(0, Ordering::Relaxed);
        self.event_bus.clear_subscribers().await;
        self.event_bus.clear_history().await;
    }
}

/// 우선순위 내림차순 목록에 엔트리 삽입
///
/// 전체 재정렬 대신 한 번의 위치 탐색으로 올바른 순위에 끼워 넣습니다.
/// 같은 우선순위끼리는 먼저 들어온 엔트리가 앞에 남습니다.
fn insert_ranked(entries: &mut Vec<IndexEntry>, id: &str, priority: i32) {
    if entries.iter().any(|entry| entry.id == id) {
        return;
    }

    let entry = IndexEntry {
        id: id.to_string(),
        priority,
    };
    match entries.iter().position(|existing| existing.priority < priority) {
        Some(position) => entries.insert(position, entry),
        None => entries.push(entry),
    }
}
