//! Plugin Events - 라이프사이클 이벤트 시스템
//!
//! 레지스트리가 발행하는 세 가지 라이프사이클 이벤트와
//! 구독/발행 버스를 정의합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error};

use atrium_foundation::{Error, Result};

// ============================================================================
// EventKind - 이벤트 종류
// ============================================================================

/// 플러그인 라이프사이클 이벤트 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// 플러그인 로드 성공
    Loaded,

    /// 플러그인 로드 실패
    Error,

    /// 플러그인 언로드
    Unloaded,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loaded => write!(f, "plugin:loaded"),
            Self::Error => write!(f, "plugin:error"),
            Self::Unloaded => write!(f, "plugin:unloaded"),
        }
    }
}

// ============================================================================
// PluginEvent - 이벤트 페이로드
// ============================================================================

/// 플러그인 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginEvent {
    /// 이벤트 종류
    pub kind: EventKind,

    /// 대상 플러그인 ID
    pub plugin_id: String,

    /// 이벤트 데이터
    pub data: Value,

    /// 타임스탬프
    pub timestamp: DateTime<Utc>,
}

impl PluginEvent {
    /// 새 이벤트 생성
    pub fn new(kind: EventKind, plugin_id: impl Into<String>, data: Value) -> Self {
        Self {
            kind,
            plugin_id: plugin_id.into(),
            data,
            timestamp: Utc::now(),
        }
    }

    /// 데이터 없는 이벤트 생성
    pub fn simple(kind: EventKind, plugin_id: impl Into<String>) -> Self {
        Self::new(kind, plugin_id, Value::Null)
    }
}

// ============================================================================
// EventBus - 이벤트 버스 (발행/구독)
// ============================================================================

/// 구독 핸들 - `off`로 구독을 해제할 때 사용
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// 구독자 콜백
///
/// 실패를 반환할 수 있으며, 실패는 로그로 남고 다른 구독자나
/// 이벤트를 발행한 작업에는 영향을 주지 않습니다.
pub type Subscriber = Arc<dyn Fn(&PluginEvent) -> Result<()> + Send + Sync>;

/// 이벤트 버스 - 이벤트 발행 및 구독 관리
pub struct EventBus {
    /// 종류별 구독자 목록 (등록 순서 유지)
    subscribers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, Subscriber)>>>,

    /// 구독 ID 카운터
    next_id: AtomicU64,

    /// 브로드캐스트 채널 발신자 (스트림 구독용)
    sender: broadcast::Sender<PluginEvent>,

    /// 이벤트 히스토리 (최근 N개)
    history: RwLock<Vec<PluginEvent>>,

    /// 히스토리 최대 크기
    history_size: usize,
}

impl EventBus {
    /// 새 이벤트 버스 생성
    pub fn new() -> Self {
        Self::with_capacity(256, 100)
    }

    /// 용량 지정하여 생성
    pub fn with_capacity(channel_capacity: usize, history_size: usize) -> Self {
        let (sender, _) = broadcast::channel(channel_capacity);
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            sender,
            history: RwLock::new(Vec::with_capacity(history_size)),
            history_size,
        }
    }

    // ========================================================================
    // 구독 관리
    // ========================================================================

    /// 구독 등록
    pub async fn on(
        &self,
        kind: EventKind,
        callback: impl Fn(&PluginEvent) -> Result<()> + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut subscribers = self.subscribers.write().await;
        subscribers
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// 구독 해제
    ///
    /// 해당 구독이 없으면 false를 반환합니다.
    pub async fn off(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write().await;
        if let Some(list) = subscribers.get_mut(&kind) {
            let before = list.len();
            list.retain(|(sub_id, _)| *sub_id != id);
            return list.len() < before;
        }
        false
    }

    /// 모든 구독 해제 (전체 리셋 시에만 사용)
    pub async fn clear_subscribers(&self) {
        let mut subscribers = self.subscribers.write().await;
        subscribers.clear();
    }

    /// 특정 종류의 구독자 수
    pub async fn subscriber_count(&self, kind: EventKind) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.get(&kind).map_or(0, Vec::len)
    }

    // ========================================================================
    // 발행
    // ========================================================================

    /// 이벤트 발행
    ///
    /// 현재 등록된 구독자 전원에게 등록 순서대로 인라인 디스패치합니다.
    /// 구독자 하나가 실패해도 나머지 구독자는 계속 호출됩니다.
    pub async fn emit(&self, event: PluginEvent) {
        debug!("Publishing event: {} ({})", event.kind, event.plugin_id);

        // 히스토리에 추가
        {
            let mut history = self.history.write().await;
            if history.len() >= self.history_size {
                history.remove(0);
            }
            history.push(event.clone());
        }

        // 브로드캐스트 (구독자가 없어도 OK)
        let _ = self.sender.send(event.clone());

        // 콜백 목록은 락을 놓은 뒤 호출한다.
        // 콜백 안에서 다시 버스를 호출해도 교착되지 않는다.
        let callbacks: Vec<(SubscriptionId, Subscriber)> = {
            let subscribers = self.subscribers.read().await;
            subscribers.get(&event.kind).cloned().unwrap_or_default()
        };

        for (id, callback) in callbacks {
            if let Err(e) = callback(&event) {
                let listener_error = Error::EventListener(format!(
                    "subscriber {:?} failed on {}: {}",
                    id, event.kind, e
                ));
                error!("{}", listener_error);
            }
        }
    }

    /// 이벤트 스트림 구독
    pub fn subscribe(&self) -> broadcast::Receiver<PluginEvent> {
        self.sender.subscribe()
    }

    // ========================================================================
    // 히스토리
    // ========================================================================

    /// 이벤트 히스토리 조회
    pub async fn history(&self) -> Vec<PluginEvent> {
        let history = self.history.read().await;
        history.clone()
    }

    /// 특정 종류의 이벤트 히스토리 조회
    pub async fn history_by_kind(&self, kind: EventKind) -> Vec<PluginEvent> {
        let history = self.history.read().await;
        history.iter().filter(|e| e.kind == kind).cloned().collect()
    }

    /// 히스토리 비우기 (전체 리셋 시에만 사용)
    pub async fn clear_history(&self) {
        let mut history = self.history.write().await;
        history.clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
