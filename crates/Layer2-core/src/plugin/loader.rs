//! Plugin Loader - 카탈로그 스윕 오케스트레이션
//!
//! 카탈로그에서 메타데이터 목록을 가져와 고정 크기 배치로 나누어
//! 레지스트리에 로드를 요청합니다. 배치 하나가 모두 정착(성공 또는
//! 실패)한 뒤에야 다음 배치를 시작하고, 배치 사이에 짧은 대기를
//! 둡니다. 동시에 날아가는 주입/컨테이너 조회 수를 제한하면서도
//! 전체가 아닌 배치 단위로 점진적인 진행을 보여주기 위함입니다.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::catalog::CatalogService;
use super::metadata::PluginMetadata;
use super::registry::{LoadedPlugin, PluginRegistry, PluginStatus};
use atrium_foundation::{Error, Result, RuntimeConfig};

// ============================================================================
// LoadReport - 스윕 결과 요약
// ============================================================================

/// 카탈로그 스윕 하나의 결과 요약
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// 카탈로그가 반환한 메타데이터 수
    pub requested: usize,

    /// 이번 스윕에서 Loaded에 도달한 수
    pub loaded: usize,

    /// Failed로 기록된 수
    pub failed: usize,

    /// 이미 로드되어 건너뛴 수
    pub skipped: usize,
}

/// 스윕이 조회하는 카탈로그 목록
#[derive(Debug, Clone, Copy)]
enum SweepSource {
    Available,
    Installed,
}

// ============================================================================
// PluginLoader
// ============================================================================

/// 플러그인 로더 - 배치 로드 오케스트레이터
pub struct PluginLoader {
    /// 플러그인 레지스트리
    registry: Arc<PluginRegistry>,

    /// 카탈로그 서비스
    catalog: Arc<dyn CatalogService>,

    /// 이 프로세스에서 Loaded에 도달한 ID들
    ///
    /// 레지스트리의 멱등성 위에 얹힌 빠른 멤버십 검사일 뿐입니다.
    loaded_ids: RwLock<HashSet<String>>,

    /// 스윕 단일 비행 가드
    sweep_in_flight: AtomicBool,

    /// installed-plugins 조회에 쓰는 조직 ID
    organization_id: Option<String>,

    /// 배치 크기
    batch_size: usize,

    /// 배치 사이 대기 시간
    batch_delay: Duration,
}

impl PluginLoader {
    /// 새 로더 생성
    pub fn new(
        registry: Arc<PluginRegistry>,
        catalog: Arc<dyn CatalogService>,
        config: &RuntimeConfig,
    ) -> Self {
        Self {
            registry,
            catalog,
            loaded_ids: RwLock::new(HashSet::new()),
            sweep_in_flight: AtomicBool::new(false),
            organization_id: config.organization_id.clone(),
            batch_size: config.batch_size.max(1),
            batch_delay: config.batch_delay(),
        }
    }

    // ========================================================================
    // 스윕 진입점
    // ========================================================================

    /// 사용 가능한 플러그인 전체 로드
    pub async fn load_available(&self) -> Result<LoadReport> {
        self.sweep(SweepSource::Available).await
    }

    /// 설치된 플러그인 전체 로드
    pub async fn load_installed(&self) -> Result<LoadReport> {
        self.sweep(SweepSource::Installed).await
    }

    /// 단일 플러그인 로드
    ///
    /// # Errors
    ///
    /// 카탈로그가 해당 ID를 모르면 `NotFound`를 반환합니다.
    /// 카탈로그 조회 실패는 호출자에게 그대로 전파됩니다.
    pub async fn load_one(&self, id: &str) -> Result<LoadedPlugin> {
        let metadata = self
            .catalog
            .plugin(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("plugin {id} not found in catalog")))?;

        let record = self.registry.request_load(metadata).await;
        if record.status == PluginStatus::Loaded {
            self.loaded_ids.write().await.insert(record.metadata.id.clone());
        }
        Ok(record)
    }

    // ========================================================================
    // 스윕 구현
    // ========================================================================

    /// 단일 비행 가드 아래에서 스윕 실행
    ///
    /// 스윕이 이미 진행 중이면 로그만 남기고 즉시 반환합니다.
    /// 큐잉이나 재시도는 하지 않습니다.
    async fn sweep(&self, source: SweepSource) -> Result<LoadReport> {
        if self
            .sweep_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Plugin sweep already in flight, ignoring {:?} request", source);
            return Ok(LoadReport::default());
        }

        let result = self.sweep_inner(source).await;
        self.sweep_in_flight.store(false, Ordering::Release);
        result
    }

    async fn sweep_inner(&self, source: SweepSource) -> Result<LoadReport> {
        let list = match source {
            SweepSource::Available => self.catalog.available_plugins().await?,
            SweepSource::Installed => {
                self.catalog
                    .installed_plugins(self.organization_id.as_deref())
                    .await?
            }
        };

        info!("Catalog returned {} plugins for {:?} sweep", list.len(), source);
        let report = self.run_batches(list).await;
        info!(
            "Sweep finished: {} loaded, {} failed, {} skipped",
            report.loaded, report.failed, report.skipped
        );
        Ok(report)
    }

    /// 메타데이터 목록을 고정 크기 배치로 로드
    ///
    /// 배치 멤버 하나의 실패가 형제를 중단시키지 않습니다.
    /// 다음 배치는 이전 배치가 전부 정착한 뒤에만 시작합니다.
    async fn run_batches(&self, list: Vec<PluginMetadata>) -> LoadReport {
        let mut report = LoadReport {
            requested: list.len(),
            ..LoadReport::default()
        };

        for (batch_number, chunk) in list.chunks(self.batch_size).enumerate() {
            if batch_number > 0 {
                tokio::time::sleep(self.batch_delay).await;
            }

            let pending: Vec<PluginMetadata> = {
                let loaded_ids = self.loaded_ids.read().await;
                chunk
                    .iter()
                    .filter(|metadata| !loaded_ids.contains(&metadata.id))
                    .cloned()
                    .collect()
            };
            report.skipped += chunk.len() - pending.len();

            debug!(
                "Dispatching batch {} with {} plugins",
                batch_number + 1,
                pending.len()
            );

            let results = join_all(
                pending
                    .into_iter()
                    .map(|metadata| self.registry.request_load(metadata)),
            )
            .await;

            let mut loaded_ids = self.loaded_ids.write().await;
            for record in results {
                match record.status {
                    PluginStatus::Loaded => {
                        loaded_ids.insert(record.metadata.id.clone());
                        report.loaded += 1;
                    }
                    PluginStatus::Failed => report.failed += 1,
                    // 다른 호출자가 같은 ID의 로드를 이미 끌고 가는 중
                    PluginStatus::Loading => report.skipped += 1,
                }
            }
        }

        report
    }
}
