//! Runtime Config - 플러그인 런타임 설정
//!
//! 카탈로그 주소, 배치 크기 등 런타임 동작 설정을 관리합니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::Result;

/// 설정 파일명
pub const RUNTIME_CONFIG_FILE: &str = "runtime.json";

// ============================================================================
// Runtime Config
// ============================================================================

/// Atrium 런타임 설정
///
/// 모든 필드는 기본값을 가지며, 파일에서 부분적으로만 지정할 수 있습니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    /// 카탈로그 서비스 기본 URL
    #[serde(default = "default_catalog_base_url")]
    pub catalog_base_url: String,

    /// 조직 ID (installed-plugins 조회용)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<String>,

    /// 한 배치에서 동시에 로드하는 플러그인 수
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// 배치 사이 대기 시간 (ms)
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    /// HTTP 요청 타임아웃 (초)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_catalog_base_url() -> String {
    "http://localhost:7007/api/plugins".to_string()
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            catalog_base_url: default_catalog_base_url(),
            organization_id: None,
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RuntimeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// 파일에서 설정 로드
    ///
    /// 파일이 없으면 기본값을 반환합니다.
    pub async fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No runtime config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).await?;
        let config: RuntimeConfig = serde_json::from_str(&content)?;

        debug!("Loaded runtime config from {}", path.display());
        Ok(config)
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    ///
    /// other에서 명시적으로 지정된(기본값과 다른) 필드만 반영합니다.
    /// 부분적으로만 채워진 파일을 코드에서 커스터마이즈한 기본 설정
    /// 위에 겹칠 때 사용합니다.
    pub fn merge(&mut self, other: RuntimeConfig) {
        if other.catalog_base_url != default_catalog_base_url() {
            self.catalog_base_url = other.catalog_base_url;
        }
        if other.organization_id.is_some() {
            self.organization_id = other.organization_id;
        }
        if other.batch_size != default_batch_size() {
            self.batch_size = other.batch_size;
        }
        if other.batch_delay_ms != default_batch_delay_ms() {
            self.batch_delay_ms = other.batch_delay_ms;
        }
        if other.request_timeout_secs != default_request_timeout_secs() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    // ========================================================================
    // 파생 값
    // ========================================================================

    /// 배치 사이 대기 시간
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// HTTP 요청 타임아웃
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.batch_delay(), Duration::from_millis(100));
        assert!(config.organization_id.is_none());
    }

    #[test]
    fn test_partial_json() {
        let config: RuntimeConfig =
            serde_json::from_str(r#"{"catalogBaseUrl": "https://portal.example.com/api/plugins"}"#)
                .unwrap();
        assert_eq!(
            config.catalog_base_url,
            "https://portal.example.com/api/plugins"
        );
        assert_eq!(config.batch_size, 3);
    }

    #[test]
    fn test_merge_partial_file_over_modified_base() {
        let mut base = RuntimeConfig {
            catalog_base_url: "https://portal.example.com/api/plugins".to_string(),
            batch_size: 5,
            ..RuntimeConfig::default()
        };

        let partial: RuntimeConfig =
            serde_json::from_str(r#"{"batchDelayMs": 250, "organizationId": "org-1"}"#).unwrap();
        base.merge(partial);

        // 파일에 지정된 필드는 덮어쓴다
        assert_eq!(base.batch_delay_ms, 250);
        assert_eq!(base.organization_id.as_deref(), Some("org-1"));

        // 파일에 없는 필드는 커스터마이즈된 값을 유지한다
        assert_eq!(base.catalog_base_url, "https://portal.example.com/api/plugins");
        assert_eq!(base.batch_size, 5);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = RuntimeConfig::load_from(dir.path().join(RUNTIME_CONFIG_FILE))
            .await
            .unwrap();
        assert_eq!(config.batch_delay_ms, 100);
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(RUNTIME_CONFIG_FILE);
        std::fs::write(&path, r#"{"batchSize": 5, "organizationId": "org-1"}"#).unwrap();

        let config = RuntimeConfig::load_from(&path).await.unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.organization_id.as_deref(), Some("org-1"));
    }
}
