//! Plugin Catalog - 카탈로그 서비스 클라이언트
//!
//! 플러그인 메타데이터를 공급하는 외부 카탈로그 서비스와의 경계입니다.
//! 런타임은 이 세 가지 조회만 사용합니다:
//!
//! - `GET available-plugins`
//! - `GET installed-plugins [?organizationId]`
//! - `GET plugin/{id}`
//!
//! 응답은 [`RawPluginMetadata`]로 역직렬화한 뒤 순수 매핑으로
//! [`PluginMetadata`]로 정규화합니다.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use super::metadata::{PluginMetadata, RawPluginMetadata};
use atrium_foundation::{Error, Result, RuntimeConfig};

// ============================================================================
// CatalogService - 카탈로그 경계 트레이트
// ============================================================================

/// 카탈로그 서비스 인터페이스
///
/// HTTP 구현이 기본이지만, 테스트와 다른 배포 형태를 위해 트레이트로
/// 분리되어 있습니다.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// 사용 가능한 전체 플러그인 목록
    async fn available_plugins(&self) -> Result<Vec<PluginMetadata>>;

    /// 설치된 플러그인 목록 (조직 단위 필터 선택적)
    async fn installed_plugins(&self, organization_id: Option<&str>)
        -> Result<Vec<PluginMetadata>>;

    /// 단일 플러그인 조회 - 카탈로그가 모르는 ID면 None
    async fn plugin(&self, id: &str) -> Result<Option<PluginMetadata>>;
}

// ============================================================================
// HttpCatalog - reqwest 기반 구현
// ============================================================================

/// HTTP 카탈로그 클라이언트
pub struct HttpCatalog {
    /// HTTP 클라이언트
    client: Client,

    /// 카탈로그 기본 URL (끝 슬래시 없음)
    base_url: String,
}

impl HttpCatalog {
    /// 설정으로부터 클라이언트 생성
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.catalog_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// 목록 엔드포인트 호출 공통부
    async fn fetch_list(&self, url: &str, query: &[(&str, &str)]) -> Result<Vec<PluginMetadata>> {
        debug!("Fetching plugin list from {}", url);

        let response = self
            .client
            .get(url)
            .query(query)
            .header("User-Agent", "Atrium")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::catalog(format!(
                "failed to fetch plugin list: HTTP {}",
                response.status()
            )));
        }

        let raw: Vec<RawPluginMetadata> = response
            .json()
            .await
            .map_err(|e| Error::catalog(e.to_string()))?;

        Ok(raw.into_iter().map(PluginMetadata::from).collect())
    }
}

#[async_trait]
impl CatalogService for HttpCatalog {
    async fn available_plugins(&self) -> Result<Vec<PluginMetadata>> {
        self.fetch_list(&self.endpoint("available-plugins"), &[]).await
    }

    async fn installed_plugins(
        &self,
        organization_id: Option<&str>,
    ) -> Result<Vec<PluginMetadata>> {
        let url = self.endpoint("installed-plugins");
        match organization_id {
            Some(org) => self.fetch_list(&url, &[("organizationId", org)]).await,
            None => self.fetch_list(&url, &[]).await,
        }
    }

    async fn plugin(&self, id: &str) -> Result<Option<PluginMetadata>> {
        let url = self.endpoint(&format!("plugin/{id}"));
        debug!("Fetching plugin metadata from {}", url);

        let response = self
            .client
            .get(&url)
            .header("User-Agent", "Atrium")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(Error::catalog(format!(
                "failed to fetch plugin {id}: HTTP {}",
                response.status()
            )));
        }

        let raw: RawPluginMetadata = response
            .json()
            .await
            .map_err(|e| Error::catalog(e.to_string()))?;

        Ok(Some(raw.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_building() {
        let config = RuntimeConfig {
            catalog_base_url: "https://portal.example.com/api/plugins/".to_string(),
            ..RuntimeConfig::default()
        };
        let catalog = HttpCatalog::new(&config).unwrap();

        assert_eq!(
            catalog.endpoint("available-plugins"),
            "https://portal.example.com/api/plugins/available-plugins"
        );
        assert_eq!(
            catalog.endpoint("plugin/p1"),
            "https://portal.example.com/api/plugins/plugin/p1"
        );
    }
}
