//! Plugin Metadata - 플러그인 메타데이터 정의
//!
//! 카탈로그 서비스가 내려주는 원본 객체(RawPluginMetadata)와
//! 런타임이 사용하는 정규화된 디스크립터(PluginMetadata)를 정의합니다.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// PluginMetadata - 정규화된 디스크립터
// ============================================================================

/// 플러그인 디스크립터 - 카탈로그에서 가져온 불변 메타데이터
///
/// 런타임은 이 값을 절대 변경하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMetadata {
    /// 고유 플러그인 ID (예: "atrium.audit-log")
    pub id: String,

    /// 표시 이름
    pub name: String,

    /// 버전
    pub version: String,

    /// 설명
    pub description: String,

    /// 카테고리
    pub category: String,

    /// 번들 위치 (URL 형태 문자열)
    pub bundle_location: String,

    /// 필요한 권한 목록
    pub required_permissions: HashSet<String>,

    /// 선언된 확장 포인트 (순서 유지)
    pub declared_extension_points: Vec<String>,

    /// 우선순위 (높을수록 먼저 디스패치)
    pub priority: i32,
}

impl PluginMetadata {
    /// 새 디스크립터 생성
    pub fn new(id: impl Into<String>, bundle_location: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: String::new(),
            description: String::new(),
            category: String::new(),
            bundle_location: bundle_location.into(),
            required_permissions: HashSet::new(),
            declared_extension_points: Vec::new(),
            priority: 0,
        }
    }

    /// 표시 이름 설정
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// 버전 설정
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 확장 포인트 추가
    pub fn with_extension_point(mut self, name: impl Into<String>) -> Self {
        self.declared_extension_points.push(name.into());
        self
    }

    /// 우선순위 설정
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// 권한 추가
    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.required_permissions.insert(permission.into());
        self
    }
}

// ============================================================================
// RawPluginMetadata - 카탈로그 와이어 포맷
// ============================================================================

/// 카탈로그 서비스의 원본 메타데이터 객체
///
/// 필드 대부분이 선택적이며, [`PluginMetadata`]로 변환하면서
/// 폴백과 기본값이 적용됩니다.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPluginMetadata {
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    /// 표시 이름 (name이 없을 때 폴백)
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub category: Option<String>,

    #[serde(default)]
    pub bundle_location: Option<String>,

    /// 범용 URL 필드 (bundleLocation이 없을 때 폴백)
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub required_permissions: Vec<String>,

    #[serde(default)]
    pub extension_points: Vec<String>,

    #[serde(default)]
    pub priority: i32,
}

impl From<RawPluginMetadata> for PluginMetadata {
    fn from(raw: RawPluginMetadata) -> Self {
        let name = raw
            .name
            .or(raw.display_name)
            .unwrap_or_else(|| raw.id.clone());
        let bundle_location = raw.bundle_location.or(raw.url).unwrap_or_default();

        Self {
            id: raw.id,
            name,
            version: raw.version.unwrap_or_default(),
            description: raw.description.unwrap_or_default(),
            category: raw.category.unwrap_or_default(),
            bundle_location,
            required_permissions: raw.required_permissions.into_iter().collect(),
            declared_extension_points: raw.extension_points,
            priority: raw.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_helpers() {
        let metadata = PluginMetadata::new("p1", "https://cdn.example.com/p1.js")
            .with_name("Plugin One")
            .with_version("1.2.0")
            .with_permission("audit.read")
            .with_extension_point("admin.page")
            .with_priority(7);

        assert_eq!(metadata.name, "Plugin One");
        assert_eq!(metadata.version, "1.2.0");
        assert!(metadata.required_permissions.contains("audit.read"));
        assert_eq!(metadata.declared_extension_points, vec!["admin.page"]);
        assert_eq!(metadata.priority, 7);
    }

    #[test]
    fn test_normalize_full() {
        let raw: RawPluginMetadata = serde_json::from_str(
            r#"{
                "id": "atrium.audit-log",
                "name": "Audit Log",
                "version": "2.1.0",
                "description": "Audit trail viewer",
                "category": "observability",
                "bundleLocation": "https://cdn.example.com/audit-log.js",
                "requiredPermissions": ["audit.read"],
                "extensionPoints": ["admin.page", "dashboard.widget"],
                "priority": 10
            }"#,
        )
        .unwrap();

        let metadata = PluginMetadata::from(raw);
        assert_eq!(metadata.name, "Audit Log");
        assert_eq!(metadata.priority, 10);
        assert!(metadata.required_permissions.contains("audit.read"));
        assert_eq!(
            metadata.declared_extension_points,
            vec!["admin.page", "dashboard.widget"]
        );
    }

    #[test]
    fn test_normalize_display_name_fallback() {
        let raw: RawPluginMetadata = serde_json::from_str(
            r#"{"id": "p1", "displayName": "Plugin One", "url": "https://cdn.example.com/p1.js"}"#,
        )
        .unwrap();

        let metadata = PluginMetadata::from(raw);
        assert_eq!(metadata.name, "Plugin One");
        assert_eq!(metadata.bundle_location, "https://cdn.example.com/p1.js");
    }

    #[test]
    fn test_normalize_defaults() {
        let raw: RawPluginMetadata = serde_json::from_str(r#"{"id": "p1"}"#).unwrap();

        let metadata = PluginMetadata::from(raw);
        assert_eq!(metadata.name, "p1");
        assert_eq!(metadata.version, "");
        assert_eq!(metadata.priority, 0);
        assert!(metadata.required_permissions.is_empty());
        assert!(metadata.declared_extension_points.is_empty());
    }
}
