//! Error types for Atrium
//!
//! 모든 에러를 중앙에서 관리

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Atrium 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    // ========================================================================
    // 카탈로그 관련
    // ========================================================================
    #[error("Catalog error: {0}")]
    Catalog(String),

    // ========================================================================
    // 플러그인 로드 관련
    // ========================================================================
    #[error("Plugin load error: {0}")]
    Load(String),

    // ========================================================================
    // 이벤트 관련
    // ========================================================================
    #[error("Event listener error: {0}")]
    EventListener(String),

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 재시도 가능한 에러인지 확인
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Catalog(_))
    }

    /// 플러그인 단위로 격리되는 에러인지 확인
    ///
    /// Load 에러는 해당 플러그인의 레코드에 기록될 뿐,
    /// 배치나 형제 플러그인 로드를 중단시키지 않습니다.
    pub fn is_isolated(&self) -> bool {
        matches!(self, Error::Load(_) | Error::EventListener(_))
    }

    /// 플러그인 로드 에러 생성 헬퍼
    pub fn load(message: impl Into<String>) -> Self {
        Error::Load(message.into())
    }

    /// 카탈로그 에러 생성 헬퍼
    pub fn catalog(message: impl Into<String>) -> Self {
        Error::Catalog(message.into())
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
