//! 에러 타입 — 워크스페이스 공통 에러 정의

/// groupscan 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum GroupScanError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 그룹 스캔 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// TOML 문법 오류 또는 스키마 불일치
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 필드 값이 유효 범위를 벗어남
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 그룹 스캔 전체를 중단시키는 에러
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 필수 식별자 누락
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// 프로젝트 이름 필터 정규식 컴파일 실패
    #[error("invalid name filter: {0}")]
    Pattern(String),

    /// 그룹 프로젝트 목록 조회 실패
    #[error("project listing failed: {0}")]
    RemoteList(String),

    /// 기타 스캔 실패
    #[error("scan failed: {0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: GroupScanError = ConfigError::FileNotFound {
            path: "groupscan.toml".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            GroupScanError::Config(ConfigError::FileNotFound { .. })
        ));
        assert!(err.to_string().contains("groupscan.toml"));
    }

    #[test]
    fn scan_error_display_includes_reason() {
        let err: GroupScanError = ScanError::RemoteList("502 Bad Gateway".to_owned()).into();
        let msg = err.to_string();
        assert!(msg.contains("project listing failed"));
        assert!(msg.contains("502"));
    }

    #[test]
    fn invalid_value_display_names_field() {
        let err = ConfigError::InvalidValue {
            field: "scan.per_page".to_owned(),
            reason: "must be 1-100".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value for 'scan.per_page': must be 1-100"
        );
    }
}
