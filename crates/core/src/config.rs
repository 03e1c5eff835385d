//! 설정 관리 — groupscan.toml 파싱 및 런타임 설정
//!
//! [`GroupScanConfig`]는 모든 섹션을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 바이너리에서 적용)
//! 2. 환경변수 (`GROUPSCAN_SCAN_GROUP_ID=42` 형식, 그리고 관례적인
//!    `GITLAB_TOKEN`, `GITLAB_HOST`, `LOG_LEVEL`)
//! 3. 설정 파일 (`groupscan.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), groupscan_core::error::GroupScanError> {
//! use groupscan_core::config::GroupScanConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = GroupScanConfig::load("groupscan.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = GroupScanConfig::parse("[scan]\ngroup_id = \"platform\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, GroupScanError};

/// 숫자 설정의 상한값
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;
const MAX_PER_PAGE: u32 = 100;
const MAX_CONCURRENCY: usize = 32;
const MAX_ARTIFACT_SIZE: usize = 1024 * 1024 * 1024; // 1 GiB

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// 비밀값 대신 표시되는 문자열
pub const REDACTED: &str = "***REDACTED***";

/// groupscan 통합 설정
///
/// `groupscan.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupScanConfig {
    /// 로깅 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// GitLab 연결 설정
    #[serde(default)]
    pub gitlab: GitLabConfig,
    /// 스캔 파라미터
    #[serde(default)]
    pub scan: ScanConfig,
}

impl GroupScanConfig {
    /// TOML 파일을 로드하고 환경변수 오버라이드 적용 후 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, GroupScanError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// [`load`](Self::load)와 같지만 파일이 없으면 기본값(+ 환경변수)을
    /// 사용합니다. `scan`은 환경변수만으로도 실행할 수 있습니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, GroupScanError> {
        let path = path.as_ref();
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(GroupScanError::Config(ConfigError::FileNotFound { .. })) => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Self::default()
            }
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 환경변수 오버라이드 없이 TOML 파일만 로드합니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, GroupScanError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                GroupScanError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                GroupScanError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, GroupScanError> {
        toml::from_str(toml_str).map_err(|e| {
            GroupScanError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수 오버라이드를 적용합니다.
    ///
    /// 네이밍: `GROUPSCAN_{SECTION}_{FIELD}`. 접두어 없는 `LOG_LEVEL`,
    /// `GITLAB_HOST`, `GITLAB_TOKEN`을 먼저 읽으므로 둘 다 설정되면 접두어
    /// 변수가 우선합니다. 알 수 없는 `LOG_LEVEL` 값은 경고 후 무시합니다.
    pub fn apply_env_overrides(&mut self) {
        // 일반
        override_log_level(&mut self.general.log_level, "LOG_LEVEL");
        override_string(&mut self.general.log_level, "GROUPSCAN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "GROUPSCAN_GENERAL_LOG_FORMAT");

        // GitLab
        override_string(&mut self.gitlab.host, "GITLAB_HOST");
        override_string(&mut self.gitlab.host, "GROUPSCAN_GITLAB_HOST");
        override_string(&mut self.gitlab.token, "GITLAB_TOKEN");
        override_string(&mut self.gitlab.token, "GROUPSCAN_GITLAB_TOKEN");
        override_u64(
            &mut self.gitlab.request_timeout_secs,
            "GROUPSCAN_GITLAB_REQUEST_TIMEOUT_SECS",
        );
        override_string(&mut self.gitlab.user_agent, "GROUPSCAN_GITLAB_USER_AGENT");

        // 스캔
        override_string(&mut self.scan.group_id, "GROUPSCAN_SCAN_GROUP_ID");
        override_string(&mut self.scan.job_name, "GROUPSCAN_SCAN_JOB_NAME");
        override_string(&mut self.scan.artifact_file, "GROUPSCAN_SCAN_ARTIFACT_FILE");
        override_string(&mut self.scan.name_filter, "GROUPSCAN_SCAN_NAME_FILTER");
        override_string(&mut self.scan.ignore_file, "GROUPSCAN_SCAN_IGNORE_FILE");
        override_u32(&mut self.scan.per_page, "GROUPSCAN_SCAN_PER_PAGE");
        override_u32(&mut self.scan.job_page_size, "GROUPSCAN_SCAN_JOB_PAGE_SIZE");
        override_usize(
            &mut self.scan.max_artifact_size,
            "GROUPSCAN_SCAN_MAX_ARTIFACT_SIZE",
        );
        override_usize(&mut self.scan.concurrency, "GROUPSCAN_SCAN_CONCURRENCY");
    }

    /// 설정값 유효성을 검증합니다.
    ///
    /// `gitlab.token`과 `scan.group_id`는 여기서 검사하지 않습니다.
    /// 부분 설정 파일도 `config validate`를 통과하며, 두 값은 원격 호출
    /// 전에 스캐너가 확인합니다.
    pub fn validate(&self) -> Result<(), GroupScanError> {
        if !is_valid_level(&self.general.log_level) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if !(self.gitlab.host.starts_with("https://") || self.gitlab.host.starts_with("http://"))
        {
            return Err(invalid(
                "gitlab.host",
                "must start with http:// or https://".to_owned(),
            ));
        }

        if self.gitlab.request_timeout_secs == 0
            || self.gitlab.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(invalid(
                "gitlab.request_timeout_secs",
                format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            ));
        }

        if self.scan.job_name.is_empty() {
            return Err(invalid("scan.job_name", "must not be empty".to_owned()));
        }

        if self.scan.artifact_file.is_empty() {
            return Err(invalid("scan.artifact_file", "must not be empty".to_owned()));
        }

        if self.scan.ignore_file.is_empty() {
            return Err(invalid("scan.ignore_file", "must not be empty".to_owned()));
        }

        if self.scan.per_page == 0 || self.scan.per_page > MAX_PER_PAGE {
            return Err(invalid(
                "scan.per_page",
                format!("must be 1-{MAX_PER_PAGE}"),
            ));
        }

        if self.scan.job_page_size == 0 || self.scan.job_page_size > MAX_PER_PAGE {
            return Err(invalid(
                "scan.job_page_size",
                format!("must be 1-{MAX_PER_PAGE}"),
            ));
        }

        if self.scan.max_artifact_size == 0 || self.scan.max_artifact_size > MAX_ARTIFACT_SIZE {
            return Err(invalid(
                "scan.max_artifact_size",
                format!("must be 1-{MAX_ARTIFACT_SIZE}"),
            ));
        }

        if self.scan.concurrency == 0 || self.scan.concurrency > MAX_CONCURRENCY {
            return Err(invalid(
                "scan.concurrency",
                format!("must be 1-{MAX_CONCURRENCY}"),
            ));
        }

        Ok(())
    }

    /// 비밀값을 [`REDACTED`]로 바꾼 사본을 반환합니다.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.gitlab.token.is_empty() {
            copy.gitlab.token = REDACTED.to_owned();
        }
        copy
    }
}

fn invalid(field: &str, reason: String) -> GroupScanError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 로깅 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// GitLab 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitLabConfig {
    /// GitLab 인스턴스 기본 URL (`/api/v4` 제외)
    pub host: String,
    /// `read_api` 권한의 개인/프로젝트 액세스 토큰
    pub token: String,
    /// 요청별 타임아웃 (초)
    pub request_timeout_secs: u64,
    /// User-Agent 헤더
    pub user_agent: String,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            host: "https://gitlab.com".to_owned(),
            token: String::new(),
            request_timeout_secs: 30,
            user_agent: concat!("groupscan/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// 스캔 파라미터
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 그룹 ID 또는 전체 경로 (`platform/backend`)
    pub group_id: String,
    /// 취약점 리포트 아티팩트를 생성하는 CI 잡
    pub job_name: String,
    /// 아티팩트 아카이브 내 리포트 파일 이름
    pub artifact_file: String,
    /// "Namespace / Project"에 적용할 정규식 (비어 있으면 전체 프로젝트)
    pub name_filter: String,
    /// 프로젝트별 ignore 파일의 저장소 경로
    pub ignore_file: String,
    /// 그룹 프로젝트 목록 페이지 크기
    pub per_page: u32,
    /// 상태 조회 시 확인하는 최근 잡 개수
    pub job_page_size: u32,
    /// 아티팩트에서 허용하는 리포트 엔트리 최대 크기 (바이트)
    pub max_artifact_size: usize,
    /// 동시에 처리하는 프로젝트 수 (1 = 순차)
    pub concurrency: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            group_id: String::new(),
            job_name: "trivy".to_owned(),
            artifact_file: "trivy-results.json".to_owned(),
            name_filter: String::new(),
            ignore_file: ".trivyignore".to_owned(),
            per_page: 100,
            job_page_size: 100,
            max_artifact_size: 64 * 1024 * 1024, // 64 MB
            concurrency: 1,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn is_valid_level(level: &str) -> bool {
    VALID_LOG_LEVELS.contains(&level.to_lowercase().as_str())
}

/// 접두어 없는 `LOG_LEVEL`은 다른 도구와 공유되므로, 알 수 없는 값은
/// 검증 실패 대신 무시합니다.
fn override_log_level(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        if is_valid_level(&val) {
            *target = val;
        } else {
            warn!(
                env_key,
                value = val.as_str(),
                keep = target.as_str(),
                "unknown log level in env var, ignoring"
            );
        }
    }
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u32(target: &mut u32, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u32>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u32 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
