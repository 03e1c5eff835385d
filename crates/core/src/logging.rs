//! 로깅 초기화
//!
//! `GroupScanConfig`의 `[general]` 섹션으로 `tracing-subscriber`를
//! 구성합니다. 로그는 stderr로 출력되어 stdout은 리포트 전용으로 남습니다.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::GeneralConfig;
use crate::error::{ConfigError, GroupScanError};

/// 전역 tracing subscriber를 초기화합니다.
///
/// tracing 매크로 사용 전에 정확히 한 번 호출해야 합니다.
/// `RUST_LOG`가 `config.log_level`보다 우선합니다.
///
/// # 형식
///
/// * `"json"` - 기계 파싱용 JSON 라인
/// * `"pretty"` - 사람이 읽기 쉬운 여러 줄 출력
pub fn init_tracing(config: &GeneralConfig) -> Result<(), GroupScanError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_lowercase()));

    let result = match config.log_format.as_str() {
        "json" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        "pretty" => tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        other => {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("unknown log format '{other}', expected 'json' or 'pretty'"),
            }
            .into());
        }
    };

    result.map_err(|e| {
        GroupScanError::Config(ConfigError::ParseFailed {
            reason: format!("failed to initialize tracing subscriber: {e}"),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_format_is_rejected() {
        let config = GeneralConfig {
            log_level: "info".to_owned(),
            log_format: "xml".to_owned(),
        };
        let err = init_tracing(&config).unwrap_err();
        assert!(err.to_string().contains("xml"));
    }
}
