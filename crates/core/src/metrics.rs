//! 메트릭 상수 및 설명 등록
//!
//! aggregator는 `metrics` 파사드로 기록합니다. 바이너리가 recorder를
//! 설치하지 않으면 아무것도 내보내지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `groupscan_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

/// 에러 종류 레이블 키 (no_job_artifact, malformed_report, ...)
pub const LABEL_KIND: &str = "kind";

/// 그룹 목록 조회로 반환된 프로젝트 수 (counter)
pub const PROJECTS_ENUMERATED_TOTAL: &str = "groupscan_projects_enumerated_total";

/// 이름 필터를 통과해 스캔된 프로젝트 수 (counter)
pub const PROJECTS_SCANNED_TOTAL: &str = "groupscan_projects_scanned_total";

/// 집계 결과에 포함된 프로젝트 수 (counter)
pub const PROJECTS_FLAGGED_TOTAL: &str = "groupscan_projects_flagged_total";

/// 프로젝트별 복구 가능 에러 (counter, 레이블: kind)
pub const PROJECT_ERRORS_TOTAL: &str = "groupscan_project_errors_total";

/// 그룹 스캔 전체 소요 시간 (histogram, 초)
pub const SCAN_DURATION_SECONDS: &str = "groupscan_scan_duration_seconds";

/// 위 메트릭의 설명을 등록합니다.
pub fn describe_metrics() {
    metrics::describe_counter!(
        PROJECTS_ENUMERATED_TOTAL,
        "Projects returned by the group listing"
    );
    metrics::describe_counter!(
        PROJECTS_SCANNED_TOTAL,
        "Projects that passed the name filter and were scanned"
    );
    metrics::describe_counter!(
        PROJECTS_FLAGGED_TOTAL,
        "Projects included in the aggregate result"
    );
    metrics::describe_counter!(
        PROJECT_ERRORS_TOTAL,
        "Recoverable per-project errors by kind"
    );
    metrics::describe_histogram!(
        SCAN_DURATION_SECONDS,
        metrics::Unit::Seconds,
        "Wall time of a full group scan"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_share_prefix() {
        for name in [
            PROJECTS_ENUMERATED_TOTAL,
            PROJECTS_SCANNED_TOTAL,
            PROJECTS_FLAGGED_TOTAL,
            PROJECT_ERRORS_TOTAL,
            SCAN_DURATION_SECONDS,
        ] {
            assert!(name.starts_with("groupscan_"), "{name}");
        }
    }

    #[test]
    fn describe_without_recorder_is_noop() {
        describe_metrics();
    }
}
