//! 메트릭 상수 및 설명 등록
//!
//! 러너 자체 Prometheus 메트릭의 이름을 중앙에서 정의합니다.
//! (노드 컨테이너에서 수집하는 메트릭과는 무관합니다 --
//! 그쪽은 `meshtest-metrics` 크레이트가 담당합니다.)
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `meshtest_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(meshtest_core::metrics::TEST_RUNS_TOTAL, "test" => name).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 테스트 이름 레이블 키
pub const LABEL_TEST: &str = "test";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── 스케줄러 메트릭 ───────────────────────────────────────────────

/// 완료된 테스트 반복 수 (counter, label: test)
pub const TEST_RUNS_TOTAL: &str = "meshtest_test_runs_total";

/// 실패한 테스트 반복 수 (counter, label: test)
pub const TEST_FAILURES_TOTAL: &str = "meshtest_test_failures_total";

/// 테스트 반복 수행 시간 (histogram, 초, label: test)
pub const TEST_ITERATION_DURATION_SECONDS: &str = "meshtest_test_iteration_duration_seconds";

/// 현재 실행 중인 테스트 루프 수 (gauge)
pub const ACTIVE_TEST_LOOPS: &str = "meshtest_active_test_loops";

/// 러너 가동 시간 (gauge, 초)
pub const RUNNER_UPTIME_SECONDS: &str = "meshtest_runner_uptime_seconds";

// ─── 클러스터 메트릭 ───────────────────────────────────────────────

/// 기동된 노드 그룹 수 (counter)
pub const GROUPS_STARTED_TOTAL: &str = "meshtest_groups_started_total";

/// 그룹 준비 실패 수 (counter)
pub const GROUP_STARTUP_FAILURES_TOTAL: &str = "meshtest_group_startup_failures_total";

// ─── 메트릭 설명 등록 ──────────────────────────────────────────────

/// 모든 메트릭의 설명을 등록합니다.
///
/// 러너 기동 시 recorder 설치 직후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(TEST_RUNS_TOTAL, "Total number of completed test iterations");
    describe_counter!(TEST_FAILURES_TOTAL, "Total number of failed test iterations");
    describe_histogram!(
        TEST_ITERATION_DURATION_SECONDS,
        "Test iteration duration in seconds"
    );
    describe_gauge!(ACTIVE_TEST_LOOPS, "Number of currently running test loops");
    describe_gauge!(RUNNER_UPTIME_SECONDS, "Runner uptime in seconds");

    describe_counter!(GROUPS_STARTED_TOTAL, "Total number of node groups started");
    describe_counter!(
        GROUP_STARTUP_FAILURES_TOTAL,
        "Total number of node groups that failed to come online"
    );
}
