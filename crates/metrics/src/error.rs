//! 메트릭 에러 타입

use meshtest_core::OrchestratorError;

/// 메트릭 수집 에러
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// 수집기 컨테이너 기동/정지 실패
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// 쿼리 요청 실패
    #[error("metrics query failed: {0}")]
    Query(String),

    /// 쿼리 응답 형식이 예상과 다름
    #[error("invalid metrics response: {0}")]
    InvalidResponse(String),

    /// 아티팩트 싱크 I/O 실패
    #[error("metrics sink error: {0}")]
    Sink(#[from] std::io::Error),
}
