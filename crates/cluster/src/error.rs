//! 클러스터 에러 타입

use meshtest_core::{NodeApiError, OrchestratorError};

/// 노드 그룹 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// 그룹 내 노드가 제한 시간 안에 준비되지 않음 (치명적)
    ///
    /// 전파 전에 그룹 전체 컨테이너의 진단 로그를 수집합니다.
    #[error("nodes failed to come online within {timeout_secs}s: {pending:?}")]
    StartupTimeout {
        /// 준비되지 않은 노드 이름 목록
        pending: Vec<String>,
        /// 적용된 제한 시간 (초)
        timeout_secs: u64,
    },

    /// 부트스트랩 노드의 SPR을 제한 시간 안에 얻지 못함
    #[error("bootstrap node '{node}' did not expose an spr within {timeout_secs}s")]
    BootstrapUnavailable {
        /// 부트스트랩 노드 이름
        node: String,
        /// 적용된 제한 시간 (초)
        timeout_secs: u64,
    },

    /// 그룹 구성이 유효하지 않음
    #[error("invalid group setup: {0}")]
    Setup(String),

    /// 포트 할당 공간 초과
    #[error("port allocation failed: {0}")]
    PortAllocation(String),

    /// 오케스트레이터 백엔드 에러
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// 노드 디버그 API 에러
    #[error("node api error: {0}")]
    NodeApi(#[from] NodeApiError),
}
