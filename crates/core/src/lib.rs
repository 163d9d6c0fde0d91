//! Meshtest 공통 크레이트 -- 분산 스토리지 노드 통합 테스트 하니스의 기반 타입
//!
//! 모든 모듈 크레이트가 공유하는 도메인 타입, 외부 서비스 contract trait,
//! 에러, 설정을 정의합니다.
//!
//! # 모듈 구조
//!
//! - [`error`]: 도메인 에러 타입 (`MeshtestError`, `ConfigError`, `NodeApiError`)
//! - [`config`]: `meshtest.toml` 파싱 및 환경변수 오버라이드 (`MeshtestConfig`)
//! - [`types`]: 노드 기술자, 생명주기 단계, 피어 테이블 타입
//! - [`node`]: 노드 디버그 API contract ([`NodeApi`] trait)
//! - [`orchestrator`]: 컨테이너 오케스트레이터 contract ([`ContainerOrchestrator`] trait)
//! - [`metrics`]: 러너 자체 메트릭 이름 상수
//!
//! # 아키텍처
//!
//! ```text
//! meshtest-runner (스케줄러, 테스트 루프)
//!      |
//!      +-- meshtest-cluster      (NodeGroup 생명주기, bollard 구현)
//!      +-- meshtest-connectivity (full-mesh 수렴 검증)
//!      +-- meshtest-metrics      (노드 세트별 메트릭 수집)
//!              |
//!          meshtest-core (contract trait + 공통 타입)
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod node;
pub mod orchestrator;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, MeshtestError, NodeApiError};

// 설정
pub use config::MeshtestConfig;

// 노드 API contract
pub use node::{DebugInfo, DebugPeer, NodeApi};

// 오케스트레이터 contract
pub use orchestrator::{
    ContainerOrchestrator, ContainerRecipe, FileLogSink, Location, LogSink, MemoryLogSink,
    OrchestratorError, RunningContainer, StartupConfig,
};

// 도메인 타입
pub use types::{
    Node, NodeDescriptor, NodeLogLevel, NodePhase, NodePorts, NodeRole, PairState, PeerEntry,
    PeerRecord,
};
