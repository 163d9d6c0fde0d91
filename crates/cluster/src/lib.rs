//! Meshtest 클러스터 크레이트 -- 노드 그룹 생명주기 관리
//!
//! 스토리지 노드 컨테이너의 기동/준비 확인/정지/정리를 담당합니다.
//! core의 [`ContainerOrchestrator`](meshtest_core::ContainerOrchestrator)
//! contract을 bollard로 구현하고, 그 위에 노드 그룹 상태 기계를 올립니다.
//!
//! # 모듈 구조
//!
//! - [`error`]: 도메인 에러 타입 (`ClusterError`)
//! - [`recipe`]: 노드 환경변수 유도, 포트 할당, 컨테이너 레시피
//! - [`docker`]: bollard 기반 오케스트레이터 (`BollardOrchestrator`)
//! - [`http`]: 노드 디버그 API의 reqwest 구현 (`HttpNodeApi`)
//! - [`group`]: 기동된 노드 그룹 (`NodeGroup`, 준비 상태 확인)
//! - [`starter`]: 오케스트레이션 컨텍스트 (`ClusterStarter`)
//!
//! # 그룹 생명주기
//!
//! ```text
//! GroupSetup --bring_online()--> NodeGroup(live)
//!     |  컨테이너 순차 기동, 부트스트랩 SPR 유도,
//!     |  ensure_online 준비 폴링 (타임아웃 시 전체 로그 수집 후 실패)
//!     v
//! NodeGroup --bring_offline()--> 정지 (두 번째 호출은 no-op)
//! ```

pub mod docker;
pub mod error;
pub mod group;
pub mod http;
pub mod recipe;
pub mod starter;

// --- Public API Re-exports ---

// 오케스트레이션 컨텍스트
pub use starter::{Bootstrap, ClusterStarter, GroupSetup};

// 그룹
pub use group::{GroupNode, NodeGroup};

// 에러
pub use error::ClusterError;

// Docker 구현
pub use docker::BollardOrchestrator;

// 노드 API 구현
pub use http::{HttpApiProvider, HttpNodeApi, NodeApiProvider};

// 레시피/포트 할당
pub use recipe::{node_environment, node_recipe, GroupPortAllocator};
