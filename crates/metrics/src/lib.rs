//! Meshtest 메트릭 크레이트 -- 노드 메트릭의 Prometheus 수집
//!
//! 노드 집합마다 전용 Prometheus 컨테이너를 사이드카로 띄우고,
//! 그 인스턴스의 쿼리 API로 수집된 시계열을 내려받습니다.
//! 인스턴스 번호는 프로세스 내에서 단조 증가하여 수집기 컨테이너
//! 이름이 충돌하지 않습니다.
//!
//! # 모듈 구조
//!
//! - [`error`]: 도메인 에러 타입 (`MetricsError`)
//! - [`scrape`]: 스크레이프 설정 렌더링과 base64 인코딩
//! - [`aggregator`]: 수집기 컨테이너 생명주기 (`MetricsAggregator`)
//! - [`query`]: Prometheus 쿼리 API 클라이언트 (`MetricsQuery`)

pub mod aggregator;
pub mod error;
pub mod query;
pub mod scrape;

// --- Public API Re-exports ---

pub use aggregator::{MetricsAggregator, MetricsHandle, TargetNode};
pub use error::MetricsError;
pub use query::MetricsQuery;
pub use scrape::ScrapeConfig;
